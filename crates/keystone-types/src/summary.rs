//! Observer-facing summary of one node's structure membership.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::coordinate::GridCoordinate;
use crate::enums::StructureState;

/// What an observer dashboard shows for a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StructureSummary {
    /// The node this summary describes.
    pub position: GridCoordinate,
    /// Current validity state.
    pub state: StructureState,
    /// Whether the node claims to be the master.
    pub is_master: bool,
    /// Master coordinate derived from the template assignment, if any.
    pub master: Option<GridCoordinate>,
    /// Index of the assigned template, or `-1` when there is none.
    pub template_index: i8,
}
