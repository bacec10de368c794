//! Notifications published by the structure world.

use keystone_types::{GridCoordinate, StructureKind};
use serde::{Deserialize, Serialize};

/// Something observers of the grid may want to react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureEvent {
    /// A master completed assembly. Published once per successful assembly.
    Formed {
        /// The master node.
        master: GridCoordinate,
        /// Kind of the formed structure.
        kind: StructureKind,
        /// Index of the winning template in the catalog.
        template_index: usize,
        /// Number of components, master included.
        components: usize,
    },
}

impl StructureEvent {
    /// The master node the event refers to.
    pub const fn master(&self) -> GridCoordinate {
        match self {
            Self::Formed { master, .. } => *master,
        }
    }
}
