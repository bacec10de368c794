//! Enumeration types for structure recognition.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Validity state of one node's structure engine.
///
/// There is no terminal state: invalidation can return any state to
/// [`StructureState::Untested`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum StructureState {
    /// A template fully matched and a master is assigned.
    Valid,
    /// Every template failed outright.
    Invalid,
    /// At least one template test was inconclusive because region data was
    /// not loaded. Judgment is deferred, not failed.
    Unknown,
    /// Needs re-evaluation. The initial state.
    #[default]
    Untested,
}

impl StructureState {
    /// Every state in wire-tag order.
    pub const VALUES: [Self; 4] = [Self::Valid, Self::Invalid, Self::Unknown, Self::Untested];

    /// Short lowercase label used in logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Unknown => "unknown",
            Self::Untested => "untested",
        }
    }
}

/// Outcome of testing one node against one template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Verdict {
    /// The template matched completely with this node at its master offset.
    Valid,
    /// The template does not match.
    Invalid,
    /// A cell the template needs lies in a region that is not loaded.
    NotLoaded,
}
