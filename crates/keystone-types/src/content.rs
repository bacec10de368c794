//! Structure kinds, cell content, and template markers.

use core::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Opaque tag naming a family of structures.
///
/// Two engines only interoperate (propagate invalidation, join the same
/// structure) when their kinds are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StructureKind(pub String);

impl StructureKind {
    /// Create a kind from any string-like tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StructureKind {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// What currently occupies a grid cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentDescriptor {
    /// Nothing.
    #[default]
    Air,
    /// A block identified by its material name.
    Block(String),
}

impl ContentDescriptor {
    /// Shorthand for a named block.
    pub fn block(name: impl Into<String>) -> Self {
        Self::Block(name.into())
    }

    /// Whether the cell is empty.
    pub const fn is_air(&self) -> bool {
        matches!(self, Self::Air)
    }
}

/// The character a template stores at one offset of its bounding box.
///
/// The matcher interprets markers; the engine only needs to know which
/// markers impose no membership requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellMarker(pub char);

impl CellMarker {
    /// The cell must be empty.
    pub const AIR: Self = Self('A');
    /// The cell must hold something other than the structure's block.
    pub const OTHER: Self = Self('O');
    /// Anything goes.
    pub const ANYTHING: Self = Self('*');
    /// The structure's own block.
    pub const BLOCK: Self = Self('B');
    /// A window variant of the structure's block.
    pub const WINDOW: Self = Self('W');

    /// Whether the marker is "don't-care / air / anything-else": such
    /// offsets never contribute a component during assembly.
    pub const fn is_other_block(self) -> bool {
        matches!(self.0, 'A' | 'O' | '*')
    }
}

impl fmt::Display for CellMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_block_markers() {
        assert!(CellMarker::AIR.is_other_block());
        assert!(CellMarker::OTHER.is_other_block());
        assert!(CellMarker::ANYTHING.is_other_block());
        assert!(!CellMarker::BLOCK.is_other_block());
        assert!(!CellMarker::WINDOW.is_other_block());
        assert!(!CellMarker('T').is_other_block());
    }

    #[test]
    fn kinds_compare_by_tag() {
        assert_eq!(StructureKind::from("tank"), StructureKind::new(String::from("tank")));
        assert_ne!(StructureKind::from("tank"), StructureKind::from("oven"));
    }

    #[test]
    fn default_content_is_air() {
        assert!(ContentDescriptor::default().is_air());
        assert!(!ContentDescriptor::block("stone").is_air());
    }
}
