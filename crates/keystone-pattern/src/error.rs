//! Error types for the `keystone-pattern` crate.

use keystone_types::GridCoordinate;

/// Errors raised while building templates or catalogs.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    /// A template has no layers, rows, or columns.
    #[error("template {name} is empty")]
    EmptyTemplate {
        /// The template name.
        name: String,
    },

    /// Rows within a template do not share one width, or layers do not
    /// share one depth.
    #[error("template {name} has a ragged layer at y={layer}")]
    RaggedLayer {
        /// The template name.
        name: String,
        /// The offending layer.
        layer: usize,
    },

    /// The master offset lies outside the bounding box.
    #[error("template {name} has master offset {offset} outside its bounds")]
    MasterOutOfBounds {
        /// The template name.
        name: String,
        /// The offending offset.
        offset: GridCoordinate,
    },

    /// The master offset points at a don't-care marker, so no node could
    /// ever hold the master role.
    #[error("template {name} places its master on don't-care marker '{marker}'")]
    MasterNotMember {
        /// The template name.
        name: String,
        /// The marker found at the master offset.
        marker: char,
    },

    /// A dimension does not fit the coordinate range.
    #[error("template {name} is too large")]
    TooLarge {
        /// The template name.
        name: String,
    },

    /// More templates than the one-byte wire index can address.
    #[error("catalog for {kind} holds {count} templates; at most {max} are addressable")]
    TooManyTemplates {
        /// The structure kind.
        kind: String,
        /// Number of templates supplied.
        count: usize,
        /// Maximum supported.
        max: usize,
    },
}
