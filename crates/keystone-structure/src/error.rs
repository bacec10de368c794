//! Error types for the `keystone-structure` crate.
//!
//! Decode failures are represented here but never escape
//! [`StructureWorld`](crate::world::StructureWorld): the world logs them and
//! falls back to "no template" or a resync request.

use keystone_types::GridCoordinate;

/// Errors from node management on a [`StructureWorld`](crate::world::StructureWorld).
#[derive(Debug, thiserror::Error)]
pub enum StructureError {
    /// A node already occupies the coordinate.
    #[error("a node already exists at {0}")]
    NodeOccupied(GridCoordinate),

    /// No node exists at the coordinate.
    #[error("no node at {0}")]
    NodeNotFound(GridCoordinate),

    /// The node exists but holds no structure engine.
    #[error("node at {0} has no structure engine")]
    NoEngine(GridCoordinate),

    /// An encoding step failed.
    #[error("codec error at {position}: {source}")]
    Codec {
        /// The node being encoded.
        position: GridCoordinate,
        /// The underlying codec error.
        source: CodecError,
    },
}

/// Errors from the replication and durable encodings.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The binary replication stream was malformed or truncated.
    #[error("malformed replication message: {source}")]
    Wire {
        /// The underlying bincode error.
        #[from]
        source: bincode::Error,
    },

    /// The durable snapshot did not have the expected shape.
    #[error("malformed durable snapshot: {source}")]
    Durable {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// A `Valid` message was built without a template placement.
    #[error("valid state without a template placement")]
    MissingPlacement,
}
