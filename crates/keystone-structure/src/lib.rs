//! Multi-cell structure recognition for the Keystone voxel grid.
//!
//! Every node that can take part in a structure owns a
//! [`StructureEngine`]. Engines are evaluated against their kind's
//! [`PatternCatalog`]; a node that finds a complete template elects itself
//! master and recruits the other members. Changes to the grid invalidate
//! nearby engines with a bounded walk so they re-test on the next tick.
//!
//! The authoritative world encodes changed engines for replicas, which
//! only ever mirror what they receive.
//!
//! # Modules
//!
//! - [`world`] -- [`StructureWorld`], the grid plus cross-node
//!   orchestration, and the node lifecycle (place, edit, remove).
//! - [`election`] -- Template evaluation, master election, and assembly.
//! - [`propagation`] -- Bounded invalidation walks.
//! - [`query`] -- Master resolution and the structure-level queries.
//! - [`replication`] -- Dirty tracking, replica messages, durable snapshots.
//! - [`codec`] -- The replicated-state wire format and the durable shape.
//! - [`engine`] -- Per-node state and its transitions.
//! - [`grid`] -- [`VoxelGrid`] and the [`NodeAdapter`] contract.
//! - [`delegate`] -- [`FunctionalDelegate`], the behavior of formed
//!   structures.
//! - [`events`] -- Notifications for observers.
//! - [`error`] -- Error types for grid and codec operations.
//!
//! [`PatternCatalog`]: keystone_pattern::PatternCatalog

pub mod codec;
pub mod delegate;
pub mod election;
pub mod engine;
pub mod error;
pub mod events;
pub mod grid;
pub mod propagation;
pub mod query;
pub mod replication;
pub mod world;

// Re-export primary types at crate root.
pub use codec::{DurableSnapshot, ReplicaMessage, WirePlacement};
pub use delegate::{Actor, DelegateContext, FunctionalDelegate, InertDelegate};
pub use engine::{Placement, StructureEngine};
pub use error::{CodecError, StructureError};
pub use events::StructureEvent;
pub use grid::{Node, NodeAdapter, REGION_SIZE, RegionKey, VoxelGrid};
pub use world::{DEFAULT_HOP_BUDGET, StructureWorld, WorldRole};
