//! Shared type definitions for the Keystone structure engine.
//!
//! This crate is the single source of truth for the value types used across
//! the Keystone workspace. Types that observers display are exported to
//! `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`coordinate`] -- Grid coordinates and the six axis directions
//! - [`enums`] -- Structure validity states and per-template verdicts
//! - [`content`] -- Structure kinds, cell content, and template markers
//! - [`summary`] -- Compact per-node structure summary for observers

pub mod content;
pub mod coordinate;
pub mod enums;
pub mod summary;

// Re-export all public types at crate root for convenience.
pub use content::{CellMarker, ContentDescriptor, StructureKind};
pub use coordinate::{Direction, GridCoordinate};
pub use enums::{StructureState, Verdict};
pub use summary::StructureSummary;
