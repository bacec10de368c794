//! Structure templates and the catalog that tests them.
//!
//! A [`Template`] is an immutable shape: a bounding box with one
//! [`CellMarker`] per offset and a designated master offset. A
//! [`PatternCatalog`] holds the ordered templates for one structure kind and
//! the [`Matcher`] that decides, per template, whether a node sits at the
//! master offset of a complete instance.
//!
//! The matching heuristic itself is supplied by the caller; this crate only
//! orchestrates it and records the outcome in a [`VerdictTable`].
//!
//! # Modules
//!
//! - [`template`] -- Template geometry, including the pure master-position
//!   derivation every member uses to agree on a master without voting.
//! - [`catalog`] -- [`PatternCatalog`], the [`Matcher`] and [`GridView`]
//!   contracts.
//! - [`verdict`] -- [`VerdictTable`], the complete per-template outcome of
//!   one evaluation.
//! - [`error`] -- Template and catalog construction errors.
//!
//! [`CellMarker`]: keystone_types::CellMarker

pub mod catalog;
pub mod error;
pub mod template;
pub mod verdict;

pub use catalog::{GridView, Matcher, PatternCatalog, Probe};
pub use error::PatternError;
pub use template::{Template, master_position_for};
pub use verdict::VerdictTable;
