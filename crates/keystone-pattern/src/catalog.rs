//! Pattern catalogs and the matcher contract.

use core::fmt;
use std::sync::Arc;

use keystone_types::{ContentDescriptor, GridCoordinate, StructureKind, Verdict};
use tracing::trace;

use crate::error::PatternError;
use crate::template::Template;
use crate::verdict::VerdictTable;

/// Highest template count a one-byte signed wire index can address.
pub const MAX_TEMPLATES: usize = 127;

/// Read-only view of grid content used by matchers.
pub trait GridView {
    /// Content at `position`. Absent cells are [`ContentDescriptor::Air`].
    fn content_at(&self, position: GridCoordinate) -> ContentDescriptor;

    /// Whether the region containing `position` is loaded.
    fn region_loaded(&self, position: GridCoordinate) -> bool;
}

/// The node a template is being tested against.
#[derive(Clone, Copy)]
pub struct Probe<'a> {
    /// Coordinate of the node, tested as if it held the master offset.
    pub position: GridCoordinate,
    /// The node's structure kind.
    pub kind: &'a StructureKind,
    /// Grid content around the node.
    pub grid: &'a dyn GridView,
}

impl fmt::Debug for Probe<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("position", &self.position)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Decides whether a node sits at the master offset of a complete template
/// instance.
///
/// Implementations must be pure given the current grid content: repeated
/// calls return the same verdict until the grid changes.
pub trait Matcher {
    /// Test `template` with the probed node at its master offset.
    fn test(&self, template: &Template, probe: &Probe<'_>) -> Verdict;
}

/// The ordered candidate templates for one structure kind.
///
/// Catalog order is priority order: when several templates are valid for
/// one node, the lowest index wins.
#[derive(Clone)]
pub struct PatternCatalog {
    kind: StructureKind,
    templates: Vec<Template>,
    matcher: Arc<dyn Matcher>,
}

impl fmt::Debug for PatternCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternCatalog")
            .field("kind", &self.kind)
            .field("templates", &self.templates.len())
            .finish_non_exhaustive()
    }
}

impl PatternCatalog {
    /// Create a catalog.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::TooManyTemplates`] when the template count
    /// does not fit the one-byte wire index.
    pub fn new(
        kind: StructureKind,
        templates: Vec<Template>,
        matcher: Arc<dyn Matcher>,
    ) -> Result<Self, PatternError> {
        if templates.len() > MAX_TEMPLATES {
            return Err(PatternError::TooManyTemplates {
                kind: kind.0,
                count: templates.len(),
                max: MAX_TEMPLATES,
            });
        }
        Ok(Self {
            kind,
            templates,
            matcher,
        })
    }

    /// The structure kind this catalog recognizes.
    pub const fn kind(&self) -> &StructureKind {
        &self.kind
    }

    /// Template at `index`.
    pub fn get(&self, index: usize) -> Option<&Template> {
        self.templates.get(index)
    }

    /// All templates in priority order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the catalog has no templates.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Convert a wire index into a template index.
    ///
    /// Negative values mean "no template". Out-of-range values are reported
    /// as `None` so callers decide between rejecting and clamping.
    pub fn checked_index(&self, wire_index: i8) -> Option<usize> {
        let index = usize::try_from(wire_index).ok()?;
        (index < self.templates.len()).then_some(index)
    }

    /// Clamp a wire index into `0..len`, or `None` for an empty catalog.
    pub fn clamp_index(&self, wire_index: i8) -> Option<usize> {
        let last = self.templates.len().checked_sub(1)?;
        let index = usize::try_from(wire_index).unwrap_or(0);
        Some(index.min(last))
    }

    /// Convert a template index into its wire form; `None` becomes `-1`.
    pub fn wire_index(&self, index: Option<usize>) -> i8 {
        index
            .filter(|&i| i < self.templates.len())
            .and_then(|i| i8::try_from(i).ok())
            .unwrap_or(-1)
    }

    /// Test every template against `probe`, in order.
    ///
    /// Every template is tested even after a valid one is found.
    pub fn test_all(&self, probe: &Probe<'_>, table: &mut VerdictTable) {
        table.clear();
        for (index, template) in self.templates.iter().enumerate() {
            let verdict = self.matcher.test(template, probe);
            trace!(
                kind = %self.kind,
                template = template.name(),
                position = %probe.position,
                ?verdict,
                "template tested"
            );
            table.record(index, verdict);
        }
    }
}
