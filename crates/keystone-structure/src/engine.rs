//! Per-node structure engine state.
//!
//! One [`StructureEngine`] lives in each node that can take part in a
//! structure. It never holds a reference to another engine: every link to
//! another node is a coordinate, resolved through the grid at the moment of
//! use. Cross-node behavior (election, assembly, invalidation) lives on
//! [`StructureWorld`](crate::world::StructureWorld), which can reach every
//! engine by coordinate.

use core::fmt;
use std::sync::Arc;

use keystone_pattern::{PatternCatalog, Template, VerdictTable};
use keystone_types::{CellMarker, GridCoordinate, StructureKind, StructureState};

use crate::delegate::{DelegateContext, FunctionalDelegate};

/// A node's assignment within a template.
///
/// Template and offset are held together so one can never be present
/// without the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    /// Index of the template in the engine's catalog.
    pub template_index: usize,
    /// Offset of the node inside the template's bounding box.
    pub offset: GridCoordinate,
}

/// Structure-recognition state of one node.
pub struct StructureEngine {
    position: GridCoordinate,
    catalog: Arc<PatternCatalog>,
    state: StructureState,
    is_master: bool,
    placement: Option<Placement>,
    master: Option<GridCoordinate>,
    verdicts: VerdictTable,
    components: Vec<GridCoordinate>,
    delegate: Box<dyn FunctionalDelegate>,
    destroyed: bool,
    resync_requested: bool,
    last_resync_request: Option<u64>,
}

impl fmt::Debug for StructureEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructureEngine")
            .field("position", &self.position)
            .field("kind", self.catalog.kind())
            .field("state", &self.state)
            .field("is_master", &self.is_master)
            .field("placement", &self.placement)
            .field("master", &self.master)
            .field("components", &self.components)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl StructureEngine {
    /// Create an untested engine for the node at `position`.
    pub fn new(
        position: GridCoordinate,
        catalog: Arc<PatternCatalog>,
        delegate: Box<dyn FunctionalDelegate>,
    ) -> Self {
        Self {
            position,
            catalog,
            state: StructureState::Untested,
            is_master: false,
            placement: None,
            master: None,
            verdicts: VerdictTable::new(),
            components: Vec::new(),
            delegate,
            destroyed: false,
            resync_requested: false,
            last_resync_request: None,
        }
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    /// Coordinate of the owning node.
    pub const fn position(&self) -> GridCoordinate {
        self.position
    }

    /// The structure kind, taken from the catalog.
    pub fn kind(&self) -> &StructureKind {
        self.catalog.kind()
    }

    /// The catalog this engine tests.
    pub const fn catalog(&self) -> &Arc<PatternCatalog> {
        &self.catalog
    }

    /// Current validity state.
    pub const fn state(&self) -> StructureState {
        self.state
    }

    /// This node's own claim to the master role. Only meaningful while the
    /// state is [`StructureState::Valid`]; see [`is_valid_master`](Self::is_valid_master).
    pub const fn is_master(&self) -> bool {
        self.is_master
    }

    /// The template assignment, if any.
    pub const fn placement(&self) -> Option<Placement> {
        self.placement
    }

    /// The assigned template.
    pub fn template(&self) -> Option<&Template> {
        self.placement
            .and_then(|p| self.catalog.get(p.template_index))
    }

    /// Offset of this node inside its template.
    pub fn position_in_template(&self) -> Option<GridCoordinate> {
        self.placement.map(|p| p.offset)
    }

    /// The master coordinate derived from the template assignment.
    pub const fn master_position(&self) -> Option<GridCoordinate> {
        self.master
    }

    /// Template index in wire form: `-1` when no template is assigned.
    pub fn pattern_index(&self) -> i8 {
        self.catalog
            .wire_index(self.placement.map(|p| p.template_index))
    }

    /// Marker of this node's cell in its template, without checking whether
    /// the structure currently resolves.
    pub fn raw_marker(&self) -> Option<CellMarker> {
        let placement = self.placement?;
        self.template()?.marker(placement.offset)
    }

    /// Verdicts of the last evaluation, one per template.
    pub const fn verdicts(&self) -> &VerdictTable {
        &self.verdicts
    }

    /// Component list as stored on this node. Authoritative only on a valid
    /// master; go through the world's query surface otherwise.
    pub fn local_components(&self) -> &[GridCoordinate] {
        &self.components
    }

    /// The owned delegate.
    pub fn delegate(&self) -> &dyn FunctionalDelegate {
        self.delegate.as_ref()
    }

    /// The owned delegate, mutably.
    pub fn delegate_mut(&mut self) -> &mut dyn FunctionalDelegate {
        self.delegate.as_mut()
    }

    /// Whether the owning node has been destroyed.
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether this replica is waiting for a full resync.
    pub const fn resync_requested(&self) -> bool {
        self.resync_requested
    }

    /// Master claim confirmed by state: master, valid, and not destroyed.
    pub fn is_valid_master(&self) -> bool {
        self.is_master && self.state == StructureState::Valid && !self.destroyed
    }

    /// Whether `other` may join or propagate through structures with this
    /// engine.
    pub fn can_match(&self, other: &StructureKind) -> bool {
        self.kind() == other
    }

    // -------------------------------------------------------------------
    // State transitions (driven by the world)
    // -------------------------------------------------------------------

    /// Flag the owning node as destroyed. A destroyed engine never resolves
    /// as a master. A master gives up its role first, running
    /// `on_master_reset` only when `run_hooks` is set.
    pub(crate) fn mark_destroyed(&mut self, run_hooks: bool) {
        if self.is_master {
            if run_hooks {
                self.release_master_role();
            } else {
                self.is_master = false;
                self.components.clear();
            }
        }
        self.destroyed = true;
    }

    /// Force the engine back to `Untested`. Returns `false` when it already
    /// was, so propagation can stop there.
    pub(crate) fn mark_untested(&mut self) -> bool {
        if self.state == StructureState::Untested {
            return false;
        }
        self.state = StructureState::Untested;
        true
    }

    pub(crate) fn store_verdicts(&mut self, verdicts: VerdictTable) {
        self.verdicts = verdicts;
    }

    /// Claim the master role for the template at `template_index` and reset
    /// the component list to this node alone.
    pub(crate) fn claim_master(&mut self, template_index: usize, master_offset: GridCoordinate) {
        self.is_master = true;
        self.set_placement(
            Some(Placement {
                template_index,
                offset: master_offset,
            }),
            true,
        );
        self.components.clear();
        self.components.push(self.position);
    }

    /// Join a structure as the component at `placement.offset`.
    pub(crate) fn join(&mut self, placement: Placement) {
        let becomes_master = self
            .catalog
            .get(placement.template_index)
            .is_some_and(|t| t.is_master_position(placement.offset));
        if self.is_master && !becomes_master {
            self.release_master_role();
        }
        self.is_master = becomes_master;
        self.components.clear();
        self.set_placement(Some(placement), true);
    }

    pub(crate) fn push_component(&mut self, member: GridCoordinate) {
        self.components.push(member);
    }

    /// Every template failed: give up any master role, then drop the
    /// assignment.
    pub(crate) fn fail(&mut self) {
        if self.is_master {
            self.release_master_role();
        }
        self.set_placement(None, true);
        self.state = StructureState::Invalid;
    }

    /// Region data was missing: drop the assignment without cleanup hooks so
    /// held content survives until a definite verdict.
    pub(crate) fn defer(&mut self) {
        self.set_placement(None, false);
        self.components.clear();
        self.state = StructureState::Unknown;
    }

    /// Apply a replicated assignment. Replicas never run cleanup hooks.
    pub(crate) fn mirror(&mut self, placement: Option<Placement>, state: StructureState) {
        self.is_master = placement.is_some_and(|p| {
            self.catalog
                .get(p.template_index)
                .is_some_and(|t| t.is_master_position(p.offset))
        });
        self.set_placement(placement, false);
        if placement.is_none() {
            self.state = state;
        }
    }

    /// Restore from a durable snapshot. The state stays `Untested`, so the
    /// next tick re-derives everything. A master flag without a surviving
    /// placement is dropped.
    pub(crate) fn restore(&mut self, is_master: bool, placement: Option<Placement>) {
        self.placement = placement;
        self.master = placement.and_then(|p| self.derive_master(p));
        if self.master.is_none() {
            self.placement = None;
        }
        self.is_master = is_master && self.placement.is_some();
    }

    pub(crate) fn request_resync(&mut self) {
        self.resync_requested = true;
    }

    /// Consume the resync flag if `interval` ticks have passed since the
    /// last request.
    pub(crate) fn take_resync_request(&mut self, tick: u64, interval: u64) -> bool {
        if !self.resync_requested {
            return false;
        }
        let due = self
            .last_resync_request
            .is_none_or(|last| tick.saturating_sub(last) >= interval);
        if due {
            self.resync_requested = false;
            self.last_resync_request = Some(tick);
        }
        due
    }

    pub(crate) fn clear_resync(&mut self) {
        self.resync_requested = false;
    }

    /// Run the delegate for one tick. Callers check
    /// [`is_valid_master`](Self::is_valid_master) first.
    pub(crate) fn evaluate_delegate(&mut self, tick: u64) {
        let ctx = DelegateContext {
            tick,
            master: self.position,
            components: &self.components,
        };
        self.delegate.evaluate(&ctx);
    }

    fn release_master_role(&mut self) {
        self.delegate.on_master_reset();
        self.is_master = false;
        self.components.clear();
    }

    fn derive_master(&self, placement: Placement) -> Option<GridCoordinate> {
        self.catalog
            .get(placement.template_index)?
            .master_position(self.position, placement.offset)
    }

    /// Assign (or clear) the template placement. The master coordinate is
    /// always re-derived from the placement, never set on its own, and the
    /// state follows it: `Valid` with a master, `Invalid` without.
    ///
    /// Returns whether anything changed.
    fn set_placement(&mut self, placement: Option<Placement>, cleanup: bool) -> bool {
        let master = placement.and_then(|p| self.derive_master(p));
        // An assignment that cannot yield a master is no assignment.
        let placement = placement.filter(|_| master.is_some());

        let changed = self.placement != placement || self.master != master;
        if changed && cleanup && !self.is_master {
            self.delegate.evict_contents();
        }
        self.placement = placement;
        self.master = master;
        self.state = if master.is_some() {
            StructureState::Valid
        } else {
            StructureState::Invalid
        };
        changed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::any::Any;
    use std::cell::Cell;
    use std::rc::Rc;

    use keystone_pattern::{Matcher, Probe};
    use keystone_types::Verdict;

    use super::*;

    struct Never;

    impl Matcher for Never {
        fn test(&self, _template: &Template, _probe: &Probe<'_>) -> Verdict {
            Verdict::Invalid
        }
    }

    /// Counts cleanup hook invocations.
    #[derive(Default)]
    struct Hooks {
        evictions: Rc<Cell<u32>>,
        resets: Rc<Cell<u32>>,
    }

    impl FunctionalDelegate for Hooks {
        fn evict_contents(&mut self) {
            self.evictions.set(self.evictions.get().saturating_add(1));
        }

        fn on_master_reset(&mut self) {
            self.resets.set(self.resets.get().saturating_add(1));
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn catalog() -> Arc<PatternCatalog> {
        let line = Template::from_layers("line", &[&["BBB"]], GridCoordinate::new(1, 0, 0)).unwrap();
        Arc::new(PatternCatalog::new(StructureKind::from("x"), vec![line], Arc::new(Never)).unwrap())
    }

    fn engine_with_hooks(at: GridCoordinate) -> (StructureEngine, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let hooks = Hooks::default();
        let evictions = Rc::clone(&hooks.evictions);
        let resets = Rc::clone(&hooks.resets);
        (StructureEngine::new(at, catalog(), Box::new(hooks)), evictions, resets)
    }

    #[test]
    fn new_engine_is_untested_without_template() {
        let (e, _, _) = engine_with_hooks(GridCoordinate::ORIGIN);
        assert_eq!(e.state(), StructureState::Untested);
        assert!(e.placement().is_none());
        assert!(e.master_position().is_none());
        assert_eq!(e.pattern_index(), -1);
        assert!(!e.is_valid_master());
    }

    #[test]
    fn claim_master_points_at_self() {
        let at = GridCoordinate::new(7, 2, 7);
        let (mut e, evictions, _) = engine_with_hooks(at);
        e.claim_master(0, GridCoordinate::new(1, 0, 0));
        assert_eq!(e.state(), StructureState::Valid);
        assert_eq!(e.master_position(), Some(at));
        assert!(e.is_valid_master());
        assert_eq!(e.local_components(), &[at]);
        assert_eq!(evictions.get(), 0);
    }

    #[test]
    fn joining_derives_master_from_geometry() {
        let (mut e, evictions, _) = engine_with_hooks(GridCoordinate::new(0, 0, 0));
        e.join(Placement {
            template_index: 0,
            offset: GridCoordinate::new(0, 0, 0),
        });
        assert_eq!(e.master_position(), Some(GridCoordinate::new(1, 0, 0)));
        assert!(!e.is_master());
        assert_eq!(e.state(), StructureState::Valid);
        assert_eq!(evictions.get(), 1);
    }

    #[test]
    fn failing_master_resets_before_clearing() {
        let (mut e, _, resets) = engine_with_hooks(GridCoordinate::ORIGIN);
        e.claim_master(0, GridCoordinate::new(1, 0, 0));
        e.fail();
        assert_eq!(resets.get(), 1);
        assert!(!e.is_master());
        assert_eq!(e.state(), StructureState::Invalid);
        assert!(e.master_position().is_none());
        assert!(e.local_components().is_empty());
    }

    #[test]
    fn deferring_keeps_contents() {
        let (mut e, evictions, resets) = engine_with_hooks(GridCoordinate::ORIGIN);
        e.join(Placement {
            template_index: 0,
            offset: GridCoordinate::ORIGIN,
        });
        let before = evictions.get();
        e.defer();
        assert_eq!(e.state(), StructureState::Unknown);
        assert!(e.master_position().is_none());
        assert_eq!(evictions.get(), before);
        assert_eq!(resets.get(), 0);
    }

    #[test]
    fn mark_untested_is_idempotent() {
        let (mut e, _, _) = engine_with_hooks(GridCoordinate::ORIGIN);
        assert!(!e.mark_untested());
        e.fail();
        assert!(e.mark_untested());
        assert!(!e.mark_untested());
    }

    #[test]
    fn out_of_range_placement_is_dropped() {
        let (mut e, _, _) = engine_with_hooks(GridCoordinate::ORIGIN);
        e.join(Placement {
            template_index: 5,
            offset: GridCoordinate::ORIGIN,
        });
        assert!(e.placement().is_none());
        assert_eq!(e.state(), StructureState::Invalid);
    }

    #[test]
    fn resync_requests_are_throttled() {
        let (mut e, _, _) = engine_with_hooks(GridCoordinate::ORIGIN);
        assert!(!e.take_resync_request(0, 16));
        e.request_resync();
        assert!(e.take_resync_request(3, 16));
        e.request_resync();
        assert!(!e.take_resync_request(10, 16));
        assert!(e.resync_requested());
        assert!(e.take_resync_request(19, 16));
        assert!(!e.resync_requested());
    }

    #[test]
    fn destroyed_master_is_not_valid() {
        let (mut e, _, resets) = engine_with_hooks(GridCoordinate::ORIGIN);
        e.claim_master(0, GridCoordinate::new(1, 0, 0));
        e.mark_destroyed(true);
        assert!(!e.is_valid_master());
        assert!(e.is_destroyed());
        assert_eq!(resets.get(), 1);
    }

    #[test]
    fn destroying_without_hooks_still_drops_the_role() {
        let (mut e, evictions, resets) = engine_with_hooks(GridCoordinate::ORIGIN);
        e.claim_master(0, GridCoordinate::new(1, 0, 0));
        e.mark_destroyed(false);
        assert!(!e.is_master());
        assert!(e.local_components().is_empty());
        assert_eq!(resets.get(), 0);
        assert_eq!(evictions.get(), 0);
    }

    #[test]
    fn restoring_master_without_placement_drops_the_flag() {
        let (mut e, _, _) = engine_with_hooks(GridCoordinate::ORIGIN);
        e.restore(true, None);
        assert!(!e.is_master());
        assert!(e.placement().is_none());

        e.restore(
            true,
            Some(Placement {
                template_index: 0,
                offset: GridCoordinate::new(1, 0, 0),
            }),
        );
        assert!(e.is_master());
        assert_eq!(e.master_position(), Some(GridCoordinate::ORIGIN));
    }
}
