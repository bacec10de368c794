//! Bounded invalidation propagation.
//!
//! A content change forces the edited node's engine and nearby engines back
//! to `Untested` so they re-test on the next evaluation. The walk is
//! breadth-first over the adapter's axis-neighbors with a hop budget, so
//! fan-out stays bounded whatever the grid size. An engine that is already
//! `Untested` ends its branch: it is already scheduled.
//!
//! Each invalidated engine also invalidates its resolved master with a
//! fresh budget, so a master far from the edit still re-tests.

use std::collections::VecDeque;

use keystone_types::{Direction, GridCoordinate, StructureKind};
use tracing::debug;

use crate::grid::NodeAdapter;
use crate::world::{StructureWorld, WorldRole};

/// One step of an invalidation walk.
#[derive(Debug)]
enum Work {
    /// Offer invalidation to every neighbor of `from`.
    Spread {
        from: GridCoordinate,
        kind: Option<StructureKind>,
        budget: u32,
    },
    /// Invalidate the engine at `at`, spending one hop.
    Mark {
        at: GridCoordinate,
        kind: Option<StructureKind>,
        budget: u32,
    },
}

impl<G: NodeAdapter> StructureWorld<G> {
    /// React to a content change at `position`.
    ///
    /// An engine at `position` is invalidated first, together with its
    /// resolved master. Neighbors within the hop budget follow. The walk
    /// only continues through engines of the same kind as the one it came
    /// from; when the changed cell holds no engine, the first ring accepts
    /// any kind. Returns how many engines were invalidated. No-op on
    /// replicas.
    pub fn notify_change(&mut self, position: GridCoordinate) -> usize {
        if self.role != WorldRole::Authoritative {
            return 0;
        }
        let kind = self.grid.engine(position).map(|e| e.kind().clone());
        let mut seeds = Vec::with_capacity(2);
        let mut invalidated = 0_usize;

        if let Some(kind) = &kind {
            let master = self.resolve_master(position);
            let marked = self
                .grid
                .engine_mut(position)
                .is_some_and(|engine| engine.mark_untested());
            if marked {
                self.dirty.insert(position);
                invalidated = 1;
                if let Some(master) = master
                    && master != position
                {
                    seeds.push(Work::Mark {
                        at: master,
                        kind: Some(kind.clone()),
                        budget: self.hop_budget,
                    });
                }
            }
        }
        seeds.push(Work::Spread {
            from: position,
            kind,
            budget: self.hop_budget,
        });
        invalidated.saturating_add(self.walk(seeds))
    }

    /// Invalidate the engine at `position` directly and continue the walk
    /// from there. Returns how many engines were invalidated.
    pub fn invalidate(&mut self, position: GridCoordinate) -> usize {
        self.walk([Work::Mark {
            at: position,
            kind: None,
            budget: self.hop_budget,
        }])
    }

    /// Force the resolved master of `position` to re-test on the next
    /// evaluation, without walking. Authoritative only.
    pub fn schedule_master_retest(&mut self, position: GridCoordinate) -> bool {
        if self.role != WorldRole::Authoritative {
            return false;
        }
        let Some(master) = self.resolve_master(position) else {
            return false;
        };
        let marked = self
            .grid
            .engine_mut(master)
            .is_some_and(|engine| engine.mark_untested());
        if marked {
            self.dirty.insert(master);
        }
        marked
    }

    fn walk(&mut self, seeds: impl IntoIterator<Item = Work>) -> usize {
        if self.role != WorldRole::Authoritative {
            return 0;
        }
        let full_budget = self.hop_budget;
        let mut invalidated = 0_usize;
        let mut queue: VecDeque<Work> = seeds.into_iter().collect();

        while let Some(work) = queue.pop_front() {
            match work {
                Work::Spread { from, kind, budget } => {
                    for direction in Direction::ALL {
                        if let Some(at) = self.grid.neighbor(from, direction) {
                            queue.push_back(Work::Mark {
                                at,
                                kind: kind.clone(),
                                budget,
                            });
                        }
                    }
                }
                Work::Mark { at, kind, budget } => {
                    let Some(remaining) = budget.checked_sub(1) else {
                        continue;
                    };
                    if !self.grid.region_loaded(at) {
                        continue;
                    }
                    let Some(engine) = self.grid.engine_mut(at) else {
                        continue;
                    };
                    if kind.as_ref().is_some_and(|k| !engine.can_match(k)) {
                        continue;
                    }
                    if !engine.mark_untested() {
                        continue;
                    }
                    let own_kind = engine.kind().clone();
                    self.dirty.insert(at);
                    invalidated = invalidated.saturating_add(1);

                    if let Some(master) = self.resolve_master(at)
                        && master != at
                    {
                        queue.push_back(Work::Mark {
                            at: master,
                            kind: Some(own_kind.clone()),
                            budget: full_budget,
                        });
                    }
                    queue.push_back(Work::Spread {
                        from: at,
                        kind: Some(own_kind),
                        budget: remaining,
                    });
                }
            }
        }

        if invalidated > 0 {
            debug!(invalidated, "invalidation walk finished");
        }
        invalidated
    }
}
