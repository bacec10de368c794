//! Template evaluation, master election, and component assembly.
//!
//! The node that finds a fully valid template elects itself master for that
//! evaluation. There is no negotiation between nodes: every member derives
//! the same master coordinate from the same template geometry, so
//! independent evaluations converge without a vote.
//!
//! Catalog order is the priority order. When two templates are valid for
//! the same node, the lower index wins; when two masters claim the same
//! member, the most recent assembly holds it.

use std::sync::Arc;

use keystone_pattern::{Probe, VerdictTable};
use keystone_types::{GridCoordinate, StructureState, Verdict};
use tracing::{debug, info};

use crate::engine::Placement;
use crate::events::StructureEvent;
use crate::grid::NodeAdapter;
use crate::world::{StructureWorld, WorldRole};

impl<G: NodeAdapter> StructureWorld<G> {
    /// Evaluate the engine at `position` if it is `Untested`.
    ///
    /// Tests every template, then enters `Valid` (electing this node master
    /// and assembling the structure), `Unknown` (some region was not
    /// loaded), or `Invalid`. Returns the resulting state, or `None` when
    /// nothing was evaluated: no engine, not `Untested`, destroyed, or this
    /// is a replica.
    pub fn evaluate(&mut self, position: GridCoordinate) -> Option<StructureState> {
        if self.role != WorldRole::Authoritative {
            return None;
        }
        let engine = self.grid.engine(position)?;
        if engine.state() != StructureState::Untested || engine.is_destroyed() {
            return None;
        }

        let catalog = Arc::clone(engine.catalog());
        let mut verdicts = VerdictTable::new();
        let probe = Probe {
            position,
            kind: catalog.kind(),
            grid: &self.grid,
        };
        catalog.test_all(&probe, &mut verdicts);

        let winner = verdicts.first(Verdict::Valid);
        let inconclusive = verdicts.contains(Verdict::NotLoaded);

        let engine = self.grid.engine_mut(position)?;
        engine.store_verdicts(verdicts);

        let outcome = match winner {
            Some(template_index) => {
                self.assemble(position, template_index);
                StructureState::Valid
            }
            None if inconclusive => {
                engine.defer();
                StructureState::Unknown
            }
            None => {
                engine.fail();
                StructureState::Invalid
            }
        };
        self.dirty.insert(position);
        debug!(
            %position,
            kind = %catalog.kind(),
            state = outcome.label(),
            "structure evaluated"
        );
        Some(outcome)
    }

    /// Evaluate every `Untested` engine once. Returns how many ran.
    ///
    /// Engines are visited in coordinate order, but correctness does not
    /// depend on it: an engine recruited by an earlier assembly is already
    /// `Valid` and is skipped.
    pub fn evaluate_all(&mut self) -> usize {
        let mut evaluated = 0_usize;
        for position in self.grid.engine_positions() {
            if self.evaluate(position).is_some() {
                evaluated = evaluated.saturating_add(1);
            }
        }
        evaluated
    }

    /// Elect the node at `master` and recruit every compatible engine the
    /// template covers.
    ///
    /// Members that are missing, of another kind, or in an unloaded region
    /// are skipped; assembly never aborts. The component list is rebuilt
    /// from scratch, so stale members drop out on their own.
    fn assemble(&mut self, master: GridCoordinate, template_index: usize) {
        let Some(catalog) = self
            .grid
            .engine(master)
            .map(|engine| Arc::clone(engine.catalog()))
        else {
            return;
        };
        let Some(template) = catalog.get(template_index) else {
            return;
        };

        if let Some(engine) = self.grid.engine_mut(master) {
            engine.claim_master(template_index, template.master_offset());
        }

        let mut members = Vec::new();
        if let Some(origin) = template.origin_for(master) {
            for offset in template.member_offsets() {
                let Some(position) = origin.checked_add(offset) else {
                    continue;
                };
                if position == master || !self.grid.region_loaded(position) {
                    continue;
                }
                let Some(member) = self.grid.engine_mut(position) else {
                    continue;
                };
                if !member.can_match(catalog.kind()) || member.is_destroyed() {
                    continue;
                }
                member.join(Placement {
                    template_index,
                    offset,
                });
                members.push(position);
            }
        }

        self.dirty.extend(members.iter().copied());
        let component_count = members.len().saturating_add(1);
        if let Some(engine) = self.grid.engine_mut(master) {
            for member in members {
                engine.push_component(member);
            }
        }

        info!(
            %master,
            kind = %catalog.kind(),
            template = template.name(),
            components = component_count,
            "structure formed"
        );
        self.events.push(StructureEvent::Formed {
            master,
            kind: catalog.kind().clone(),
            template_index,
            components: component_count,
        });
    }
}
