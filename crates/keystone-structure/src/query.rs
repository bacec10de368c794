//! Master resolution and the structure-level query surface.
//!
//! Every structure-level query goes through [`StructureWorld::resolve_master`]
//! and fails soft (empty, `false`, `None`) when the master does not resolve.

use keystone_pattern::VerdictTable;
use keystone_types::{CellMarker, GridCoordinate, StructureState, StructureSummary};

use crate::delegate::Actor;
use crate::engine::StructureEngine;
use crate::grid::NodeAdapter;
use crate::world::StructureWorld;

impl<G: NodeAdapter> StructureWorld<G> {
    /// Resolve the master of the node at `position`.
    ///
    /// The node's master pointer is only trusted if the engine found there
    /// is of the same kind and independently confirms it is a valid master.
    /// A stale pointer to a node that has since abandoned the role resolves
    /// to `None`.
    pub fn resolve_master(&self, position: GridCoordinate) -> Option<GridCoordinate> {
        self.master_engine(position).map(StructureEngine::position)
    }

    /// The resolved master's engine.
    pub fn master_engine(&self, position: GridCoordinate) -> Option<&StructureEngine> {
        let engine = self.grid.engine(position)?;
        let master_position = engine.master_position()?;
        self.grid
            .engine(master_position)
            .filter(|master| master.can_match(engine.kind()) && master.is_valid_master())
    }

    /// State of the engine at `position`.
    pub fn current_state(&self, position: GridCoordinate) -> Option<StructureState> {
        self.grid.engine(position).map(StructureEngine::state)
    }

    /// Components of the structure `position` belongs to, taken from the
    /// master. Empty when the master does not resolve.
    pub fn current_components(&self, position: GridCoordinate) -> &[GridCoordinate] {
        self.master_engine(position)
            .map(StructureEngine::local_components)
            .unwrap_or_default()
    }

    /// Whether `position` belongs to a structure whose master resolves.
    pub fn is_structure_valid(&self, position: GridCoordinate) -> bool {
        self.master_engine(position).is_some()
    }

    /// The node's template index in wire form, `-1` without a template.
    pub fn pattern_index(&self, position: GridCoordinate) -> i8 {
        self.grid
            .engine(position)
            .map_or(-1, StructureEngine::pattern_index)
    }

    /// The template marker of the node's own cell, or
    /// [`CellMarker::OTHER`] when the node is not part of a valid structure.
    pub fn pattern_marker_at(&self, position: GridCoordinate) -> CellMarker {
        if !self.is_structure_valid(position) {
            return CellMarker::OTHER;
        }
        self.grid
            .engine(position)
            .and_then(StructureEngine::raw_marker)
            .unwrap_or(CellMarker::OTHER)
    }

    /// Verdicts from the engine's last evaluation.
    pub fn verdicts(&self, position: GridCoordinate) -> Option<&VerdictTable> {
        self.grid.engine(position).map(StructureEngine::verdicts)
    }

    /// Look up a capability of the structure's behavior by type.
    ///
    /// Returns the resolved master's delegate if it is a `T`.
    pub fn capability<T: 'static>(&self, position: GridCoordinate) -> Option<&T> {
        self.master_engine(position)?
            .delegate()
            .as_any()
            .downcast_ref::<T>()
    }

    /// Mutable capability lookup through the resolved master.
    pub fn capability_mut<T: 'static>(&mut self, position: GridCoordinate) -> Option<&mut T> {
        let master = self.resolve_master(position)?;
        self.grid
            .engine_mut(master)?
            .delegate_mut()
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Forward an interaction to the master's delegate. Returns whether it
    /// was consumed; `false` when the master does not resolve. A consumed
    /// interaction queues the master for replication.
    pub fn interact(&mut self, position: GridCoordinate, actor: &Actor) -> bool {
        let Some(master) = self.resolve_master(position) else {
            return false;
        };
        let consumed = self
            .grid
            .engine_mut(master)
            .is_some_and(|engine| engine.delegate_mut().handle_interaction(actor));
        if consumed {
            self.dirty.insert(master);
        }
        consumed
    }

    /// Observer-facing summary of the node.
    pub fn summary(&self, position: GridCoordinate) -> Option<StructureSummary> {
        let engine = self.grid.engine(position)?;
        Some(StructureSummary {
            position,
            state: engine.state(),
            is_master: engine.is_master() && engine.state() == StructureState::Valid,
            master: engine.master_position(),
            template_index: engine.pattern_index(),
        })
    }
}
