//! The structure world: a grid plus the cross-node orchestration.
//!
//! Engines only ever touch each other through this type, by coordinate.
//! The behavior is split across modules by concern:
//!
//! - [`election`](crate::election) -- evaluation, master election, assembly
//! - [`propagation`](crate::propagation) -- bounded invalidation walks
//! - [`query`](crate::query) -- master resolution and the query surface
//! - [`replication`](crate::replication) -- replica and durable encodings

use std::collections::BTreeSet;
use std::mem;
use std::sync::Arc;

use keystone_pattern::PatternCatalog;
use keystone_types::{ContentDescriptor, GridCoordinate, StructureState};
use tracing::debug;

use crate::delegate::FunctionalDelegate;
use crate::engine::StructureEngine;
use crate::error::StructureError;
use crate::events::StructureEvent;
use crate::grid::{Node, NodeAdapter, VoxelGrid};

/// Hop budget for invalidation walks when none is configured.
pub const DEFAULT_HOP_BUDGET: u32 = 12;

/// Which thread of control owns this world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldRole {
    /// The simulation side: evaluates templates and assembles structures.
    Authoritative,
    /// An observer: only mirrors replicated state, never runs template
    /// tests.
    Replica,
}

/// A grid of nodes and the structure engines they own.
#[derive(Debug)]
pub struct StructureWorld<G: NodeAdapter = VoxelGrid> {
    pub(crate) grid: G,
    pub(crate) role: WorldRole,
    pub(crate) hop_budget: u32,
    pub(crate) events: Vec<StructureEvent>,
    pub(crate) dirty: BTreeSet<GridCoordinate>,
}

impl<G: NodeAdapter> StructureWorld<G> {
    /// Wrap `grid` with the default hop budget.
    pub const fn new(grid: G, role: WorldRole) -> Self {
        Self {
            grid,
            role,
            hop_budget: DEFAULT_HOP_BUDGET,
            events: Vec::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Override the invalidation hop budget.
    #[must_use]
    pub fn with_hop_budget(mut self, hop_budget: u32) -> Self {
        self.hop_budget = hop_budget;
        self
    }

    /// The underlying grid.
    pub const fn grid(&self) -> &G {
        &self.grid
    }

    /// The underlying grid, mutably. Callers that edit content through
    /// this must follow up with [`notify_change`](Self::notify_change).
    pub const fn grid_mut(&mut self) -> &mut G {
        &mut self.grid
    }

    /// This world's role.
    pub const fn role(&self) -> WorldRole {
        self.role
    }

    /// The configured hop budget.
    pub const fn hop_budget(&self) -> u32 {
        self.hop_budget
    }

    /// The engine at `position`.
    pub fn engine(&self, position: GridCoordinate) -> Option<&StructureEngine> {
        self.grid.engine(position)
    }

    /// Coordinates of every engine.
    pub fn engine_positions(&self) -> Vec<GridCoordinate> {
        self.grid.engine_positions()
    }

    /// Take every event published since the last drain.
    pub fn drain_events(&mut self) -> Vec<StructureEvent> {
        mem::take(&mut self.events)
    }

    /// Queue the node at `position` for the next replication drain, e.g.
    /// after its delegate changed state outside an interaction.
    pub fn mark_dirty(&mut self, position: GridCoordinate) {
        if self.grid.engine(position).is_some() {
            self.dirty.insert(position);
        }
    }

    /// Promote every `Unknown` engine back to `Untested` so the next
    /// evaluation retries it. Returns how many were promoted.
    pub fn retry_unknown(&mut self) -> usize {
        let mut promoted = 0_usize;
        for position in self.grid.engine_positions() {
            let Some(engine) = self.grid.engine_mut(position) else {
                continue;
            };
            if engine.state() == StructureState::Unknown && engine.mark_untested() {
                self.dirty.insert(position);
                promoted = promoted.saturating_add(1);
            }
        }
        if promoted > 0 {
            debug!(promoted, "retrying inconclusive structures");
        }
        promoted
    }

    /// Run the functional delegate of every valid master. Returns how many
    /// ran. No-op on replicas.
    pub fn run_delegates(&mut self, tick: u64) -> usize {
        if self.role != WorldRole::Authoritative {
            return 0;
        }
        let mut ran = 0_usize;
        for position in self.grid.engine_positions() {
            if let Some(engine) = self.grid.engine_mut(position)
                && engine.is_valid_master()
            {
                engine.evaluate_delegate(tick);
                ran = ran.saturating_add(1);
            }
        }
        ran
    }
}

impl StructureWorld<VoxelGrid> {
    /// An empty authoritative world.
    pub const fn authoritative() -> Self {
        Self::new(VoxelGrid::new(), WorldRole::Authoritative)
    }

    /// An empty replica world.
    pub const fn replica() -> Self {
        Self::new(VoxelGrid::new(), WorldRole::Replica)
    }

    /// Place a node that takes part in structures of `catalog`'s kind, then
    /// notify the neighborhood.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NodeOccupied`] if a node already exists.
    pub fn place_structure_node(
        &mut self,
        position: GridCoordinate,
        content: ContentDescriptor,
        catalog: Arc<PatternCatalog>,
        delegate: Box<dyn FunctionalDelegate>,
    ) -> Result<(), StructureError> {
        if self.grid.contains_node(position) {
            return Err(StructureError::NodeOccupied(position));
        }
        let engine = StructureEngine::new(position, catalog, delegate);
        self.grid.insert(
            position,
            Node {
                content,
                engine: Some(engine),
            },
        );
        self.dirty.insert(position);
        self.notify_change(position);
        Ok(())
    }

    /// Place a plain block with no engine, then notify the neighborhood.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NodeOccupied`] if a node already exists.
    pub fn place_block(
        &mut self,
        position: GridCoordinate,
        content: ContentDescriptor,
    ) -> Result<(), StructureError> {
        if self.grid.contains_node(position) {
            return Err(StructureError::NodeOccupied(position));
        }
        self.grid.insert(
            position,
            Node {
                content,
                engine: None,
            },
        );
        self.notify_change(position);
        Ok(())
    }

    /// Replace a node's content, then notify the neighborhood.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NodeNotFound`] if there is no node.
    pub fn set_content(
        &mut self,
        position: GridCoordinate,
        content: ContentDescriptor,
    ) -> Result<(), StructureError> {
        if !self.grid.set_content(position, content) {
            return Err(StructureError::NodeNotFound(position));
        }
        self.notify_change(position);
        Ok(())
    }

    /// Destroy the node at `position` and notify its former neighborhood.
    ///
    /// A master gives up its role before the node goes away; on a replica
    /// this happens without running the delegate's cleanup hook. The
    /// removed engine is returned, flagged destroyed.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NodeNotFound`] if there is no node.
    pub fn remove_node(
        &mut self,
        position: GridCoordinate,
    ) -> Result<Option<StructureEngine>, StructureError> {
        let node = self
            .grid
            .remove(position)
            .ok_or(StructureError::NodeNotFound(position))?;
        let run_hooks = self.role == WorldRole::Authoritative;
        let engine = node.engine.map(|mut engine| {
            engine.mark_destroyed(run_hooks);
            engine
        });
        self.dirty.remove(&position);
        self.notify_change(position);
        Ok(engine)
    }

    /// Load or unload the region containing `position`, then notify the
    /// neighborhood so inconclusive structures re-test.
    pub fn set_region_loaded(&mut self, position: GridCoordinate, loaded: bool) {
        self.grid.set_region_loaded(position, loaded);
        self.notify_change(position);
    }
}
