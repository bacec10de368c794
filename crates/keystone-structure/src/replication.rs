//! Producing and applying the replicated and durable encodings.
//!
//! The authoritative world records which nodes changed and encodes them on
//! demand. A replica mirrors what it receives and never runs template
//! tests. Malformed input never escapes: an out-of-range wire index is
//! clamped, an unreadable message flags the node for a resync, and a bad
//! durable index becomes "no template".

use std::mem;
use std::sync::Arc;

use keystone_types::{GridCoordinate, StructureState};
use serde_json::Value;
use tracing::{debug, warn};

use crate::codec::{DurableSnapshot, ReplicaMessage, WirePlacement};
use crate::engine::Placement;
use crate::error::StructureError;
use crate::grid::NodeAdapter;
use crate::world::{StructureWorld, WorldRole};

impl<G: NodeAdapter> StructureWorld<G> {
    /// Build the replicated-state message for the node at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NoEngine`] if there is no engine, or
    /// [`StructureError::Codec`] if encoding fails.
    pub fn encode_replica(&self, position: GridCoordinate) -> Result<Vec<u8>, StructureError> {
        let engine = self
            .grid
            .engine(position)
            .ok_or(StructureError::NoEngine(position))?;
        let placement = engine.placement().map(|p| WirePlacement {
            template_index: engine.pattern_index(),
            position_in_template: p.offset,
        });
        let message = ReplicaMessage {
            state: engine.state(),
            placement,
            functional: engine.delegate().encode_replica(),
        };
        message
            .encode()
            .map_err(|source| StructureError::Codec { position, source })
    }

    /// Encode every node whose replicated state changed since the last
    /// drain. Masters come first so members resolve on arrival; within each
    /// group the order is by coordinate. Nodes that fail to encode are
    /// logged and skipped.
    pub fn drain_replication(&mut self) -> Vec<(GridCoordinate, Vec<u8>)> {
        let (masters, members): (Vec<_>, Vec<_>) = mem::take(&mut self.dirty)
            .into_iter()
            .partition(|&position| self.grid.engine(position).is_some_and(|e| e.is_master()));
        let mut outgoing = Vec::with_capacity(masters.len().saturating_add(members.len()));
        for position in masters.into_iter().chain(members) {
            match self.encode_replica(position) {
                Ok(bytes) => outgoing.push((position, bytes)),
                Err(StructureError::NoEngine(_)) => {}
                Err(error) => warn!(%position, %error, "skipping replication"),
            }
        }
        outgoing
    }

    /// Apply a replicated-state message to the node at `position`.
    ///
    /// Returns whether the message was applied. A message that cannot be
    /// decoded leaves the node unchanged and flags it for a resync.
    pub fn apply_replica(&mut self, position: GridCoordinate, bytes: &[u8]) -> bool {
        if self.role != WorldRole::Replica {
            return false;
        }
        let Some(engine) = self.grid.engine_mut(position) else {
            debug!(%position, "replica message for a node without an engine");
            return false;
        };
        let message = match ReplicaMessage::decode(bytes) {
            Ok(message) => message,
            Err(error) => {
                warn!(%position, %error, "discarding malformed replica message");
                engine.request_resync();
                return false;
            }
        };
        engine.clear_resync();

        let catalog = Arc::clone(engine.catalog());
        let placement = match (message.state, message.placement) {
            (StructureState::Valid, Some(wire)) => {
                let clamped = catalog.clamp_index(wire.template_index);
                if clamped.and_then(|i| i8::try_from(i).ok()) != Some(wire.template_index) {
                    warn!(
                        %position,
                        received = wire.template_index,
                        templates = catalog.len(),
                        "clamping replicated template index"
                    );
                }
                clamped.map(|template_index| Placement {
                    template_index,
                    offset: wire.position_in_template,
                })
            }
            _ => None,
        };
        let state = if message.state == StructureState::Valid && placement.is_none() {
            StructureState::Invalid
        } else {
            message.state
        };
        engine.mirror(placement, state);
        engine.delegate_mut().decode_replica(&message.functional);

        if placement.is_some() && self.resolve_master(position).is_none() {
            if let Some(engine) = self.grid.engine_mut(position) {
                engine.request_resync();
            }
        }
        true
    }

    /// Coordinates due a full resync at `tick`, at most one request per
    /// node every `interval` ticks.
    pub fn collect_resync_requests(&mut self, tick: u64, interval: u64) -> Vec<GridCoordinate> {
        let mut requests = Vec::new();
        for position in self.grid.engine_positions() {
            if let Some(engine) = self.grid.engine_mut(position)
                && engine.take_resync_request(tick, interval)
            {
                requests.push(position);
            }
        }
        requests
    }

    /// Build the durable snapshot for the node at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NoEngine`] if there is no engine, or
    /// [`StructureError::Codec`] if encoding fails.
    pub fn write_durable(&self, position: GridCoordinate) -> Result<Value, StructureError> {
        let engine = self
            .grid
            .engine(position)
            .ok_or(StructureError::NoEngine(position))?;
        DurableSnapshot {
            master: engine.is_master(),
            pattern: engine.pattern_index(),
            functional: engine.delegate().write_durable(),
        }
        .encode()
        .map_err(|source| StructureError::Codec { position, source })
    }

    /// Restore the node at `position` from a durable snapshot.
    ///
    /// A malformed snapshot or an index outside the catalog restores "no
    /// template". Only a master's placement can be rebuilt, since its offset
    /// is the template's master offset; members are re-recruited when their
    /// master assembles again. The engine stays `Untested`.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NoEngine`] if there is no engine.
    pub fn read_durable(&mut self, position: GridCoordinate, data: &Value) -> Result<(), StructureError> {
        let engine = self
            .grid
            .engine_mut(position)
            .ok_or(StructureError::NoEngine(position))?;
        let snapshot = DurableSnapshot::decode(data).unwrap_or_else(|error| {
            warn!(%position, %error, "unreadable durable snapshot, restoring no template");
            DurableSnapshot::default()
        });

        engine.delegate_mut().read_durable(&snapshot.functional);

        let catalog = Arc::clone(engine.catalog());
        let template_index = catalog.checked_index(snapshot.pattern);
        if template_index.is_none() && snapshot.pattern >= 0 {
            warn!(
                %position,
                pattern = snapshot.pattern,
                templates = catalog.len(),
                "durable template index out of range"
            );
        }
        let placement = template_index
            .filter(|_| snapshot.master)
            .and_then(|index| {
                catalog.get(index).map(|template| Placement {
                    template_index: index,
                    offset: template.master_offset(),
                })
            });
        engine.restore(snapshot.master, placement);
        Ok(())
    }
}
