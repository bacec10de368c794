//! The functional delegate contract.
//!
//! A delegate implements what a formed structure actually does (a tank
//! holds fluid, an oven cooks). Each engine owns exactly one delegate,
//! selected when the node is constructed. The engine invokes behavior only
//! on a confirmed master; every other node keeps its delegate idle.

use std::any::Any;

use keystone_types::GridCoordinate;
use serde_json::Value;

/// Whoever interacts with a structure (a player, a machine, a script).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Stable identifier of the actor.
    pub id: String,
}

impl Actor {
    /// Create an actor from its identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// What a master's delegate sees on each authoritative tick.
#[derive(Debug, Clone, Copy)]
pub struct DelegateContext<'a> {
    /// The simulation tick.
    pub tick: u64,
    /// The master node.
    pub master: GridCoordinate,
    /// Every component of the structure, master first.
    pub components: &'a [GridCoordinate],
}

/// Behavior of a formed structure.
///
/// Every method except the [`Any`] accessors has a no-op default so simple
/// delegates only override what they use.
pub trait FunctionalDelegate: Any {
    /// Run one tick of structure behavior. Only called on a valid master.
    fn evaluate(&mut self, _ctx: &DelegateContext<'_>) {}

    /// Durable state persisted with the node.
    fn write_durable(&self) -> Value {
        Value::Null
    }

    /// Restore durable state written by [`write_durable`](Self::write_durable).
    fn read_durable(&mut self, _data: &Value) {}

    /// Bytes appended to the replicated-state message.
    fn encode_replica(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Apply bytes produced by [`encode_replica`](Self::encode_replica).
    fn decode_replica(&mut self, _bytes: &[u8]) {}

    /// React to an actor using the structure. Returns whether the
    /// interaction was consumed.
    fn handle_interaction(&mut self, _actor: &Actor) -> bool {
        false
    }

    /// Drop held content. Runs when the node's template assignment changes
    /// while it is not the master.
    fn evict_contents(&mut self) {}

    /// Runs when the node gives up the master role, before its state flips.
    fn on_master_reset(&mut self) {}

    /// Capability lookup support.
    fn as_any(&self) -> &dyn Any;

    /// Mutable capability lookup support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Stand-in delegate for nodes whose structure has no behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct InertDelegate;

impl FunctionalDelegate for InertDelegate {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
