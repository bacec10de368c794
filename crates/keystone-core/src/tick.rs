//! Tick cycle: the per-tick loop that drives structure recognition.
//!
//! An authoritative tick runs these phases in order:
//!
//! 1. **Retry** -- promote inconclusive (`Unknown`) engines back to
//!    `Untested` so regions that finished loading get a definite verdict.
//! 2. **Evaluate** -- test every `Untested` engine, electing masters and
//!    assembling structures.
//! 3. **Operate** -- run the functional delegate of every valid master.
//! 4. **Publish** -- hand the tick's events to the [`EventSink`].
//! 5. **Replicate** -- encode every node whose replicated state changed.
//!
//! A replica tick applies inbound messages and emits throttled resync
//! requests for nodes whose master could not be resolved.

use keystone_structure::{NodeAdapter, StructureError, StructureWorld, WorldRole};
use keystone_types::GridCoordinate;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::sink::EventSink;

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The world's role does not allow this tick.
    #[error("{expected:?} tick run on a {actual:?} world")]
    WrongRole {
        /// The role the tick requires.
        expected: WorldRole,
        /// The world's actual role.
        actual: WorldRole,
    },

    /// A structure operation failed.
    #[error("structure error: {source}")]
    Structure {
        /// The underlying structure error.
        #[from]
        source: StructureError,
    },
}

/// One replicated-state message, addressed by node.
pub type Outgoing = (GridCoordinate, Vec<u8>);

/// What an authoritative tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick number.
    pub tick: u64,
    /// `Unknown` engines promoted for retry.
    pub retried: usize,
    /// Engines evaluated.
    pub evaluated: usize,
    /// Delegates run.
    pub delegates_run: usize,
    /// Events published to the sink.
    pub events: usize,
    /// Replicated-state messages to send.
    pub outgoing: Vec<Outgoing>,
}

/// What a replica tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicaTickSummary {
    /// The tick number.
    pub tick: u64,
    /// Messages applied.
    pub applied: usize,
    /// Messages rejected (malformed or for a node without an engine).
    pub rejected: usize,
    /// Nodes to request a full resync for.
    pub resync_requests: Vec<GridCoordinate>,
}

fn require_role<G: NodeAdapter>(
    world: &StructureWorld<G>,
    expected: WorldRole,
) -> Result<(), TickError> {
    let actual = world.role();
    if actual == expected {
        Ok(())
    } else {
        Err(TickError::WrongRole { expected, actual })
    }
}

/// Run one authoritative tick.
///
/// # Errors
///
/// Returns [`TickError::WrongRole`] if `world` is a replica.
pub fn run_authoritative_tick<G: NodeAdapter>(
    world: &mut StructureWorld<G>,
    tick: u64,
    config: &EngineConfig,
    sink: &mut dyn EventSink,
) -> Result<TickSummary, TickError> {
    require_role(world, WorldRole::Authoritative)?;

    // Phase 1: Retry
    let retried = if config.evaluation.retry_unknown {
        world.retry_unknown()
    } else {
        0
    };

    // Phase 2: Evaluate
    let evaluated = world.evaluate_all();

    // Phase 3: Operate
    let delegates_run = world.run_delegates(tick);

    // Phase 4: Publish
    let events = world.drain_events();
    for event in &events {
        sink.publish(tick, event);
    }

    // Phase 5: Replicate
    let outgoing = world.drain_replication();

    debug!(
        tick,
        retried,
        evaluated,
        delegates_run,
        events = events.len(),
        outgoing = outgoing.len(),
        "authoritative tick complete"
    );

    Ok(TickSummary {
        tick,
        retried,
        evaluated,
        delegates_run,
        events: events.len(),
        outgoing,
    })
}

/// Encode the current state of every requested node for a replica that
/// asked for a resync. Nodes that no longer exist are skipped.
///
/// # Errors
///
/// Returns [`TickError::WrongRole`] if `world` is a replica, or
/// [`TickError::Structure`] if a node's state cannot be encoded.
pub fn answer_resync_requests<G: NodeAdapter>(
    world: &StructureWorld<G>,
    requests: &[GridCoordinate],
) -> Result<Vec<Outgoing>, TickError> {
    require_role(world, WorldRole::Authoritative)?;
    let mut answers = Vec::with_capacity(requests.len());
    for &position in requests {
        match world.encode_replica(position) {
            Ok(bytes) => answers.push((position, bytes)),
            Err(StructureError::NoEngine(_)) => {
                debug!(%position, "resync requested for a node without an engine");
            }
            Err(error) => return Err(error.into()),
        }
    }
    Ok(answers)
}

/// Run one replica tick: apply `inbound` messages in order, then collect
/// the resync requests due this tick.
///
/// # Errors
///
/// Returns [`TickError::WrongRole`] if `world` is authoritative.
pub fn run_replica_tick<G: NodeAdapter>(
    world: &mut StructureWorld<G>,
    tick: u64,
    inbound: &[Outgoing],
    config: &EngineConfig,
) -> Result<ReplicaTickSummary, TickError> {
    require_role(world, WorldRole::Replica)?;

    let mut applied = 0_usize;
    let mut rejected = 0_usize;
    for (position, bytes) in inbound {
        if world.apply_replica(*position, bytes) {
            applied = applied.saturating_add(1);
        } else {
            rejected = rejected.saturating_add(1);
        }
    }
    if rejected > 0 {
        warn!(tick, rejected, "replica messages rejected");
    }

    let resync_requests =
        world.collect_resync_requests(tick, config.replication.resync_interval_ticks);

    Ok(ReplicaTickSummary {
        tick,
        applied,
        rejected,
        resync_requests,
    })
}
