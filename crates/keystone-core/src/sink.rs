//! Destinations for structure events drained at the end of a tick.

use keystone_structure::StructureEvent;
use tracing::info;

/// Receives the events a tick produced.
pub trait EventSink {
    /// Handle one event produced during `tick`.
    fn publish(&mut self, tick: u64, event: &StructureEvent);
}

/// Logs every event at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&mut self, tick: u64, event: &StructureEvent) {
        match event {
            StructureEvent::Formed {
                master,
                kind,
                template_index,
                components,
            } => info!(
                tick,
                %master,
                %kind,
                template_index,
                components,
                "structure event: formed"
            ),
        }
    }
}

/// Collects events in memory, tagged with their tick.
impl EventSink for Vec<(u64, StructureEvent)> {
    fn publish(&mut self, tick: u64, event: &StructureEvent) {
        self.push((tick, event.clone()));
    }
}
