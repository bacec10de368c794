//! Configuration, logging, and tick orchestration for the Keystone
//! structure engine.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration into strongly-typed structs.
//! - [`telemetry`] -- `tracing` subscriber installation.
//! - [`sink`] -- [`EventSink`] and the tracing-backed [`TracingSink`].
//! - [`tick`] -- The authoritative and replica tick loops.
//!
//! [`EventSink`]: sink::EventSink
//! [`TracingSink`]: sink::TracingSink

pub mod config;
pub mod sink;
pub mod telemetry;
pub mod tick;

pub use config::{
    ConfigError, EngineConfig, EvaluationConfig, LoggingConfig, PropagationConfig,
    ReplicationConfig,
};
pub use sink::{EventSink, TracingSink};
pub use telemetry::init_tracing;
pub use tick::{
    Outgoing, ReplicaTickSummary, TickError, TickSummary, answer_resync_requests,
    run_authoritative_tick, run_replica_tick,
};
