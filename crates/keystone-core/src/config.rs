//! Configuration loading and typed config structures for the Keystone
//! structure engine.
//!
//! Configuration is YAML. Every section and every field is optional; a
//! missing value takes the default documented on its field.

use std::path::Path;

use keystone_structure::{DEFAULT_HOP_BUDGET, NodeAdapter, StructureWorld};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Invalidation walk settings.
    #[serde(default)]
    pub propagation: PropagationConfig,

    /// Replica-side settings.
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Evaluation scheduling.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply the world-level settings to `world`.
    #[must_use]
    pub fn configure<G: NodeAdapter>(&self, world: StructureWorld<G>) -> StructureWorld<G> {
        world.with_hop_budget(self.propagation.hop_budget)
    }
}

/// Invalidation walk configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PropagationConfig {
    /// Maximum hops an invalidation walk travels from a change.
    #[serde(default = "default_hop_budget")]
    pub hop_budget: u32,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            hop_budget: default_hop_budget(),
        }
    }
}

/// Replica-side configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplicationConfig {
    /// Minimum ticks between two resync requests for the same node.
    #[serde(default = "default_resync_interval_ticks")]
    pub resync_interval_ticks: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            resync_interval_ticks: default_resync_interval_ticks(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Evaluation scheduling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvaluationConfig {
    /// Re-test inconclusive (`Unknown`) engines at the start of every
    /// authoritative tick.
    #[serde(default = "default_retry_unknown")]
    pub retry_unknown: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            retry_unknown: default_retry_unknown(),
        }
    }
}

const fn default_hop_budget() -> u32 {
    DEFAULT_HOP_BUDGET
}

const fn default_resync_interval_ticks() -> u64 {
    16
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_retry_unknown() -> bool {
    true
}
