//! Configuration loading and typed config structures for the engine.
//!
//! The canonical configuration lives in `menagerie-config.yaml` next to
//! the binary's working directory. This module defines strongly-typed
//! structs mirroring the YAML structure and a loader that reads,
//! parses, and validates the file. Every field has a default, so a
//! missing file or an empty document yields a runnable configuration.

use std::path::Path;

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

    /// The file parsed but holds values the engine cannot run with.
    #[error("invalid config: {reason}")]
    Invalid {
        /// What was wrong with the value.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `menagerie-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// World generation and tick loop settings.
    #[serde(default)]
    pub world: WorldSection,

    /// Per-pet perception tuning.
    #[serde(default)]
    pub perception: PerceptionSection,

    /// Batch draining limits.
    #[serde(default)]
    pub dispatch: DispatchSection,

    /// Background work coordinator settings.
    #[serde(default)]
    pub coordinator: CoordinatorSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject value combinations the engine cannot run with.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.world.owners == 0 {
            return Err(invalid("world.owners must be at least 1"));
        }
        if self.world.pets_per_owner == 0 {
            return Err(invalid("world.pets_per_owner must be at least 1"));
        }
        if self.perception.timeline_capacity == 0 {
            return Err(invalid("perception.timeline_capacity must be at least 1"));
        }
        if self.dispatch.max_batch_size == 0 {
            return Err(invalid("dispatch.max_batch_size must be at least 1"));
        }
        if self.coordinator.max_in_flight == 0 {
            return Err(invalid("coordinator.max_in_flight must be at least 1"));
        }
        if !self.coordinator.max_load.is_finite() || self.coordinator.max_load <= 0.0 {
            return Err(invalid("coordinator.max_load must be a positive number"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// World generation and tick loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldSection {
    /// Seed for the per-tick world rolls (drift, damage). Population
    /// layout is drawn fresh each run; the rolls replay for a fixed seed.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of owners to generate.
    #[serde(default = "default_owners")]
    pub owners: u32,

    /// Pets generated per owner.
    #[serde(default = "default_pets_per_owner")]
    pub pets_per_owner: u32,

    /// Real-time milliseconds per tick (0 = run flat out).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks to run before the engine stops (0 = unlimited).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Emit a telemetry report every N ticks.
    #[serde(default = "default_telemetry_interval_ticks")]
    pub telemetry_interval_ticks: u64,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            owners: default_owners(),
            pets_per_owner: default_pets_per_owner(),
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: default_max_ticks(),
            telemetry_interval_ticks: default_telemetry_interval_ticks(),
        }
    }
}

/// Per-pet perception tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PerceptionSection {
    /// Stimulus timeline capacity per pet.
    #[serde(default = "default_timeline_capacity")]
    pub timeline_capacity: usize,

    /// Stimulus timeline TTL in ticks.
    #[serde(default = "default_timeline_ttl_ticks")]
    pub timeline_ttl_ticks: u64,

    /// Context cache idle budget in ticks.
    #[serde(default = "default_max_idle_ticks")]
    pub max_idle_ticks: u64,
}

impl Default for PerceptionSection {
    fn default() -> Self {
        Self {
            timeline_capacity: default_timeline_capacity(),
            timeline_ttl_ticks: default_timeline_ttl_ticks(),
            max_idle_ticks: default_max_idle_ticks(),
        }
    }
}

/// Batch draining limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatchSection {
    /// Maximum tasks drained into one owner batch.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Schedule per-pet upkeep tasks every N ticks.
    #[serde(default = "default_schedule_interval_ticks")]
    pub schedule_interval_ticks: u64,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            schedule_interval_ticks: default_schedule_interval_ticks(),
        }
    }
}

/// Background work coordinator settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoordinatorSection {
    /// Load factor at or above which new work is throttled.
    #[serde(default = "default_max_load")]
    pub max_load: f64,

    /// In-flight work items counted as full load.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: u32,

    /// Compare offloaded results against the synchronous path.
    #[serde(default)]
    pub shadow_compare: bool,
}

impl Default for CoordinatorSection {
    fn default() -> Self {
        Self {
            max_load: default_max_load(),
            max_in_flight: default_max_in_flight(),
            shadow_compare: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSection {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_seed() -> u64 {
    7
}

const fn default_owners() -> u32 {
    4
}

const fn default_pets_per_owner() -> u32 {
    6
}

const fn default_tick_interval_ms() -> u64 {
    250
}

const fn default_max_ticks() -> u64 {
    120
}

const fn default_telemetry_interval_ticks() -> u64 {
    20
}

const fn default_timeline_capacity() -> usize {
    32
}

const fn default_timeline_ttl_ticks() -> u64 {
    600
}

const fn default_max_idle_ticks() -> u64 {
    200
}

const fn default_max_batch_size() -> usize {
    16
}

const fn default_schedule_interval_ticks() -> u64 {
    4
}

const fn default_max_load() -> f64 {
    0.85
}

const fn default_max_in_flight() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_owned()
}
