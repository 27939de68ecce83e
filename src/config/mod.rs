//! # Replicator Configuration System
//!
//! Layered configuration for batch runs: built-in defaults, then
//! `config/replicator.yaml`, then `config/replicator.<environment>.yaml`, then
//! `REPLICATOR__*` environment variables. Every layer is optional; the result is
//! validated before use.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use batch_replicator::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let retention = manager.config().checkpoints.retention();
//! let spec = manager.config().defaults.job_spec("1234");
//! # Ok(())
//! # }
//! ```

pub mod loader;

use crate::constants::{defaults, CHECKPOINT_RETENTION};
use crate::error::{ReplicatorError, Result};
use crate::models::{JobSpec, StepUnit};
use crate::validation::validate_job_spec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use loader::ConfigManager;

/// Root configuration structure mirroring replicator.yaml
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplicatorConfig {
    /// Values used for spec fields a caller leaves unset
    pub defaults: JobDefaults,

    /// Checkpoint storage and retention
    pub checkpoints: CheckpointConfig,

    /// Resume scheduling
    pub scheduler: SchedulerConfig,
}

/// Defaults for new job specs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct JobDefaults {
    pub total_count: u32,
    pub time_budget_seconds: u64,
    pub step_interval: u32,
    pub step_unit: StepUnit,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            total_count: defaults::TOTAL_COUNT,
            time_budget_seconds: defaults::TIME_BUDGET_SECONDS,
            step_interval: defaults::STEP_INTERVAL,
            step_unit: defaults::STEP_UNIT,
        }
    }
}

impl JobDefaults {
    /// A spec for `template_reference` carrying these defaults
    pub fn job_spec(&self, template_reference: impl Into<String>) -> JobSpec {
        JobSpec::new(template_reference)
            .with_total_count(self.total_count)
            .with_time_budget_seconds(self.time_budget_seconds)
            .with_step(self.step_interval, self.step_unit)
    }
}

/// Checkpoint storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Seconds an unconsumed checkpoint stays resumable
    pub retention_seconds: u64,
    /// Prefix for generated checkpoint identifiers
    pub key_prefix: String,
    /// Directory of the file checkpoint store
    pub directory: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            retention_seconds: CHECKPOINT_RETENTION.as_secs(),
            key_prefix: defaults::CHECKPOINT_KEY_PREFIX.to_string(),
            directory: PathBuf::from(defaults::CHECKPOINT_DIRECTORY),
        }
    }
}

impl CheckpointConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_seconds)
    }
}

/// Resume scheduling configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minimum delay between a pause and its resume
    pub resume_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            resume_delay_ms: defaults::RESUME_DELAY_MS,
        }
    }
}

impl SchedulerConfig {
    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }
}

impl ReplicatorConfig {
    /// Reject configurations that could never produce a working run
    pub fn validate(&self) -> Result<()> {
        validate_job_spec(&self.defaults.job_spec("defaults")).map_err(|e| {
            ReplicatorError::configuration(format!("invalid job defaults: {e}"))
        })?;

        if self.checkpoints.retention_seconds == 0 {
            return Err(ReplicatorError::configuration(
                "checkpoints.retention_seconds must be greater than 0",
            ));
        }

        let prefix = &self.checkpoints.key_prefix;
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ReplicatorError::configuration(format!(
                "checkpoints.key_prefix must be non-empty and contain only [A-Za-z0-9_-], got {prefix:?}"
            )));
        }

        if self.checkpoints.directory.as_os_str().is_empty() {
            return Err(ReplicatorError::configuration(
                "checkpoints.directory must not be empty",
            ));
        }

        Ok(())
    }
}
