//! # System Constants
//!
//! Operational boundaries and defaults for batch replication runs.

use std::time::Duration;

/// Bounds applied to every submitted `JobSpec`
pub mod limits {
    pub const MIN_TOTAL_COUNT: u32 = 1;
    pub const MAX_TOTAL_COUNT: u32 = 10_000;

    pub const MIN_TIME_BUDGET_SECONDS: u64 = 15;
    pub const MAX_TIME_BUDGET_SECONDS: u64 = 1_000;

    pub const MIN_STEP_INTERVAL: u32 = 1;
    pub const MAX_STEP_INTERVAL: u32 = 100;

    /// Longest accepted template reference
    pub const MAX_REFERENCE_LENGTH: usize = 255;
}

/// Defaults used when a caller leaves a `JobSpec` field unset
pub mod defaults {
    use crate::models::StepUnit;

    pub const TOTAL_COUNT: u32 = 1_000;
    pub const TIME_BUDGET_SECONDS: u64 = 30;
    pub const STEP_INTERVAL: u32 = 1;
    pub const STEP_UNIT: StepUnit = StepUnit::Day;

    /// Prefix for checkpoint identifiers
    pub const CHECKPOINT_KEY_PREFIX: &str = "batch_gen_";

    /// Directory used by the file checkpoint store
    pub const CHECKPOINT_DIRECTORY: &str = "checkpoints";

    pub const RESUME_DELAY_MS: u64 = 0;
}

/// How long an unconsumed checkpoint is kept before it is garbage-collected (7 days)
pub const CHECKPOINT_RETENTION: Duration = Duration::from_secs(86_400 * 7);

/// Operation names used in structured log lines
pub mod operations {
    pub const SUBMIT: &str = "submit";
    pub const RESUME: &str = "resume";
    pub const DEFER: &str = "defer";
    pub const PAUSE: &str = "pause";
    pub const PURGE: &str = "purge";
}
