use super::checkpoint::CheckpointId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a run stopped for good
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("Template item could not be resolved: {reference}")]
    InvalidReference { reference: String },

    #[error("Unit of work failed at index {index}: {message}")]
    UnitOfWork { index: u32, message: String },

    #[error("Checkpoint expired or missing: {checkpoint_id}")]
    CheckpointExpired { checkpoint_id: String },

    #[error("Invalid checkpoint: {message}")]
    InvalidCheckpoint { message: String },

    #[error("Invalid job spec: {message}")]
    Validation { message: String },

    #[error("Checkpoint could not be stored: {message}")]
    Storage { message: String },

    #[error("Resume could not be scheduled: {message}")]
    Scheduling { message: String },
}

impl FailureReason {
    /// Stable identifier for log lines and dashboards
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidReference { .. } => "invalid_reference",
            Self::UnitOfWork { .. } => "unit_of_work",
            Self::CheckpointExpired { .. } => "checkpoint_expired",
            Self::InvalidCheckpoint { .. } => "invalid_checkpoint",
            Self::Validation { .. } => "validation",
            Self::Storage { .. } => "storage",
            Self::Scheduling { .. } => "scheduling",
        }
    }
}

/// Result of a single invocation of a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every replica up to `count` has been produced; no checkpoint remains
    Completed { count: u32 },
    /// The time budget ran out; the run continues from `next_index` when
    /// `checkpoint_id` is resumed
    Paused {
        next_index: u32,
        checkpoint_id: CheckpointId,
    },
    /// Terminal failure. `failed_at_index` is the index that was being produced,
    /// or the index the invocation would have started at when it failed before
    /// producing anything.
    Failed {
        reason: FailureReason,
        failed_at_index: u32,
    },
}

impl RunOutcome {
    pub fn failed(reason: FailureReason, failed_at_index: u32) -> Self {
        Self::Failed {
            reason,
            failed_at_index,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Paused { .. } => "paused",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Paused { .. })
    }
}
