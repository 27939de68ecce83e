//! # Replicator Error Types
//!
//! Errors returned by the fallible, non-run APIs: checkpoint stores, schedulers,
//! configuration loading and deferred submission. A run itself never returns
//! these; it folds them into `RunOutcome::Failed`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplicatorError {
    #[error("Checkpoint storage error: {operation}: {message}")]
    Storage { operation: String, message: String },

    #[error("Scheduling error: {message}")]
    Scheduling { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Template item could not be resolved: {reference}")]
    InvalidReference { reference: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReplicatorError {
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn scheduling(message: impl Into<String>) -> Self {
        Self::Scheduling {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ReplicatorError {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReplicatorError>;
