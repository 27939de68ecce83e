//! # Structured Logging Module
//!
//! Environment-aware structured logging to the console and a JSON log file.
//! Run outcomes are reported here; this is the operational side channel for
//! batch runs that execute in the background.

use crate::models::RunOutcome;
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);

        let log_dir = PathBuf::from("log");
        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");

        // Fall back to console-only output when the log directory is unusable
        let file_output = fs::create_dir_all(&log_dir).ok().map(|()| {
            let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
            tracing_appender::non_blocking(file_appender)
        });
        let (file_writer, guard) = match file_output {
            Some((writer, guard)) => (Some(writer), Some(guard)),
            None => (None, None),
        };

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_filter(EnvFilter::new(log_level.clone())),
            )
            .with(file_writer.map(|writer| {
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::new(log_level))
            }));

        // An embedding application may already own the global subscriber
        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_dir.join(&log_filename).display(),
            file_output = guard.is_some(),
            "Structured logging initialized"
        );

        // The writer flushes on drop; keep it alive for the process lifetime
        if let Some(guard) = guard {
            std::mem::forget(guard);
        }
    });
}

/// Get current environment from environment variables
pub(crate) fn get_environment() -> String {
    std::env::var("REPLICATOR_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for job operations
pub fn log_job_operation(
    operation: &str,
    template_reference: Option<&str>,
    checkpoint_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        template_reference = template_reference,
        checkpoint_id = checkpoint_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "JOB_OPERATION"
    );
}

/// Report how an invocation of a run ended
pub fn log_run_outcome(operation: &str, template_reference: &str, outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed { count } => tracing::info!(
            operation = %operation,
            template_reference = %template_reference,
            status = outcome.status(),
            count = count,
            "Generation of {count} copies of {template_reference} has completed"
        ),
        RunOutcome::Paused {
            next_index,
            checkpoint_id,
        } => tracing::info!(
            operation = %operation,
            template_reference = %template_reference,
            status = outcome.status(),
            next_index = next_index,
            checkpoint_id = %checkpoint_id,
            "Time budget reached, resume scheduled at index {next_index}"
        ),
        RunOutcome::Failed {
            reason,
            failed_at_index,
        } => log_error(
            "batch_job",
            operation,
            &reason.to_string(),
            Some(&format!(
                "template_reference={template_reference} code={} failed_at_index={failed_at_index}",
                reason.code()
            )),
        ),
    }
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_environment_detection() {
        std::env::set_var("REPLICATOR_ENV", "test_override");
        let env = get_environment();
        assert_eq!(env, "test_override");
        std::env::remove_var("REPLICATOR_ENV");
    }
}
