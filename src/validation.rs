//! Input validation for batch runs
//!
//! Range checks for submitted job specs, plus size and depth limits for the
//! opaque template attributes that get copied into every replica.

use crate::constants::limits;
use crate::error::{ReplicatorError, Result};
use crate::models::JobSpec;
use serde_json::Value;

/// Maximum serialized size of template attributes (64KB)
const MAX_ATTRIBUTES_SIZE_BYTES: usize = 64 * 1024;

/// Maximum nesting depth for template attributes
const MAX_ATTRIBUTES_DEPTH: usize = 10;

/// Validates a job spec against the accepted ranges
pub fn validate_job_spec(spec: &JobSpec) -> Result<()> {
    let reference = spec.template_reference.trim();
    if reference.is_empty() {
        return Err(ReplicatorError::validation("template_reference must not be empty"));
    }
    if reference.len() > limits::MAX_REFERENCE_LENGTH {
        return Err(ReplicatorError::validation(format!(
            "template_reference too long: {} chars (max: {})",
            reference.len(),
            limits::MAX_REFERENCE_LENGTH
        )));
    }
    if reference.chars().any(char::is_control) {
        return Err(ReplicatorError::validation(
            "template_reference must not contain control characters",
        ));
    }

    check_range(
        "total_count",
        u64::from(spec.total_count),
        u64::from(limits::MIN_TOTAL_COUNT),
        u64::from(limits::MAX_TOTAL_COUNT),
    )?;
    check_range(
        "time_budget_seconds",
        spec.time_budget_seconds,
        limits::MIN_TIME_BUDGET_SECONDS,
        limits::MAX_TIME_BUDGET_SECONDS,
    )?;
    check_range(
        "step_interval",
        u64::from(spec.step_interval),
        u64::from(limits::MIN_STEP_INTERVAL),
        u64::from(limits::MAX_STEP_INTERVAL),
    )?;

    Ok(())
}

fn check_range(field: &str, value: u64, min: u64, max: u64) -> Result<()> {
    if value < min || value > max {
        return Err(ReplicatorError::validation(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

/// Validates template attributes for size and nesting depth
pub fn validate_attributes(value: &Value) -> Result<()> {
    let serialized = serde_json::to_string(value)?;
    if serialized.len() > MAX_ATTRIBUTES_SIZE_BYTES {
        return Err(ReplicatorError::validation(format!(
            "template attributes too large: {} bytes (max: {MAX_ATTRIBUTES_SIZE_BYTES})",
            serialized.len()
        )));
    }

    validate_depth(value, 0)
}

fn validate_depth(value: &Value, current_depth: usize) -> Result<()> {
    if current_depth > MAX_ATTRIBUTES_DEPTH {
        return Err(ReplicatorError::validation(format!(
            "template attributes nested too deep: {current_depth} (max: {MAX_ATTRIBUTES_DEPTH})"
        )));
    }

    match value {
        Value::Object(map) => map
            .values()
            .try_for_each(|val| validate_depth(val, current_depth + 1)),
        Value::Array(arr) => arr
            .iter()
            .try_for_each(|item| validate_depth(item, current_depth + 1)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StepUnit;
    use serde_json::json;

    fn valid_spec() -> JobSpec {
        JobSpec::new("1234")
            .with_total_count(100)
            .with_time_budget_seconds(30)
            .with_step(1, StepUnit::Day)
    }

    #[test]
    fn test_valid_spec() {
        assert!(validate_job_spec(&valid_spec()).is_ok());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(validate_job_spec(&valid_spec().with_total_count(1)).is_ok());
        assert!(validate_job_spec(&valid_spec().with_total_count(10_000)).is_ok());
        assert!(validate_job_spec(&valid_spec().with_time_budget_seconds(15)).is_ok());
        assert!(validate_job_spec(&valid_spec().with_time_budget_seconds(1_000)).is_ok());
        assert!(validate_job_spec(&valid_spec().with_step(100, StepUnit::Month)).is_ok());
    }

    #[test]
    fn test_out_of_range_fields() {
        assert!(validate_job_spec(&valid_spec().with_total_count(0)).is_err());
        assert!(validate_job_spec(&valid_spec().with_total_count(10_001)).is_err());
        assert!(validate_job_spec(&valid_spec().with_time_budget_seconds(14)).is_err());
        assert!(validate_job_spec(&valid_spec().with_time_budget_seconds(1_001)).is_err());
        assert!(validate_job_spec(&valid_spec().with_step(0, StepUnit::Day)).is_err());
        assert!(validate_job_spec(&valid_spec().with_step(101, StepUnit::Day)).is_err());
    }

    #[test]
    fn test_reference_checks() {
        let mut spec = valid_spec();
        spec.template_reference = "   ".to_string();
        assert!(validate_job_spec(&spec).is_err());

        spec.template_reference = "x".repeat(256);
        assert!(validate_job_spec(&spec).is_err());

        spec.template_reference = "12\n34".to_string();
        assert!(validate_job_spec(&spec).is_err());
    }

    #[test]
    fn test_attributes_depth() {
        assert!(validate_attributes(&json!({"resource_id": 3, "persons": [1, 2]})).is_ok());

        let mut deep = json!(1);
        for _ in 0..15 {
            deep = json!({ "inner": deep });
        }
        assert!(validate_attributes(&deep).is_err());
    }
}
