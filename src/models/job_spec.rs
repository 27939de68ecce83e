use crate::constants::defaults;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Unit of spacing between consecutive replicas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepUnit {
    #[serde(alias = "minutes")]
    Minute,
    #[serde(alias = "hours")]
    Hour,
    #[serde(alias = "days")]
    Day,
    #[serde(alias = "months")]
    Month,
}

impl fmt::Display for StepUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minute => write!(f, "minute"),
            Self::Hour => write!(f, "hour"),
            Self::Day => write!(f, "day"),
            Self::Month => write!(f, "month"),
        }
    }
}

impl std::str::FromStr for StepUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" | "minutes" => Ok(Self::Minute),
            "hour" | "hours" => Ok(Self::Hour),
            "day" | "days" => Ok(Self::Day),
            "month" | "months" => Ok(Self::Month),
            other => Err(format!("Invalid step unit: {other}")),
        }
    }
}

impl Default for StepUnit {
    fn default() -> Self {
        defaults::STEP_UNIT
    }
}

/// Immutable description of a batch run
///
/// A spec travels unchanged inside every checkpoint taken for the run, so a
/// resumed invocation always works from the parameters the run was submitted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Opaque identifier of the item to replicate
    pub template_reference: String,
    /// Number of replicas to produce
    pub total_count: u32,
    /// Wall-clock seconds an invocation may run before it checkpoints
    pub time_budget_seconds: u64,
    /// Spacing between consecutive replicas, in `step_unit`
    pub step_interval: u32,
    pub step_unit: StepUnit,
}

impl JobSpec {
    /// Create a spec for `template_reference` using the default count, budget and spacing
    pub fn new(template_reference: impl Into<String>) -> Self {
        Self {
            template_reference: template_reference.into(),
            total_count: defaults::TOTAL_COUNT,
            time_budget_seconds: defaults::TIME_BUDGET_SECONDS,
            step_interval: defaults::STEP_INTERVAL,
            step_unit: defaults::STEP_UNIT,
        }
    }

    pub fn with_total_count(mut self, total_count: u32) -> Self {
        self.total_count = total_count;
        self
    }

    pub fn with_time_budget_seconds(mut self, seconds: u64) -> Self {
        self.time_budget_seconds = seconds;
        self
    }

    pub fn with_step(mut self, interval: u32, unit: StepUnit) -> Self {
        self.step_interval = interval;
        self.step_unit = unit;
        self
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let spec = JobSpec::new("42");
        assert_eq!(spec.template_reference, "42");
        assert_eq!(spec.total_count, 1000);
        assert_eq!(spec.time_budget_seconds, 30);
        assert_eq!(spec.step_interval, 1);
        assert_eq!(spec.step_unit, StepUnit::Day);
        assert_eq!(spec.time_budget(), Duration::from_secs(30));
    }

    #[test]
    fn test_step_unit_parsing_accepts_plural_forms() {
        assert_eq!("minutes".parse::<StepUnit>().unwrap(), StepUnit::Minute);
        assert_eq!("Hour".parse::<StepUnit>().unwrap(), StepUnit::Hour);
        assert_eq!("days".parse::<StepUnit>().unwrap(), StepUnit::Day);
        assert_eq!("month".parse::<StepUnit>().unwrap(), StepUnit::Month);
        assert!("fortnight".parse::<StepUnit>().is_err());
    }

    #[test]
    fn test_step_unit_serde() {
        let json = serde_json::to_string(&StepUnit::Month).unwrap();
        assert_eq!(json, "\"month\"");

        let parsed: StepUnit = serde_json::from_str("\"days\"").unwrap();
        assert_eq!(parsed, StepUnit::Day);
    }
}
