use super::job_spec::StepUnit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The record being replicated, as returned by an `ItemResolver`
///
/// Only the time window is interpreted here. Everything else a concrete binding
/// needs to reproduce the record (resource, persons, status, all-day flag ...)
/// rides along untouched in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateItem {
    pub reference: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub attributes: Value,
}

impl TemplateItem {
    pub fn new(
        reference: impl Into<String>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reference: reference.into(),
            starts_at,
            ends_at,
            attributes: Value::Null,
        }
    }

    pub fn with_attributes(mut self, attributes: Value) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Per-index parameters handed to the unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedParams {
    /// 1-based replica index
    pub index: u32,
    /// `step_interval * index`, in `step_unit`
    pub offset_amount: u64,
    pub step_unit: StepUnit,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// What a successful unit of work reports back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducedItem {
    pub reference: String,
    pub index: u32,
}
