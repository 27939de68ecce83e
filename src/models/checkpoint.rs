use super::job_spec::JobSpec;
use super::outcome::FailureReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Identifier of a persisted checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointId(String);

impl CheckpointId {
    /// Generate a fresh identifier carrying `prefix`
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{prefix}{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is safe to use as a storage key (file name, cache key)
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CheckpointId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CheckpointId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Persisted progress record of a paused run
///
/// `next_index` is the 1-based index of the first replica not yet produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCheckpoint {
    pub spec: JobSpec,
    pub next_index: u32,
    pub created_at: DateTime<Utc>,
}

impl JobCheckpoint {
    /// Checkpoint for a run that has not produced anything yet
    pub fn initial(spec: JobSpec, now: DateTime<Utc>) -> Self {
        Self::at(spec, 1, now)
    }

    pub fn at(spec: JobSpec, next_index: u32, now: DateTime<Utc>) -> Self {
        Self {
            spec,
            next_index,
            created_at: now,
        }
    }

    /// Instant after which the checkpoint is no longer resumable
    pub fn expires_at(&self, retention: Duration) -> DateTime<Utc> {
        chrono::Duration::from_std(retention)
            .ok()
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, retention: Duration, now: DateTime<Utc>) -> bool {
        now >= self.expires_at(retention)
    }

    /// The index a resumed invocation starts from
    ///
    /// Anything outside `1..=total_count` is rejected: resuming at zero would
    /// restart the run, and resuming past the end would loop on nothing.
    pub fn resume_index(&self) -> Result<u32, FailureReason> {
        if self.next_index == 0 || self.next_index > self.spec.total_count {
            return Err(FailureReason::InvalidCheckpoint {
                message: format!(
                    "next_index {} is outside 1..={}",
                    self.next_index, self.spec.total_count
                ),
            });
        }
        Ok(self.next_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn spec(total: u32) -> JobSpec {
        JobSpec::new("7").with_total_count(total)
    }

    #[test]
    fn test_generated_ids_carry_prefix_and_are_unique() {
        let a = CheckpointId::generate("batch_gen_");
        let b = CheckpointId::generate("batch_gen_");
        assert!(a.as_str().starts_with("batch_gen_"));
        assert_ne!(a, b);
        assert!(a.is_well_formed());
    }

    #[test]
    fn test_ill_formed_ids() {
        assert!(!CheckpointId::from("../etc/passwd").is_well_formed());
        assert!(!CheckpointId::from("").is_well_formed());
        assert!(CheckpointId::from("batch_gen_1700000000").is_well_formed());
    }

    #[test]
    fn test_resume_index_bounds() {
        let now = Utc::now();
        assert_eq!(JobCheckpoint::initial(spec(10), now).resume_index(), Ok(1));
        assert_eq!(JobCheckpoint::at(spec(10), 10, now).resume_index(), Ok(10));
        assert!(JobCheckpoint::at(spec(10), 0, now).resume_index().is_err());
        assert!(JobCheckpoint::at(spec(10), 11, now).resume_index().is_err());
    }

    #[test]
    fn test_expiry() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let checkpoint = JobCheckpoint::initial(spec(3), created);
        let week = Duration::from_secs(86_400 * 7);

        assert_eq!(
            checkpoint.expires_at(week),
            Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap()
        );
        assert!(!checkpoint.is_expired(week, Utc.with_ymd_and_hms(2024, 1, 7, 23, 59, 59).unwrap()));
        assert!(checkpoint.is_expired(week, Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap()));
    }
}
