//! # Collaborator Traits
//!
//! The contracts a `ResumableBatchJob` is wired with. Concrete bindings (the
//! booking API, a cache-backed checkpoint store, a cron facility) live outside
//! the core and implement these.

use crate::error::Result;
use crate::models::{CheckpointId, DerivedParams, JobCheckpoint, ProducedItem, TemplateItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Resolves the template a run replicates
///
/// Must be idempotent and side-effect free: it is called once at the start of
/// every invocation of a run, including each resumption.
#[async_trait]
pub trait ItemResolver: Send + Sync {
    /// Look up `reference`, returning `None` when it does not name a replicable item
    async fn resolve(&self, reference: &str) -> Option<TemplateItem>;
}

/// Produces one replica
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Produce replica `params.index` of `template`
    ///
    /// An error is terminal for the run; it is reported, never retried.
    async fn produce(
        &self,
        template: &TemplateItem,
        params: &DerivedParams,
    ) -> anyhow::Result<ProducedItem>;
}

/// Result of looking up a checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointLookup {
    Found(JobCheckpoint),
    /// Missing, already consumed, or past retention
    Expired,
    /// Present but undecodable; carries the decode error
    Malformed(String),
}

/// Durable home of paused-run checkpoints
///
/// Checkpoints must survive process restarts and are garbage-collected once
/// older than the store's retention.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, checkpoint: &JobCheckpoint) -> Result<CheckpointId>;

    async fn load(&self, id: &CheckpointId) -> Result<CheckpointLookup>;

    /// Remove a checkpoint. Deleting an unknown id is not an error.
    async fn delete(&self, id: &CheckpointId) -> Result<()>;

    /// Drop every checkpoint past retention, returning how many were removed
    async fn purge_expired(&self) -> Result<usize>;
}

/// Delivers a future `resume` for a checkpoint
///
/// Delivery is at-least-once; the job treats a resume for a checkpoint that no
/// longer exists as a no-op.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn schedule_resume(&self, id: &CheckpointId, earliest: DateTime<Utc>) -> Result<()>;
}

/// Wall-clock source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// `Clock` backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
