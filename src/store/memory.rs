use crate::constants::{defaults, CHECKPOINT_RETENTION};
use crate::error::Result;
use crate::models::{CheckpointId, JobCheckpoint};
use crate::traits::{CheckpointLookup, CheckpointStore, Clock, SystemClock};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Process-local checkpoint store
pub struct InMemoryCheckpointStore {
    checkpoints: DashMap<CheckpointId, JobCheckpoint>,
    key_prefix: String,
    retention: Duration,
    clock: Arc<dyn Clock>,
}

impl InMemoryCheckpointStore {
    pub fn new(key_prefix: impl Into<String>, retention: Duration) -> Self {
        Self {
            checkpoints: DashMap::new(),
            key_prefix: key_prefix.into(),
            retention,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Snapshot of every stored checkpoint, expired ones included
    pub fn snapshot(&self) -> Vec<(CheckpointId, JobCheckpoint)> {
        self.checkpoints
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl Default for InMemoryCheckpointStore {
    fn default() -> Self {
        Self::new(defaults::CHECKPOINT_KEY_PREFIX, CHECKPOINT_RETENTION)
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, checkpoint: &JobCheckpoint) -> Result<CheckpointId> {
        let id = CheckpointId::generate(&self.key_prefix);
        self.checkpoints.insert(id.clone(), checkpoint.clone());
        debug!(checkpoint_id = %id, next_index = checkpoint.next_index, "Checkpoint saved");
        Ok(id)
    }

    async fn load(&self, id: &CheckpointId) -> Result<CheckpointLookup> {
        // Clone out before any removal so no shard guard is held across it
        let found = self.checkpoints.get(id).map(|entry| entry.value().clone());

        match found {
            None => Ok(CheckpointLookup::Expired),
            Some(checkpoint) if checkpoint.is_expired(self.retention, self.clock.now()) => {
                self.checkpoints.remove(id);
                debug!(checkpoint_id = %id, "Checkpoint past retention, removed");
                Ok(CheckpointLookup::Expired)
            }
            Some(checkpoint) => Ok(CheckpointLookup::Found(checkpoint)),
        }
    }

    async fn delete(&self, id: &CheckpointId) -> Result<()> {
        self.checkpoints.remove(id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let before = self.checkpoints.len();
        self.checkpoints
            .retain(|_, checkpoint| !checkpoint.is_expired(self.retention, now));
        Ok(before - self.checkpoints.len())
    }
}
