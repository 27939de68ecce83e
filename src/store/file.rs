use crate::error::{ReplicatorError, Result};
use crate::models::{CheckpointId, JobCheckpoint};
use crate::traits::{CheckpointLookup, CheckpointStore, Clock, SystemClock};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

const CHECKPOINT_EXTENSION: &str = "json";

/// Directory-backed checkpoint store, one `<id>.json` document per checkpoint
///
/// Writes go to a temporary file that is renamed into place, so a crash never
/// leaves a half-written checkpoint behind.
pub struct FileCheckpointStore {
    directory: PathBuf,
    key_prefix: String,
    retention: Duration,
    clock: Arc<dyn Clock>,
}

impl FileCheckpointStore {
    /// Open (creating if needed) a store rooted at `directory`
    pub async fn open(
        directory: impl Into<PathBuf>,
        key_prefix: impl Into<String>,
        retention: Duration,
    ) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)
            .await
            .map_err(|e| ReplicatorError::storage("open", format!("{}: {e}", directory.display())))?;

        Ok(Self {
            directory,
            key_prefix: key_prefix.into(),
            retention,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `None` for ids that could escape the store directory
    fn path_for(&self, id: &CheckpointId) -> Option<PathBuf> {
        id.is_well_formed()
            .then(|| self.directory.join(format!("{id}.{CHECKPOINT_EXTENSION}")))
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ReplicatorError::storage(
                "delete",
                format!("{}: {e}", path.display()),
            )),
        }
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, checkpoint: &JobCheckpoint) -> Result<CheckpointId> {
        let id = CheckpointId::generate(&self.key_prefix);
        let path = self
            .path_for(&id)
            .ok_or_else(|| ReplicatorError::storage("save", format!("unusable checkpoint id {id}")))?;
        let tmp_path = path.with_extension("tmp");

        let document = serde_json::to_vec_pretty(checkpoint)?;
        fs::write(&tmp_path, document)
            .await
            .map_err(|e| ReplicatorError::storage("save", format!("{}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| ReplicatorError::storage("save", format!("{}: {e}", path.display())))?;

        debug!(checkpoint_id = %id, path = %path.display(), "Checkpoint written");
        Ok(id)
    }

    async fn load(&self, id: &CheckpointId) -> Result<CheckpointLookup> {
        let Some(path) = self.path_for(id) else {
            return Ok(CheckpointLookup::Expired);
        };

        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CheckpointLookup::Expired),
            Err(e) => {
                return Err(ReplicatorError::storage(
                    "load",
                    format!("{}: {e}", path.display()),
                ))
            }
        };

        let checkpoint: JobCheckpoint = match serde_json::from_slice(&raw) {
            Ok(checkpoint) => checkpoint,
            Err(e) => return Ok(CheckpointLookup::Malformed(e.to_string())),
        };

        if checkpoint.is_expired(self.retention, self.clock.now()) {
            self.remove_file(&path).await?;
            debug!(checkpoint_id = %id, "Checkpoint past retention, removed");
            return Ok(CheckpointLookup::Expired);
        }

        Ok(CheckpointLookup::Found(checkpoint))
    }

    async fn delete(&self, id: &CheckpointId) -> Result<()> {
        match self.path_for(id) {
            Some(path) => self.remove_file(&path).await,
            None => Ok(()),
        }
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut removed = 0;

        let mut entries = fs::read_dir(&self.directory)
            .await
            .map_err(|e| ReplicatorError::storage("purge", e.to_string()))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ReplicatorError::storage("purge", e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(CHECKPOINT_EXTENSION) {
                continue;
            }

            let checkpoint = match fs::read(&path).await {
                Ok(raw) => serde_json::from_slice::<JobCheckpoint>(&raw),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(ReplicatorError::storage(
                        "purge",
                        format!("{}: {e}", path.display()),
                    ))
                }
            };

            match checkpoint {
                Ok(checkpoint) if checkpoint.is_expired(self.retention, now) => {
                    self.remove_file(&path).await?;
                    removed += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping undecodable checkpoint during purge");
                }
            }
        }

        Ok(removed)
    }
}
