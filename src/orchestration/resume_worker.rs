//! # In-process resume delivery
//!
//! `ChannelScheduler` turns `schedule_resume` calls into `ResumeRequest`s on a
//! tokio channel; `ResumeWorker` drains that channel and calls
//! `ResumableBatchJob::resume` for each request once its earliest time has
//! passed. Requests are handled one at a time, so two resumptions never overlap.

use super::batch_job::ResumableBatchJob;
use crate::error::{ReplicatorError, Result};
use crate::models::{CheckpointId, RunOutcome};
use crate::traits::{Clock, Scheduler, SystemClock};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, trace, Instrument};

/// A pending resume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeRequest {
    pub checkpoint_id: CheckpointId,
    pub earliest: DateTime<Utc>,
}

/// `Scheduler` that enqueues resume requests for a `ResumeWorker`
#[derive(Debug, Clone)]
pub struct ChannelScheduler {
    sender: mpsc::UnboundedSender<ResumeRequest>,
}

impl ChannelScheduler {
    /// Create a scheduler and the receiver its `ResumeWorker` consumes.
    ///
    /// The channel is unbounded: the worker enqueues follow-up resumes while it is
    /// itself the consumer, and a bounded queue could stall it on its own sends.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ResumeRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Scheduler for ChannelScheduler {
    async fn schedule_resume(&self, id: &CheckpointId, earliest: DateTime<Utc>) -> Result<()> {
        self.sender
            .send(ResumeRequest {
                checkpoint_id: id.clone(),
                earliest,
            })
            .map_err(|_| ReplicatorError::scheduling("resume queue is closed"))?;
        trace!(checkpoint_id = %id, %earliest, "Resume enqueued");
        Ok(())
    }
}

/// Consumes resume requests and drives the job forward
pub struct ResumeWorker {
    job: Arc<ResumableBatchJob>,
    receiver: mpsc::UnboundedReceiver<ResumeRequest>,
    clock: Arc<dyn Clock>,
    shutdown_when_queue_empty: bool,
}

impl ResumeWorker {
    pub fn new(job: Arc<ResumableBatchJob>, receiver: mpsc::UnboundedReceiver<ResumeRequest>) -> Self {
        Self {
            job,
            receiver,
            clock: Arc::new(SystemClock),
            shutdown_when_queue_empty: false,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Stop once no resume is pending instead of waiting for more
    pub fn shutdown_when_queue_empty(mut self) -> Self {
        self.shutdown_when_queue_empty = true;
        self
    }

    /// Process resumes until the channel closes, or until it is empty when
    /// `shutdown_when_queue_empty` is set. Returns how many resumes ran.
    pub async fn run(mut self) -> usize {
        let mut processed = 0;
        loop {
            let request = if self.shutdown_when_queue_empty {
                match self.receiver.try_recv() {
                    Ok(request) => request,
                    Err(_) => {
                        debug!("No pending resumes found. Shutting down the worker…");
                        break;
                    }
                }
            } else {
                match self.receiver.recv().await {
                    Some(request) => request,
                    None => break,
                }
            };

            self.process(request).await;
            processed += 1;
        }

        info!(processed, "Resume worker stopped");
        processed
    }

    /// Process the next pending resume, if any, without waiting for one
    pub async fn process_next(&mut self) -> Option<RunOutcome> {
        let request = self.receiver.try_recv().ok()?;
        Some(self.process(request).await)
    }

    async fn process(&self, request: ResumeRequest) -> RunOutcome {
        if let Ok(wait) = (request.earliest - self.clock.now()).to_std() {
            if !wait.is_zero() {
                trace!(checkpoint_id = %request.checkpoint_id, ?wait, "Waiting for resume time");
                sleep(wait).await;
            }
        }

        let span = tracing::info_span!("resume", checkpoint_id = %request.checkpoint_id);
        self.job
            .resume(&request.checkpoint_id)
            .instrument(span)
            .await
    }
}

impl std::fmt::Debug for ResumeWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumeWorker")
            .field("job", &self.job)
            .field("shutdown_when_queue_empty", &self.shutdown_when_queue_empty)
            .finish_non_exhaustive()
    }
}
