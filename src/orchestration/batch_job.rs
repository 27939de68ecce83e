//! # Resumable Batch Job
//!
//! Produces `total_count` replicas of a template one index at a time, stopping
//! voluntarily when an invocation's time budget runs out. Progress then lives in
//! a checkpoint, and a scheduled `resume` picks the run up at exactly the first
//! index that was not produced.
//!
//! ## Invocation lifecycle
//!
//! 1. Validate the spec, and the checkpoint's resume index when resuming
//! 2. Resolve the template (once per invocation, before any work)
//! 3. For each index: check the budget, derive the shifted window, produce
//! 4. On budget exhaustion: save a checkpoint, schedule its resume, return `Paused`
//!
//! A failure at any step is terminal for the run and is returned as
//! `RunOutcome::Failed`; nothing is retried.

use crate::constants::operations;
use crate::error::{ReplicatorError, Result};
use crate::logging::{log_job_operation, log_run_outcome};
use crate::models::{CheckpointId, FailureReason, JobCheckpoint, JobSpec, RunOutcome, TemplateItem};
use crate::schedule::derive_params;
use crate::state_machine::{JobEvent, JobStateMachine};
use crate::traits::{CheckpointLookup, CheckpointStore, Clock, ItemResolver, Scheduler, SystemClock, UnitOfWork};
use crate::validation::validate_job_spec;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, trace, warn, Instrument};

/// Drives one batch run across as many invocations as its time budget requires
pub struct ResumableBatchJob {
    resolver: Arc<dyn ItemResolver>,
    unit_of_work: Arc<dyn UnitOfWork>,
    store: Arc<dyn CheckpointStore>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    resume_delay: Duration,
}

impl std::fmt::Debug for ResumableBatchJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumableBatchJob")
            .field("resume_delay", &self.resume_delay)
            .finish_non_exhaustive()
    }
}

impl ResumableBatchJob {
    pub fn new(
        resolver: Arc<dyn ItemResolver>,
        unit_of_work: Arc<dyn UnitOfWork>,
        store: Arc<dyn CheckpointStore>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            resolver,
            unit_of_work,
            store,
            scheduler,
            clock: Arc::new(SystemClock),
            resume_delay: Duration::ZERO,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// How far after a pause the resume may be delivered at the earliest
    pub fn with_resume_delay(mut self, resume_delay: Duration) -> Self {
        self.resume_delay = resume_delay;
        self
    }

    /// First invocation of a new run
    pub async fn submit(&self, spec: JobSpec) -> RunOutcome {
        log_job_operation(
            operations::SUBMIT,
            Some(&spec.template_reference),
            None,
            "received",
            Some(&format!(
                "{} copies, budget {}s, every {} {}",
                spec.total_count, spec.time_budget_seconds, spec.step_interval, spec.step_unit
            )),
        );

        let reference = spec.template_reference.clone();
        let outcome = self.run(spec, None).await;
        log_run_outcome(operations::SUBMIT, &reference, &outcome);
        outcome
    }

    /// Scheduled continuation of a paused run
    ///
    /// The checkpoint is deleted before any work happens, so a second delivery
    /// of the same resume finds nothing and does nothing.
    pub async fn resume(&self, checkpoint_id: &CheckpointId) -> RunOutcome {
        log_job_operation(
            operations::RESUME,
            None,
            Some(checkpoint_id.as_str()),
            "received",
            None,
        );

        let lookup = match self.store.load(checkpoint_id).await {
            Ok(lookup) => lookup,
            Err(e) => {
                let outcome = RunOutcome::failed(
                    FailureReason::Storage {
                        message: e.to_string(),
                    },
                    0,
                );
                log_run_outcome(operations::RESUME, "unknown", &outcome);
                return outcome;
            }
        };

        let checkpoint = match lookup {
            CheckpointLookup::Found(checkpoint) => checkpoint,
            CheckpointLookup::Expired => {
                info!(
                    checkpoint_id = %checkpoint_id,
                    "Checkpoint missing or expired, nothing to resume"
                );
                return RunOutcome::failed(
                    FailureReason::CheckpointExpired {
                        checkpoint_id: checkpoint_id.to_string(),
                    },
                    0,
                );
            }
            CheckpointLookup::Malformed(message) => {
                if let Err(e) = self.store.delete(checkpoint_id).await {
                    warn!(checkpoint_id = %checkpoint_id, error = %e, "Failed to remove malformed checkpoint");
                }
                let outcome = RunOutcome::failed(FailureReason::InvalidCheckpoint { message }, 0);
                log_run_outcome(operations::RESUME, "unknown", &outcome);
                return outcome;
            }
        };

        let reference = checkpoint.spec.template_reference.clone();

        // Consume before running: at most one live checkpoint per run
        if let Err(e) = self.store.delete(checkpoint_id).await {
            let outcome = RunOutcome::failed(
                FailureReason::Storage {
                    message: e.to_string(),
                },
                checkpoint.next_index,
            );
            log_run_outcome(operations::RESUME, &reference, &outcome);
            return outcome;
        }

        let spec = checkpoint.spec.clone();
        let outcome = self.run(spec, Some(checkpoint)).await;
        log_run_outcome(operations::RESUME, &reference, &outcome);
        outcome
    }

    /// Queue a run without producing anything in the caller's invocation
    ///
    /// The spec and template are checked up front so the caller learns about a
    /// bad submission immediately; the replicas are then produced entirely by
    /// scheduled resumptions.
    pub async fn defer(&self, spec: JobSpec) -> Result<CheckpointId> {
        validate_job_spec(&spec)?;

        if self.resolver.resolve(&spec.template_reference).await.is_none() {
            return Err(ReplicatorError::InvalidReference {
                reference: spec.template_reference.clone(),
            });
        }

        let now = self.clock.now();
        let checkpoint = JobCheckpoint::initial(spec, now);
        let id = self.store.save(&checkpoint).await?;

        if let Err(e) = self.scheduler.schedule_resume(&id, self.earliest_resume(now)).await {
            if let Err(delete_err) = self.store.delete(&id).await {
                warn!(checkpoint_id = %id, error = %delete_err, "Failed to remove unscheduled checkpoint");
            }
            return Err(e);
        }

        log_job_operation(
            operations::DEFER,
            Some(&checkpoint.spec.template_reference),
            Some(id.as_str()),
            "scheduled",
            Some(&format!("{} copies", checkpoint.spec.total_count)),
        );
        Ok(id)
    }

    /// Execute one invocation of a run
    ///
    /// `spec` is used for a first invocation; when `checkpoint` is present its
    /// own spec governs and the run continues at `checkpoint.next_index`.
    pub async fn run(&self, spec: JobSpec, checkpoint: Option<JobCheckpoint>) -> RunOutcome {
        let template = checkpoint
            .as_ref()
            .map_or(&spec.template_reference, |c| &c.spec.template_reference)
            .clone();
        let span = info_span!("batch_run", template = %template, resuming = checkpoint.is_some());
        self.run_invocation(spec, checkpoint).instrument(span).await
    }

    async fn run_invocation(&self, spec: JobSpec, checkpoint: Option<JobCheckpoint>) -> RunOutcome {
        let resuming = checkpoint.is_some();
        let (spec, start_index) = match checkpoint {
            Some(checkpoint) => {
                let mut machine = JobStateMachine::for_invocation(true, checkpoint.spec.total_count);
                match checkpoint.resume_index() {
                    Ok(index) => (checkpoint.spec, index),
                    Err(reason) => return self.fail(&mut machine, reason, checkpoint.next_index),
                }
            }
            None => (spec, 1),
        };

        let mut machine = JobStateMachine::for_invocation(resuming, spec.total_count);

        if let Err(e) = validate_job_spec(&spec) {
            let reason = FailureReason::Validation {
                message: e.to_string(),
            };
            return self.fail(&mut machine, reason, start_index);
        }

        let Some(template) = self.resolver.resolve(&spec.template_reference).await else {
            let reason = FailureReason::InvalidReference {
                reference: spec.template_reference.clone(),
            };
            return self.fail(&mut machine, reason, start_index);
        };

        self.transition(&mut machine, &if resuming { JobEvent::Resume } else { JobEvent::Start });
        debug!(
            start_index,
            total_count = spec.total_count,
            "Starting generation of {} copies at index {start_index}",
            spec.total_count
        );

        self.produce_from(&mut machine, &spec, &template, start_index)
            .await
    }

    async fn produce_from(
        &self,
        machine: &mut JobStateMachine,
        spec: &JobSpec,
        template: &TemplateItem,
        start_index: u32,
    ) -> RunOutcome {
        let started_at = self.clock.now();
        let budget = TimeDelta::from_std(spec.time_budget()).unwrap_or(TimeDelta::MAX);

        for index in start_index..=spec.total_count {
            if self.clock.now() - started_at > budget {
                return self.pause(machine, spec, index).await;
            }

            let params = match derive_params(template, spec, index) {
                Ok(params) => params,
                Err(reason) => return self.fail(machine, reason, index),
            };

            match self.unit_of_work.produce(template, &params).await {
                Ok(item) => {
                    trace!(index, produced = %item.reference, "Replica produced");
                }
                Err(e) => {
                    let reason = FailureReason::UnitOfWork {
                        index,
                        message: format!("{e:#}"),
                    };
                    return self.fail(machine, reason, index);
                }
            }
        }

        self.transition(machine, &JobEvent::Complete(spec.total_count));
        RunOutcome::Completed {
            count: spec.total_count,
        }
    }

    async fn pause(&self, machine: &mut JobStateMachine, spec: &JobSpec, next_index: u32) -> RunOutcome {
        let now = self.clock.now();
        let checkpoint = JobCheckpoint::at(spec.clone(), next_index, now);

        let checkpoint_id = match self.store.save(&checkpoint).await {
            Ok(id) => id,
            Err(e) => {
                let reason = FailureReason::Storage {
                    message: e.to_string(),
                };
                return self.fail(machine, reason, next_index);
            }
        };

        if let Err(e) = self
            .scheduler
            .schedule_resume(&checkpoint_id, self.earliest_resume(now))
            .await
        {
            // Nothing will ever resume it; drop it rather than leave it pending
            if let Err(delete_err) = self.store.delete(&checkpoint_id).await {
                warn!(checkpoint_id = %checkpoint_id, error = %delete_err, "Failed to remove unscheduled checkpoint");
            }
            let reason = FailureReason::Scheduling {
                message: e.to_string(),
            };
            return self.fail(machine, reason, next_index);
        }

        self.transition(machine, &JobEvent::Pause(next_index));
        log_job_operation(
            operations::PAUSE,
            Some(&spec.template_reference),
            Some(checkpoint_id.as_str()),
            "checkpointed",
            Some(&format!("next index {next_index} of {}", spec.total_count)),
        );

        RunOutcome::Paused {
            next_index,
            checkpoint_id,
        }
    }

    fn fail(&self, machine: &mut JobStateMachine, reason: FailureReason, failed_at_index: u32) -> RunOutcome {
        self.transition(machine, &JobEvent::Fail(reason.clone()));
        RunOutcome::failed(reason, failed_at_index)
    }

    fn transition(&self, machine: &mut JobStateMachine, event: &JobEvent) {
        if let Err(e) = machine.apply(event) {
            warn!(
                state = %machine.current_state(),
                event = event.event_type(),
                error = %e,
                "Unexpected job state transition"
            );
        }
    }

    fn earliest_resume(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.resume_delay)
            .ok()
            .and_then(|delay| now.checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
