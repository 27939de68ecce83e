#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Batch Replicator
//!
//! Resumable, checkpointed replication of a template record into a series of
//! time-shifted copies.
//!
//! ## Overview
//!
//! A batch run produces `total_count` replicas of one template item, replica
//! `i` shifted forward by `i * step_interval` units of time. Work happens inside
//! invocations with a strict time budget: when the budget runs out, the run
//! saves a checkpoint naming the next index, schedules its own resumption and
//! returns. Every index in `1..=total_count` is attempted exactly once across
//! all invocations, in increasing order.
//!
//! ## Architecture
//!
//! The engine ([`orchestration::ResumableBatchJob`]) is wired with four
//! collaborators defined in [`traits`]:
//!
//! - [`traits::ItemResolver`] - looks up the template being replicated
//! - [`traits::UnitOfWork`] - produces one replica
//! - [`traits::CheckpointStore`] - durable, expiring home of paused runs
//! - [`traits::Scheduler`] - arranges a later `resume` of a checkpoint
//!
//! In-memory and file-backed stores live in [`store`]; an in-process scheduler
//! and the worker that drains it live in [`orchestration`].
//!
//! ## Module Organization
//!
//! - [`models`] - Job specs, checkpoints, template items and run outcomes
//! - [`schedule`] - Time-shift arithmetic for derived replicas
//! - [`state_machine`] - Per-invocation lifecycle of a run
//! - [`validation`] - Range and size checks on submitted input
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup and operation logs
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batch_replicator::models::{JobSpec, StepUnit};
//! use batch_replicator::orchestration::{ChannelScheduler, ResumableBatchJob, ResumeWorker};
//! use batch_replicator::store::InMemoryCheckpointStore;
//! use batch_replicator::traits::{ItemResolver, UnitOfWork};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     resolver: Arc<dyn ItemResolver>,
//! #     unit_of_work: Arc<dyn UnitOfWork>,
//! # ) {
//! let (scheduler, receiver) = ChannelScheduler::channel();
//! let job = Arc::new(ResumableBatchJob::new(
//!     resolver,
//!     unit_of_work,
//!     Arc::new(InMemoryCheckpointStore::default()),
//!     Arc::new(scheduler),
//! ));
//!
//! let spec = JobSpec::new("1234")
//!     .with_total_count(52)
//!     .with_step(1, StepUnit::Month);
//! let outcome = job.submit(spec).await;
//! println!("first invocation: {}", outcome.status());
//!
//! // Paused runs continue here until the queue drains
//! ResumeWorker::new(job, receiver)
//!     .shutdown_when_queue_empty()
//!     .run()
//!     .await;
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod schedule;
pub mod state_machine;
pub mod store;
pub mod traits;
pub mod validation;

pub use config::{ConfigManager, ReplicatorConfig};
pub use error::{ReplicatorError, Result};
pub use models::{
    CheckpointId, DerivedParams, FailureReason, JobCheckpoint, JobSpec, ProducedItem, RunOutcome,
    StepUnit, TemplateItem,
};
pub use orchestration::{ChannelScheduler, ResumableBatchJob, ResumeRequest, ResumeWorker};
pub use store::{FileCheckpointStore, InMemoryCheckpointStore};
pub use traits::{CheckpointLookup, CheckpointStore, Clock, ItemResolver, Scheduler, SystemClock, UnitOfWork};
