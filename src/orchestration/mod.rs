//! # Orchestration
//!
//! The resumable batch job and the in-process machinery that delivers its
//! scheduled resumptions.
//!
//! ## Core Components
//!
//! - **ResumableBatchJob**: runs a batch within a time budget, checkpointing and
//!   rescheduling itself when the budget runs out
//! - **ChannelScheduler**: `Scheduler` backed by a tokio channel
//! - **ResumeWorker**: drains the channel and resumes paused runs one at a time

pub mod batch_job;
pub mod resume_worker;

pub use batch_job::ResumableBatchJob;
pub use resume_worker::{ChannelScheduler, ResumeRequest, ResumeWorker};
