pub mod checkpoint;
pub mod job_spec;
pub mod outcome;
pub mod template_item;

// Re-export core models for easy access
pub use checkpoint::{CheckpointId, JobCheckpoint};
pub use job_spec::{JobSpec, StepUnit};
pub use outcome::{FailureReason, RunOutcome};
pub use template_item::{DerivedParams, ProducedItem, TemplateItem};
