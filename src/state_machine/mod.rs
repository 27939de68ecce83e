// State machine module for batch runs
//
// A run moves NotStarted -> Running -> {Completed | Paused | Failed}. Paused only
// ever exists as a persisted checkpoint; a resumed invocation re-enters Running
// from it.

pub mod errors;
pub mod events;
pub mod job_state_machine;
pub mod states;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::JobEvent;
pub use job_state_machine::{JobStateMachine, Transition};
pub use states::JobState;
