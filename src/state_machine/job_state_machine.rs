use super::errors::{StateMachineError, StateMachineResult};
use super::events::JobEvent;
use super::states::JobState;
use tracing::debug;

/// A single recorded transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: JobState,
    pub to: JobState,
    pub event: &'static str,
}

/// Per-invocation lifecycle tracker for a batch run
///
/// The machine lives only as long as one invocation. A resumed invocation starts
/// from `Paused`, which is how the persisted checkpoint is re-entered.
#[derive(Debug, Clone)]
pub struct JobStateMachine {
    state: JobState,
    total_count: u32,
    history: Vec<Transition>,
}

impl JobStateMachine {
    pub fn new(initial: JobState, total_count: u32) -> Self {
        Self {
            state: initial,
            total_count,
            history: Vec::new(),
        }
    }

    /// Machine for one invocation: `Paused` when resuming a checkpoint, else `NotStarted`
    pub fn for_invocation(resuming: bool, total_count: u32) -> Self {
        let initial = if resuming {
            JobState::Paused
        } else {
            JobState::NotStarted
        };
        Self::new(initial, total_count)
    }

    pub fn current_state(&self) -> JobState {
        self.state
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Apply `event`, returning the new state
    pub fn apply(&mut self, event: &JobEvent) -> StateMachineResult<JobState> {
        let target = self.determine_target_state(event)?;
        self.check_guards(event)?;

        debug!(
            from = %self.state,
            to = %target,
            event = event.event_type(),
            "Job state transition"
        );

        self.history.push(Transition {
            from: self.state,
            to: target,
            event: event.event_type(),
        });
        self.state = target;
        Ok(target)
    }

    fn determine_target_state(&self, event: &JobEvent) -> StateMachineResult<JobState> {
        let target = match (self.state, event) {
            (JobState::NotStarted, JobEvent::Start) => JobState::Running,
            (JobState::Paused, JobEvent::Resume) => JobState::Running,

            (JobState::Running, JobEvent::Pause(_)) => JobState::Paused,
            (JobState::Running, JobEvent::Complete(_)) => JobState::Completed,

            // Validation and resolution failures happen before the run starts
            (JobState::NotStarted | JobState::Paused | JobState::Running, JobEvent::Fail(_)) => {
                JobState::Failed
            }

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }

    fn check_guards(&self, event: &JobEvent) -> StateMachineResult<()> {
        match event {
            JobEvent::Pause(next_index) if *next_index == 0 || *next_index > self.total_count => {
                Err(StateMachineError::GuardFailed {
                    reason: format!(
                        "pause index {next_index} is outside 1..={}",
                        self.total_count
                    ),
                })
            }
            JobEvent::Complete(count) if *count != self.total_count => {
                Err(StateMachineError::GuardFailed {
                    reason: format!(
                        "completed count {count} does not match total {}",
                        self.total_count
                    ),
                })
            }
            _ => Ok(()),
        }
    }
}
