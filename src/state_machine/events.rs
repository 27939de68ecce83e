use crate::models::FailureReason;
use serde::{Deserialize, Serialize};

/// Events that drive a run's state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum JobEvent {
    /// Begin a fresh run
    Start,
    /// Pick a paused run back up from its checkpoint
    Resume,
    /// Budget exhausted before `next_index` was produced
    Pause(u32),
    /// All `count` replicas produced
    Complete(u32),
    /// Terminal failure
    Fail(FailureReason),
}

impl JobEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Resume => "resume",
            Self::Pause(_) => "pause",
            Self::Complete(_) => "complete",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract the failure reason if this is a failure event
    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            Self::Fail(reason) => Some(reason),
            _ => None,
        }
    }
}
