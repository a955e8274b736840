/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status, ordinal-encoded on the wire (0..=3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TaskStatus {
    Running,
    Clarifying,
    Finished,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Finished | TaskStatus::Failed)
    }

    /// Whether the client may observe `self -> next`.
    ///
    /// Staying in the same state is always allowed; terminal states absorb.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (Finished | Failed, other) => other == self,
            (Running, Running | Clarifying | Finished | Failed) => true,
            (Clarifying, Running | Clarifying | Finished | Failed) => true,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Clarifying => "clarifying",
            TaskStatus::Finished => "finished",
            TaskStatus::Failed => "failed",
        }
    }
}

impl TryFrom<u8> for TaskStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TaskStatus::Running),
            1 => Ok(TaskStatus::Clarifying),
            2 => Ok(TaskStatus::Finished),
            3 => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status ordinal {other}")),
        }
    }
}

impl From<TaskStatus> for u8 {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Running => 0,
            TaskStatus::Clarifying => 1,
            TaskStatus::Finished => 2,
            TaskStatus::Failed => 3,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
