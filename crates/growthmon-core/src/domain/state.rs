//! Job state machine and outcome status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse lifecycle stage of a job.
///
/// State transitions:
/// - Created -> Submitted -> Running -> Completed
///
/// The derive order of the variants is the progression order, so `Ord`
/// tells whether a transition moves forward.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    #[default]
    Created,
    Submitted,
    Running,
    Completed,
}

impl JobState {
    pub fn code(self) -> u16 {
        match self {
            JobState::Created => 0,
            JobState::Submitted => 10,
            JobState::Running => 20,
            JobState::Completed => 30,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            JobState::Created => "Created",
            JobState::Submitted => "Submitted",
            JobState::Running => "Running",
            JobState::Completed => "Completed",
        }
    }

    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        self == JobState::Completed
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome classification. Only meaningful once the state is `Completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Active,
    Success,
    Failure,
}

impl JobStatus {
    pub fn code(self) -> u16 {
        match self {
            JobStatus::Active => 0,
            JobStatus::Success => 10,
            JobStatus::Failure => 20,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Active => "Active",
            JobStatus::Success => "Succeeded",
            JobStatus::Failure => "Failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
