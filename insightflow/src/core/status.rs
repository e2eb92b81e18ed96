//! Stage mode, outcome status and run status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the agents of one stage are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageMode {
    /// Agents run one after another on the coordinating task.
    #[default]
    Sequential,
    /// Agents run concurrently and are joined at a barrier.
    Parallel,
}

impl fmt::Display for StageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Parallel => write!(f, "parallel"),
        }
    }
}

/// The status carried by an [`AgentOutcome`](super::AgentOutcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The agent completed and its outputs are in the context.
    Ok,
    /// The agent completed but substituted placeholders for a failed collaborator.
    Degraded,
    /// The agent failed.
    Fail,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Degraded => write!(f, "degraded"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

impl OutcomeStatus {
    /// Returns true if downstream preconditions are satisfied.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Degraded)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail)
    }
}

/// Final status stamped on the terminal artifact of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every regular stage succeeded.
    Success,
    /// The run failed for the given reason.
    Failure(String),
}

impl RunStatus {
    /// Creates a failure status.
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }

    /// Returns true for [`RunStatus::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns the failure reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failure(reason) => Some(reason),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure(reason) => write!(f, "FAILURE({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_mode_display() {
        assert_eq!(StageMode::Sequential.to_string(), "sequential");
        assert_eq!(StageMode::Parallel.to_string(), "parallel");
        assert_eq!(StageMode::default(), StageMode::Sequential);
    }

    #[test]
    fn test_outcome_status_success() {
        assert!(OutcomeStatus::Ok.is_success());
        assert!(OutcomeStatus::Degraded.is_success());
        assert!(!OutcomeStatus::Fail.is_success());
        assert!(OutcomeStatus::Fail.is_failure());
    }

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::Success.to_string(), "SUCCESS");
        assert_eq!(
            RunStatus::failure("stage 'profile' failed").to_string(),
            "FAILURE(stage 'profile' failed)"
        );
    }

    #[test]
    fn test_run_status_serialize() {
        let json = serde_json::to_value(RunStatus::failure("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"state": "failure", "reason": "boom"}));

        let back: RunStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back.reason(), Some("boom"));

        let ok = serde_json::to_value(RunStatus::Success).unwrap();
        assert_eq!(ok, serde_json::json!({"state": "success"}));
    }
}
