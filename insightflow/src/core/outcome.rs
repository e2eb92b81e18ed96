//! Agent outcome type with factory methods.

use super::OutcomeStatus;
use crate::errors::{ContextError, ErrorKind};
use serde::{Deserialize, Serialize};

/// The result of running one agent.
///
/// This is the single explicit result type crossing the agent boundary:
/// a status, the error kind when something went wrong, and an optional
/// diagnostic message. `bool::from(outcome)` gives the plain success flag
/// the orchestrator aggregates over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutcome {
    /// The outcome status.
    pub status: OutcomeStatus,

    /// The failure category (for failed or degraded outcomes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    /// Diagnostic message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Default for AgentOutcome {
    fn default() -> Self {
        Self::ok()
    }
}

impl AgentOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: OutcomeStatus::Ok,
            error_kind: None,
            message: None,
        }
    }

    /// Creates a successful outcome where a collaborator failure was
    /// replaced by a placeholder value.
    #[must_use]
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Degraded,
            error_kind: Some(ErrorKind::ExternalServiceError),
            message: Some(message.into()),
        }
    }

    /// Creates a failed outcome of the given kind.
    #[must_use]
    pub fn fail(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Fail,
            error_kind: Some(kind),
            message: Some(message.into()),
        }
    }

    /// Creates a failed outcome for required keys absent from the context.
    #[must_use]
    pub fn missing_precondition(missing: &[String]) -> Self {
        Self::fail(
            ErrorKind::MissingPrecondition,
            format!("missing required context keys: {}", missing.join(", ")),
        )
    }

    /// Creates an agent fault outcome.
    #[must_use]
    pub fn fault(message: impl Into<String>) -> Self {
        Self::fail(ErrorKind::AgentFault, message)
    }

    /// Returns true if the agent succeeded (possibly degraded).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the agent failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// Returns true if the agent used a placeholder for a failed collaborator.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, OutcomeStatus::Degraded)
    }

    /// Describes the outcome in one line, e.g. `agent fault: timed out`.
    #[must_use]
    pub fn describe(&self) -> String {
        match (&self.error_kind, &self.message) {
            (Some(kind), Some(message)) => format!("{kind}: {message}"),
            (Some(kind), None) => kind.to_string(),
            (None, Some(message)) => message.clone(),
            (None, None) => self.status.to_string(),
        }
    }
}

impl From<AgentOutcome> for bool {
    fn from(outcome: AgentOutcome) -> Self {
        outcome.is_success()
    }
}

impl From<bool> for AgentOutcome {
    fn from(success: bool) -> Self {
        if success {
            Self::ok()
        } else {
            Self::fault("agent reported failure")
        }
    }
}

impl From<ContextError> for AgentOutcome {
    fn from(error: ContextError) -> Self {
        Self::fault(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_outcome() {
        let outcome = AgentOutcome::ok();
        assert!(outcome.is_success());
        assert!(outcome.error_kind.is_none());
        assert!(bool::from(outcome));
    }

    #[test]
    fn test_degraded_outcome_is_success() {
        let outcome = AgentOutcome::degraded("generation service down");
        assert!(outcome.is_success());
        assert!(outcome.is_degraded());
        assert_eq!(outcome.error_kind, Some(ErrorKind::ExternalServiceError));
    }

    #[test]
    fn test_missing_precondition() {
        let outcome = AgentOutcome::missing_precondition(&["profile_report".to_string()]);
        assert!(outcome.is_failure());
        assert_eq!(outcome.error_kind, Some(ErrorKind::MissingPrecondition));
        assert!(outcome.describe().contains("profile_report"));
    }

    #[test]
    fn test_from_bool() {
        assert!(AgentOutcome::from(true).is_success());
        let failed = AgentOutcome::from(false);
        assert_eq!(failed.error_kind, Some(ErrorKind::AgentFault));
    }

    #[test]
    fn test_from_context_error() {
        let outcome = AgentOutcome::from(ContextError::OwnershipViolation {
            key: "cleaned_df".into(),
            owner: "data_cleaner".into(),
            writer: "visualization".into(),
        });
        assert_eq!(outcome.error_kind, Some(ErrorKind::AgentFault));
        assert!(outcome.describe().contains("cleaned_df"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(AgentOutcome::fault("timed out").describe(), "agent fault: timed out");
        assert_eq!(AgentOutcome::ok().describe(), "ok");
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let json = serde_json::to_value(AgentOutcome::ok()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ok"}));
    }
}
