//! Test assertions for agent outcomes and run results.

use crate::context::SessionContext;
use crate::core::AgentOutcome;
use crate::errors::ErrorKind;
use crate::pipeline::PipelineRunResult;

/// Asserts that the outcome indicates success (possibly degraded).
pub fn assert_outcome_succeeded(outcome: &AgentOutcome) {
    assert!(
        outcome.is_success(),
        "Expected success, got: {}",
        outcome.describe()
    );
}

/// Asserts that the outcome indicates failure.
pub fn assert_outcome_failed(outcome: &AgentOutcome) {
    assert!(
        outcome.is_failure(),
        "Expected failure, got status: {}",
        outcome.status
    );
}

/// Asserts that the outcome failed with the expected kind.
pub fn assert_outcome_kind(outcome: &AgentOutcome, expected: ErrorKind) {
    assert_eq!(
        outcome.error_kind,
        Some(expected),
        "Expected error kind {:?}, got {:?}",
        expected,
        outcome.error_kind
    );
}

/// Asserts that the session holds a value under `key`.
pub fn assert_context_has(session: &SessionContext, key: &str) {
    assert!(
        session.has(key),
        "Expected context to contain key '{}'. Keys: {:?}",
        key,
        session.keys()
    );
}

/// Asserts that the named agent was never invoked during the run.
pub fn assert_agent_not_run(result: &PipelineRunResult, agent: &str) {
    assert!(
        !result.agent_ran(agent),
        "Expected agent '{agent}' not to run, but it did"
    );
}
