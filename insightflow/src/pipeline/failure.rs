//! Stage failure policy and failure bookkeeping.

use super::StageReport;
use crate::errors::ErrorKind;
use crate::utils::iso_timestamp;
use serde::{Deserialize, Serialize};

/// What the orchestrator does after a stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Skip every remaining stage and go straight to the terminal agent (default).
    #[default]
    Abort,
    /// Record the failure and keep running later stages.
    Continue,
}

/// Record of one failed agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Stage the agent belongs to.
    pub stage: String,
    /// Agent name.
    pub agent: String,
    /// Failure category, if the agent reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Diagnostic message.
    pub message: String,
    /// ISO 8601 time the failure was recorded.
    pub timestamp: String,
}

impl FailureRecord {
    /// Creates a new failure record.
    #[must_use]
    pub fn new(stage: impl Into<String>, agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            agent: agent.into(),
            error_kind: None,
            message: message.into(),
            timestamp: iso_timestamp(),
        }
    }

    /// Sets the error kind.
    #[must_use]
    pub fn with_error_kind(mut self, kind: ErrorKind) -> Self {
        self.error_kind = Some(kind);
        self
    }
}

/// Collects failures across a run and decides whether to stop.
#[derive(Debug, Default)]
pub struct FailureCollector {
    failures: Vec<FailureRecord>,
    failed_stages: Vec<String>,
    abort_reason: Option<String>,
}

impl FailureCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of a finished stage under its failure mode.
    ///
    /// Returns true if the run must stop.
    pub fn record_stage(&mut self, report: &StageReport, mode: FailureMode) -> bool {
        if report.success {
            return self.should_stop();
        }

        self.failed_stages.push(report.name.clone());
        for record in report.failed_agents() {
            let mut failure = FailureRecord::new(
                &report.name,
                &record.agent,
                record.outcome.message.clone().unwrap_or_default(),
            );
            if let Some(kind) = record.outcome.error_kind {
                failure = failure.with_error_kind(kind);
            }
            self.failures.push(failure);
        }

        if mode == FailureMode::Abort && self.abort_reason.is_none() {
            self.abort_reason = Some(report.failure_reason());
        }
        self.should_stop()
    }

    /// Returns true once an aborting stage has failed.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.abort_reason.is_some()
    }

    /// Returns the reason the run was aborted.
    #[must_use]
    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    /// Returns the names of failed stages in the order they failed.
    #[must_use]
    pub fn failed_stages(&self) -> &[String] {
        &self.failed_stages
    }

    /// Returns all failures.
    #[must_use]
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Consumes the collector and returns the failures.
    #[must_use]
    pub fn into_failures(self) -> Vec<FailureRecord> {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AgentOutcome, StageMode};
    use crate::pipeline::AgentRecord;

    fn report(name: &str, outcomes: Vec<(&str, AgentOutcome)>) -> StageReport {
        let agents: Vec<AgentRecord> = outcomes
            .into_iter()
            .map(|(agent, outcome)| AgentRecord::instant(agent, outcome))
            .collect();
        StageReport::new(name, StageMode::Sequential, agents, Vec::new())
    }

    #[test]
    fn test_failure_mode_default() {
        assert_eq!(FailureMode::default(), FailureMode::Abort);
    }

    #[test]
    fn test_failure_record_creation() {
        let record = FailureRecord::new("clean", "data_cleaner", "boom").with_error_kind(ErrorKind::AgentFault);
        assert_eq!(record.stage, "clean");
        assert_eq!(record.agent, "data_cleaner");
        assert_eq!(record.error_kind, Some(ErrorKind::AgentFault));
        assert!(!record.timestamp.is_empty());
    }

    #[test]
    fn test_collector_abort() {
        let mut collector = FailureCollector::new();
        assert!(!collector.record_stage(&report("profile", vec![("p", AgentOutcome::ok())]), FailureMode::Abort));

        let stop = collector.record_stage(
            &report("clean", vec![("c", AgentOutcome::fault("bad rows"))]),
            FailureMode::Abort,
        );
        assert!(stop);
        assert_eq!(collector.failed_stages(), ["clean".to_string()]);
        assert!(collector.abort_reason().unwrap().contains("bad rows"));
        assert_eq!(collector.failures().len(), 1);
    }

    #[test]
    fn test_collector_continue() {
        let mut collector = FailureCollector::new();
        let stop = collector.record_stage(
            &report("recommend", vec![("r", AgentOutcome::fault("no model"))]),
            FailureMode::Continue,
        );
        assert!(!stop);
        assert!(collector.abort_reason().is_none());
        assert_eq!(collector.into_failures().len(), 1);
    }
}
