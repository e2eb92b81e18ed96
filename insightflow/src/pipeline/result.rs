//! Per-agent, per-stage and per-run results.

use super::{keys, FailureRecord};
use crate::context::{ContextValue, RunIdentity};
use crate::core::{AgentOutcome, RunStatus, StageMode};
use crate::utils::Timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The outcome of one agent invocation with its timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Agent name.
    pub agent: String,
    /// What the agent reported.
    pub outcome: AgentOutcome,
    /// When the invocation started.
    pub started_at: Timestamp,
    /// When the invocation finished.
    pub ended_at: Timestamp,
}

impl AgentRecord {
    /// Creates a record for an invocation that started at `started_at` and ends now.
    #[must_use]
    pub fn finished(agent: impl Into<String>, outcome: AgentOutcome, started_at: Timestamp) -> Self {
        Self {
            agent: agent.into(),
            outcome,
            started_at,
            ended_at: Utc::now(),
        }
    }

    /// Creates a record with zero duration.
    #[must_use]
    pub fn instant(agent: impl Into<String>, outcome: AgentOutcome) -> Self {
        let now = Utc::now();
        Self {
            agent: agent.into(),
            outcome,
            started_at: now,
            ended_at: now,
        }
    }

    /// Returns the wall-clock duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        (self.ended_at - self.started_at).num_microseconds().unwrap_or(0) as f64 / 1000.0
    }

    /// Returns true if the agent succeeded (possibly degraded).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// The result of running one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    /// Stage name.
    pub name: String,
    /// How the stage ran.
    pub mode: StageMode,
    /// True iff every member agent succeeded.
    pub success: bool,
    /// Records of the agents that ran, in declared order.
    pub agents: Vec<AgentRecord>,
    /// Members of a sequential stage left unrun after a failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_run: Vec<String>,
}

impl StageReport {
    /// Builds a report; the stage succeeds iff every agent ran and succeeded.
    #[must_use]
    pub fn new(name: impl Into<String>, mode: StageMode, agents: Vec<AgentRecord>, not_run: Vec<String>) -> Self {
        let success = not_run.is_empty() && agents.iter().all(AgentRecord::is_success);
        Self {
            name: name.into(),
            mode,
            success,
            agents,
            not_run,
        }
    }

    /// Iterates over the agents that failed.
    pub fn failed_agents(&self) -> impl Iterator<Item = &AgentRecord> + '_ {
        self.agents.iter().filter(|r| !r.is_success())
    }

    /// Returns the record of the named agent.
    #[must_use]
    pub fn agent(&self, name: &str) -> Option<&AgentRecord> {
        self.agents.iter().find(|r| r.agent == name)
    }

    /// Describes why the stage failed, naming each failed agent.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        let failed: Vec<String> = self
            .failed_agents()
            .map(|r| format!("{} ({})", r.agent, r.outcome.describe()))
            .collect();
        format!("stage '{}' failed: {}", self.name, failed.join("; "))
    }
}

/// The complete result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRunResult {
    /// Identity of the run.
    pub run: RunIdentity,
    /// Final run status; matches the status stamped on the terminal artifact.
    pub status: RunStatus,
    /// Reports of the stages that ran, in order.
    pub stages: Vec<StageReport>,
    /// Stages skipped after an aborting failure.
    pub skipped_stages: Vec<String>,
    /// Every agent failure, in the order recorded.
    pub failures: Vec<FailureRecord>,
    /// The terminal agent's record.
    pub terminal: AgentRecord,
    /// JSON snapshot of the context at the end of the run.
    pub context: serde_json::Value,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: f64,
}

impl PipelineRunResult {
    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the report of the named stage, if it ran.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Returns true if the named agent was invoked during the run.
    #[must_use]
    pub fn agent_ran(&self, name: &str) -> bool {
        self.terminal.agent == name || self.stages.iter().any(|s| s.agent(name).is_some())
    }

    /// Reads a value back out of the final context snapshot.
    #[must_use]
    pub fn context_value(&self, key: &str) -> Option<ContextValue> {
        self.context
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Path of the report the terminal agent wrote, if it wrote one.
    #[must_use]
    pub fn report_path(&self) -> Option<PathBuf> {
        self.context_value(keys::REPORT_PATH)
            .and_then(|value| value.as_text().map(PathBuf::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stage_report_success() {
        let report = StageReport::new(
            "analyze",
            StageMode::Parallel,
            vec![
                AgentRecord::instant("insights", AgentOutcome::ok()),
                AgentRecord::instant("external", AgentOutcome::degraded("search offline")),
            ],
            Vec::new(),
        );
        assert!(report.success);
        assert_eq!(report.failed_agents().count(), 0);
    }

    #[test]
    fn test_stage_report_failure_reason() {
        let report = StageReport::new(
            "clean",
            StageMode::Sequential,
            vec![AgentRecord::instant("data_cleaner", AgentOutcome::fault("no rows left"))],
            vec!["validator".to_string()],
        );
        assert!(!report.success);
        assert_eq!(
            report.failure_reason(),
            "stage 'clean' failed: data_cleaner (agent fault: no rows left)"
        );
    }

    #[test]
    fn test_not_run_members_fail_the_stage() {
        let report = StageReport::new(
            "s",
            StageMode::Sequential,
            vec![AgentRecord::instant("a", AgentOutcome::ok())],
            vec!["b".to_string()],
        );
        assert!(!report.success);
    }

    #[test]
    fn test_report_path_from_snapshot() {
        let result = PipelineRunResult {
            run: RunIdentity::new(),
            status: RunStatus::Success,
            stages: Vec::new(),
            skipped_stages: Vec::new(),
            failures: Vec::new(),
            terminal: AgentRecord::instant("report_writer", AgentOutcome::ok()),
            context: serde_json::json!({
                "final_report_path": {"type": "text", "value": "reports/final_analysis_report.md"},
                "pipeline_status": {"type": "report", "value": "success"},
            }),
            duration_ms: 1.0,
        };
        assert_eq!(result.report_path(), Some(PathBuf::from("reports/final_analysis_report.md")));
        assert!(result.context_value("pipeline_status").unwrap().as_report().is_some());
        assert!(result.context_value("missing").is_none());
    }

    #[test]
    fn test_agent_record_duration() {
        let record = AgentRecord::instant("a", AgentOutcome::ok());
        assert!(record.duration_ms().abs() < f64::EPSILON);
    }
}
