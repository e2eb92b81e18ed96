//! Runs validated stages in order and always finishes with the terminal agent.

use super::runner::{invoke_agent, StageRunner};
use super::{keys, FailureCollector, PipelineRunResult, StageSpec};
use crate::agents::Agent;
use crate::context::{ContextValue, RunIdentity, SessionContext};
use crate::core::RunStatus;
use crate::events::{names, EventSink};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// A validated pipeline, ready to run any number of times.
///
/// Built by [`PipelineBuilder`](super::PipelineBuilder).
#[derive(Clone)]
pub struct PipelineOrchestrator {
    pub(super) name: String,
    pub(super) stages: Vec<StageSpec>,
    pub(super) terminal: Arc<dyn Agent>,
    pub(super) input_keys: Vec<String>,
    pub(super) event_sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("name", &self.name)
            .field("stages", &self.stages)
            .field("terminal", &self.terminal.name())
            .field("input_keys", &self.input_keys)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Returns the terminal agent.
    #[must_use]
    pub fn terminal(&self) -> &Arc<dyn Agent> {
        &self.terminal
    }

    /// Returns the declared input keys.
    #[must_use]
    pub fn input_keys(&self) -> &[String] {
        &self.input_keys
    }

    /// Runs the pipeline with a fresh session seeded with `inputs`.
    pub async fn run(&self, inputs: impl IntoIterator<Item = (String, ContextValue)>) -> PipelineRunResult {
        let run = RunIdentity::new().with_pipeline_name(&self.name);
        let session = Arc::new(
            SessionContext::new(run)
                .with_event_sink(self.event_sink.clone())
                .with_inputs(inputs),
        );
        self.run_with_session(session).await
    }

    /// Runs the pipeline against an existing session.
    ///
    /// Stages run strictly in order. A failed stage under
    /// [`FailureMode::Abort`](super::FailureMode::Abort) skips every later
    /// stage. The terminal agent runs exactly once in every case and is
    /// never cut off by a timeout.
    pub async fn run_with_session(&self, session: Arc<SessionContext>) -> PipelineRunResult {
        let start = Instant::now();
        let run_id = session.run_id().pipeline_run_id;
        info!(pipeline = %self.name, %run_id, stages = self.stages.len(), "Pipeline started");
        session.try_emit_event(
            names::PIPELINE_STARTED,
            Some(serde_json::json!({ "pipeline": &self.name, "run_id": run_id.to_string() })),
        );

        self.register_owners(&session);

        let mut collector = FailureCollector::new();
        let mut reports = Vec::with_capacity(self.stages.len());
        let mut skipped = Vec::new();

        for stage in &self.stages {
            if collector.should_stop() {
                skipped.push(stage.name.clone());
                session.try_emit_event(
                    names::STAGE_SKIPPED,
                    Some(serde_json::json!({
                        "stage": &stage.name,
                        "reason": collector.abort_reason(),
                    })),
                );
                continue;
            }

            session.try_emit_event(
                names::STAGE_STARTED,
                Some(serde_json::json!({ "stage": &stage.name, "mode": stage.mode })),
            );
            let report = StageRunner::new(stage).run(&session).await;
            session.try_emit_event(
                names::STAGE_COMPLETED,
                Some(serde_json::json!({ "stage": &report.name, "success": report.success })),
            );

            if collector.record_stage(&report, stage.failure_mode) {
                warn!(stage = %report.name, reason = %report.failure_reason(), "Aborting remaining stages");
            } else if !report.success {
                warn!(stage = %report.name, reason = %report.failure_reason(), "Stage failed; continuing");
            }
            reports.push(report);
        }

        let upstream = collector
            .abort_reason()
            .map_or(RunStatus::Success, RunStatus::failure);
        match serde_json::to_value(&upstream) {
            Ok(value) => {
                if let Err(e) = session.set_as(keys::ORCHESTRATOR, keys::PIPELINE_STATUS, value) {
                    error!(error = %e, "Could not record pipeline status");
                }
            }
            Err(e) => error!(error = %e, "Could not serialize pipeline status"),
        }

        let terminal = invoke_agent(self.terminal.clone(), session.clone(), None).await;
        session.try_emit_event(
            names::REPORT_EMITTED,
            Some(serde_json::json!({
                "agent": &terminal.agent,
                "success": terminal.is_success(),
            })),
        );

        let status = if !terminal.is_success() {
            let reason = format!(
                "terminal agent '{}' failed: {}",
                terminal.agent,
                terminal.outcome.describe()
            );
            match upstream {
                RunStatus::Failure(upstream_reason) => RunStatus::failure(format!("{upstream_reason}; {reason}")),
                RunStatus::Success => RunStatus::failure(reason),
            }
        } else {
            stamped_status(&session).unwrap_or(upstream)
        };

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(pipeline = %self.name, %run_id, %status, duration_ms, "Pipeline completed");
        session.try_emit_event(
            names::PIPELINE_COMPLETED,
            Some(serde_json::json!({
                "pipeline": &self.name,
                "status": status.to_string(),
                "duration_ms": duration_ms,
            })),
        );

        PipelineRunResult {
            run: session.run_id().clone(),
            status,
            stages: reports,
            skipped_stages: skipped,
            failures: collector.into_failures(),
            terminal,
            context: session.snapshot(),
            duration_ms,
        }
    }

    fn register_owners(&self, session: &SessionContext) {
        let writers = self
            .stages
            .iter()
            .flat_map(|stage| stage.agents.iter())
            .chain(std::iter::once(&self.terminal));

        for agent in writers {
            for key in agent.produces() {
                if let Err(e) = session.register_owner(key, agent.name()) {
                    warn!(error = %e, "Output key already owned in this session");
                }
            }
        }
        if let Err(e) = session.register_owner(keys::PIPELINE_STATUS, keys::ORCHESTRATOR) {
            warn!(error = %e, "Pipeline status key already owned in this session");
        }
    }
}

/// Reads the status the terminal agent stamped on its artifact.
fn stamped_status(session: &SessionContext) -> Option<RunStatus> {
    session
        .get(keys::REPORT_STATUS)
        .and_then(|value| value.as_report().cloned())
        .and_then(|json| serde_json::from_value(json).ok())
}
