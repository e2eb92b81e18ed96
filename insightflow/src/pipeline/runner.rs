//! Stage execution: one agent at a time, or all at once behind a barrier.

use super::{AgentRecord, StageReport, StageSpec};
use crate::agents::Agent;
use crate::context::{AgentContext, SessionContext};
use crate::core::{AgentOutcome, StageMode};
use crate::events::names;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Runs the agents of one stage against a shared session.
#[derive(Debug)]
pub struct StageRunner<'a> {
    stage: &'a StageSpec,
}

impl<'a> StageRunner<'a> {
    /// Creates a runner for `stage`.
    #[must_use]
    pub fn new(stage: &'a StageSpec) -> Self {
        Self { stage }
    }

    /// Runs the stage and reports every member's outcome.
    ///
    /// Never returns early on an agent failure: a failure is data in the
    /// returned [`StageReport`].
    pub async fn run(&self, session: &Arc<SessionContext>) -> StageReport {
        let start = Instant::now();
        info!(
            stage = %self.stage.name,
            mode = %self.stage.mode,
            agents = self.stage.agents.len(),
            "Running stage"
        );

        let report = match self.stage.mode {
            StageMode::Sequential => self.run_sequential(session).await,
            StageMode::Parallel => self.run_parallel(session).await,
        };

        info!(
            stage = %report.name,
            success = report.success,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Stage finished"
        );
        report
    }

    async fn run_sequential(&self, session: &Arc<SessionContext>) -> StageReport {
        let mut records = Vec::with_capacity(self.stage.agents.len());
        let mut not_run = Vec::new();

        for (index, agent) in self.stage.agents.iter().enumerate() {
            let record = invoke_agent(agent.clone(), session.clone(), self.stage.agent_timeout).await;
            let failed = !record.is_success();
            records.push(record);
            if failed {
                not_run = self.stage.agents[index + 1..]
                    .iter()
                    .map(|a| a.name().to_string())
                    .collect();
                if !not_run.is_empty() {
                    debug!(stage = %self.stage.name, ?not_run, "Skipping remaining sequential members");
                }
                break;
            }
        }

        StageReport::new(&self.stage.name, StageMode::Sequential, records, not_run)
    }

    async fn run_parallel(&self, session: &Arc<SessionContext>) -> StageReport {
        let permits = Arc::new(Semaphore::new(self.stage.worker_count()));
        let timeout = self.stage.agent_timeout;

        let handles: Vec<(String, tokio::task::JoinHandle<AgentRecord>)> = self
            .stage
            .agents
            .iter()
            .map(|agent| {
                let agent = agent.clone();
                let name = agent.name().to_string();
                let session = session.clone();
                let permits = permits.clone();
                let handle = tokio::spawn(async move {
                    let _permit = match permits.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return AgentRecord::instant(agent.name(), AgentOutcome::fault("worker pool closed"));
                        }
                    };
                    invoke_agent(agent, session, timeout).await
                });
                (name, handle)
            })
            .collect();

        // Barrier: every member is awaited before the stage reports.
        let mut records = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let record = match handle.await {
                Ok(record) => record,
                Err(e) => {
                    warn!(stage = %self.stage.name, agent = %name, error = %e, "Agent task did not complete");
                    AgentRecord::instant(name, AgentOutcome::fault(format!("task join error: {e}")))
                }
            };
            records.push(record);
        }

        StageReport::new(&self.stage.name, StageMode::Parallel, records, Vec::new())
    }
}

/// Invokes one agent with precondition checking, event emission, timeout and
/// panic containment.
///
/// A panic or timeout becomes an [`AgentFault`](crate::errors::ErrorKind::AgentFault)
/// outcome and any keys the agent already wrote are discarded.
pub(crate) async fn invoke_agent(
    agent: Arc<dyn Agent>,
    session: Arc<SessionContext>,
    timeout: Option<Duration>,
) -> AgentRecord {
    let name = agent.name().to_string();
    let started_at = Utc::now();

    let missing = session.missing(&agent.requires());
    if !missing.is_empty() {
        let outcome = AgentOutcome::missing_precondition(&missing);
        warn!(agent = %name, ?missing, "Agent skipped: missing required context keys");
        emit_failed(&session, &name, &outcome);
        return AgentRecord::finished(name, outcome, started_at);
    }

    session.try_emit_event(names::AGENT_STARTED, Some(serde_json::json!({ "agent": &name })));
    debug!(agent = %name, "Agent started");

    let ctx = AgentContext::new(session.clone(), &name);
    let guarded = AssertUnwindSafe(agent.run(&ctx)).catch_unwind();

    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, guarded).await.map_err(|_| limit),
        None => Ok(guarded.await),
    };

    let (outcome, discard) = match result {
        Ok(Ok(outcome)) => (outcome, false),
        Ok(Err(payload)) => (
            AgentOutcome::fault(format!("panicked: {}", panic_message(payload.as_ref()))),
            true,
        ),
        Err(limit) => (
            AgentOutcome::fault(format!("timed out after {}ms", limit.as_millis())),
            true,
        ),
    };

    if discard {
        let discarded = session.discard_owned_by(&name);
        if !discarded.is_empty() {
            warn!(agent = %name, ?discarded, "Discarded partial writes");
        }
    }

    let record = AgentRecord::finished(&name, outcome, started_at);
    if record.is_success() {
        if record.outcome.is_degraded() {
            warn!(
                agent = %name,
                reason = record.outcome.message.as_deref().unwrap_or_default(),
                "Agent completed with placeholders"
            );
        }
        session.try_emit_event(
            names::AGENT_COMPLETED,
            Some(serde_json::json!({
                "agent": &name,
                "status": record.outcome.status,
                "duration_ms": record.duration_ms(),
            })),
        );
    } else {
        warn!(agent = %name, error = %record.outcome.describe(), "Agent failed");
        emit_failed(&session, &name, &record.outcome);
    }
    record
}

fn emit_failed(session: &SessionContext, agent: &str, outcome: &AgentOutcome) {
    session.try_emit_event(
        names::AGENT_FAILED,
        Some(serde_json::json!({
            "agent": agent,
            "error_kind": outcome.error_kind,
            "message": outcome.message,
        })),
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::FnAgent;
    use crate::errors::ErrorKind;
    use crate::events::CollectingEventSink;
    use crate::testing::{PanickingAgent, RecordingAgent, SlowAgent, WriterAgent};
    use pretty_assertions::assert_eq;

    fn session() -> Arc<SessionContext> {
        Arc::new(SessionContext::default())
    }

    #[tokio::test]
    async fn test_missing_precondition_skips_run() {
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = ran.clone();
        let agent: Arc<dyn Agent> = Arc::new(
            FnAgent::new("profiler", move |_| {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                AgentOutcome::ok()
            })
            .with_requires(&["data_path"]),
        );

        let record = invoke_agent(agent, session(), None).await;
        assert_eq!(record.outcome.error_kind, Some(ErrorKind::MissingPrecondition));
        assert!(record.outcome.message.unwrap().contains("data_path"));
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_panic_becomes_fault() {
        let session = session();
        let record = invoke_agent(Arc::new(PanickingAgent::new("boom", "kaput")), session.clone(), None).await;
        assert_eq!(record.outcome.error_kind, Some(ErrorKind::AgentFault));
        assert!(record.outcome.message.unwrap().contains("kaput"));
    }

    #[tokio::test]
    async fn test_timeout_discards_partial_writes() {
        let session = session();
        session.register_owner("slow_out", "slow").unwrap();
        let agent = SlowAgent::new("slow", Duration::from_secs(5)).writing_first("slow_out");

        let record = invoke_agent(Arc::new(agent), session.clone(), Some(Duration::from_millis(20))).await;

        assert_eq!(record.outcome.error_kind, Some(ErrorKind::AgentFault));
        assert!(record.outcome.message.unwrap().starts_with("timed out"));
        assert!(!session.has("slow_out"));
    }

    #[tokio::test]
    async fn test_sequential_stops_at_first_failure() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let stage = StageSpec::sequential("s")
            .with_agent(Arc::new(RecordingAgent::new("a", order.clone())))
            .with_agent(Arc::new(FnAgent::new("b", |_| AgentOutcome::fault("bad"))))
            .with_agent(Arc::new(RecordingAgent::new("c", order.clone())));

        let report = StageRunner::new(&stage).run(&session()).await;

        assert!(!report.success);
        assert_eq!(report.agents.len(), 2);
        assert_eq!(report.not_run, vec!["c".to_string()]);
        assert_eq!(*order.lock(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_parallel_joins_all_members() {
        let session = session();
        let stage = StageSpec::parallel("analyze")
            .with_agent(Arc::new(WriterAgent::new("x", "x_out", "1")))
            .with_agent(Arc::new(FnAgent::new("y", |_| AgentOutcome::fault("y broke"))))
            .with_agent(Arc::new(WriterAgent::new("z", "z_out", "3")));

        let report = StageRunner::new(&stage).run(&session).await;

        assert!(!report.success);
        assert_eq!(report.agents.len(), 3);
        assert_eq!(
            report.agents.iter().map(|r| r.agent.as_str()).collect::<Vec<_>>(),
            vec!["x", "y", "z"]
        );
        assert!(session.has("x_out"));
        assert!(session.has("z_out"));
    }

    #[tokio::test]
    async fn test_parallel_panic_does_not_stop_siblings() {
        let session = session();
        let stage = StageSpec::parallel("analyze")
            .with_agent(Arc::new(PanickingAgent::new("p", "oops")))
            .with_agent(Arc::new(WriterAgent::new("w", "w_out", "v")));

        let report = StageRunner::new(&stage).run(&session).await;

        assert!(!report.success);
        assert!(report.agent("w").unwrap().is_success());
        assert!(session.has("w_out"));
    }

    #[tokio::test]
    async fn test_parallel_members_overlap_in_time() {
        let stage = StageSpec::parallel("analyze")
            .with_agent(Arc::new(SlowAgent::new("a", Duration::from_millis(100))))
            .with_agent(Arc::new(SlowAgent::new("b", Duration::from_millis(100))))
            .with_agent(Arc::new(SlowAgent::new("c", Duration::from_millis(100))));

        let start = Instant::now();
        let report = StageRunner::new(&stage).run(&session()).await;

        assert!(report.success);
        assert!(start.elapsed() < Duration::from_millis(280));
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let sink = Arc::new(CollectingEventSink::new());
        let session = Arc::new(SessionContext::default().with_event_sink(sink.clone()));

        invoke_agent(Arc::new(WriterAgent::new("w", "k", "v")), session, None).await;

        assert_eq!(sink.events_of_type(names::AGENT_STARTED).len(), 1);
        assert_eq!(sink.events_of_type(names::AGENT_COMPLETED).len(), 1);
    }
}
