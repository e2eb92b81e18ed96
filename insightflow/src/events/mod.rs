//! Event sink system for observability.
//!
//! The orchestrator reports run, stage and agent lifecycle events through an
//! [`EventSink`]. The sink is owned by the pipeline and handed to each
//! session; there is no process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type names emitted by the orchestrator.
pub mod names {
    /// A pipeline run started.
    pub const PIPELINE_STARTED: &str = "pipeline.started";
    /// A pipeline run finished (terminal artifact emitted).
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    /// A stage started.
    pub const STAGE_STARTED: &str = "stage.started";
    /// A stage finished; `success` carries the aggregate.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// A stage was skipped after an earlier abort.
    pub const STAGE_SKIPPED: &str = "stage.skipped";
    /// An agent was invoked.
    pub const AGENT_STARTED: &str = "agent.started";
    /// An agent returned a successful outcome.
    pub const AGENT_COMPLETED: &str = "agent.completed";
    /// An agent failed.
    pub const AGENT_FAILED: &str = "agent.failed";
    /// The terminal agent ran.
    pub const REPORT_EMITTED: &str = "report.emitted";
}
