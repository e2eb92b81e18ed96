//! Pipeline building and execution.
//!
//! This module provides:
//! - Stage specifications and the validating builder
//! - The stage runner (sequential and parallel modes)
//! - The orchestrator that always finishes with the terminal agent
//! - Failure policy and run results

mod builder;
mod failure;
mod orchestrator;
mod result;
mod runner;
mod spec;


pub use builder::PipelineBuilder;
pub use failure::{FailureCollector, FailureMode, FailureRecord};
pub use orchestrator::PipelineOrchestrator;
pub use result::{AgentRecord, PipelineRunResult, StageReport};
pub use runner::StageRunner;
pub use spec::StageSpec;

/// Context keys reserved by the orchestrator.
pub mod keys {
    /// Writer name used for keys the orchestrator writes itself.
    pub const ORCHESTRATOR: &str = "orchestrator";
    /// Upstream run status, written just before the terminal agent runs.
    ///
    /// Holds a serialized [`RunStatus`](crate::core::RunStatus).
    pub const PIPELINE_STATUS: &str = "pipeline_status";
    /// Status the terminal agent stamped on its artifact, if it stamps one.
    ///
    /// Holds a serialized [`RunStatus`](crate::core::RunStatus); when present
    /// it becomes the run's final status.
    pub const REPORT_STATUS: &str = "final_report_status";
    /// Path of the artifact the terminal agent wrote, as text.
    pub const REPORT_PATH: &str = "final_report_path";
}
