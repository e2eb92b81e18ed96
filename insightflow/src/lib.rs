//! # Insightflow
//!
//! A staged multi-agent analysis pipeline.
//!
//! Insightflow sequences independent agents over a shared per-run context:
//!
//! - **Stages**: agents run strictly in order or concurrently behind a join barrier
//! - **Failure policy**: a failed stage aborts the rest or lets the run continue degraded
//! - **Terminal report**: exactly one terminal agent always runs and stamps the outcome
//! - **Memory bank**: a bounded log of findings persisted across runs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use insightflow::prelude::*;
//!
//! let pipeline = PipelineBuilder::new("sales")
//!     .input("data_path")
//!     .stage(StageSpec::sequential("profile").with_agent(profiler))?
//!     .stage(StageSpec::parallel("analyze").with_agents([insights, charts]))?
//!     .terminal(report_writer)
//!     .build()?;
//!
//! let result = pipeline.run([("data_path".to_string(), "sales.csv".into())]).await;
//! println!("{}", result.status);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod agents;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod memory;
pub mod observability;
pub mod pipeline;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agents::{analysis_pipeline, default_collaborators, run_analysis, Agent, FnAgent, NoOpAgent};
    pub use crate::collaborators::{Collaborators, DataIngestion, Modeler, Plotter, TextGenerator};
    pub use crate::config::PipelineConfig;
    pub use crate::context::{AgentContext, ContextValue, RunIdentity, SessionContext};
    pub use crate::core::{AgentOutcome, ArtifactRef, RunStatus, StageMode, Table};
    pub use crate::errors::{
        CollaboratorError, ConfigError, ContextError, ErrorKind, InsightflowError, MemoryBankError,
        PipelineValidationError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::memory::{MemoryBank, MemoryRecord};
    pub use crate::pipeline::{
        FailureMode, PipelineBuilder, PipelineOrchestrator, PipelineRunResult, StageSpec,
    };
    pub use crate::utils::{iso_timestamp, Timestamp};
}
