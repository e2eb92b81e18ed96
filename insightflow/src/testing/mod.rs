//! Testing utilities for insightflow pipelines.
//!
//! This module provides:
//! - Mock agents
//! - Assertions for agent outcomes and run results
//! - Scripted collaborators for running the analysis pipeline offline

mod assertions;
mod collaborators;
mod mocks;

pub use assertions::{
    assert_agent_not_run, assert_context_has, assert_outcome_failed, assert_outcome_kind,
    assert_outcome_succeeded,
};
pub use collaborators::{sample_sales_csv, ScriptedGenerator, ScriptedPlotter};
pub use mocks::{
    FailingAgent, MockAgent, PanickingAgent, RecordingAgent, SlowAgent, WriterAgent,
};
