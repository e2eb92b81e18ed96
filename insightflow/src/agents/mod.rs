//! The agent trait and small generic implementations.
//!
//! Agents are the units of work a pipeline sequences. Each one declares the
//! context keys it requires and the keys it produces, and turns every fault
//! of its own into a failed [`AgentOutcome`].

mod analysis;
mod data;
mod insights;
pub mod keys;
mod ml;
mod recommendation;
mod report;
mod support;
mod visualization;

pub use analysis::{analysis_pipeline, default_collaborators, run_analysis, stages, PIPELINE_NAME};
pub use data::{CleanerAgent, ProfilerAgent};
pub use insights::{ExternalContextAgent, InternalInsightsAgent, MEMORY_WINDOW};
pub use ml::MlAgent;
pub use recommendation::RecommendationAgent;
pub use report::{ReportWriterAgent, DATA_UNAVAILABLE, REPORT_FILE};
pub use visualization::VisualizationAgent;

use crate::context::AgentContext;
use crate::core::AgentOutcome;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline agents.
///
/// `run` never panics by contract; the stage runner still catches panics
/// and converts them into [`ErrorKind::AgentFault`](crate::errors::ErrorKind).
#[async_trait]
pub trait Agent: Send + Sync + Debug {
    /// Returns the name of the agent. Names are unique within a pipeline.
    fn name(&self) -> &str;

    /// Context keys that must be present before the agent runs.
    fn requires(&self) -> Vec<String> {
        Vec::new()
    }

    /// Context keys this agent is the designated writer of.
    fn produces(&self) -> Vec<String> {
        Vec::new()
    }

    /// Executes the agent against the run's context.
    async fn run(&self, ctx: &AgentContext) -> AgentOutcome;
}

/// A simple function-based agent.
pub struct FnAgent<F>
where
    F: Fn(&AgentContext) -> AgentOutcome + Send + Sync,
{
    name: String,
    requires: Vec<String>,
    produces: Vec<String>,
    func: F,
}

impl<F> FnAgent<F>
where
    F: Fn(&AgentContext) -> AgentOutcome + Send + Sync,
{
    /// Creates a new function-based agent.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
            produces: Vec::new(),
            func,
        }
    }

    /// Declares required keys.
    #[must_use]
    pub fn with_requires(mut self, keys: &[&str]) -> Self {
        self.requires = keys.iter().map(|k| (*k).to_string()).collect();
        self
    }

    /// Declares produced keys.
    #[must_use]
    pub fn with_produces(mut self, keys: &[&str]) -> Self {
        self.produces = keys.iter().map(|k| (*k).to_string()).collect();
        self
    }
}

impl<F> Debug for FnAgent<F>
where
    F: Fn(&AgentContext) -> AgentOutcome + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAgent")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("produces", &self.produces)
            .finish()
    }
}

#[async_trait]
impl<F> Agent for FnAgent<F>
where
    F: Fn(&AgentContext) -> AgentOutcome + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn requires(&self) -> Vec<String> {
        self.requires.clone()
    }

    fn produces(&self) -> Vec<String> {
        self.produces.clone()
    }

    async fn run(&self, ctx: &AgentContext) -> AgentOutcome {
        (self.func)(ctx)
    }
}

/// A no-op agent.
#[derive(Debug, Clone)]
pub struct NoOpAgent {
    name: String,
}

impl NoOpAgent {
    /// Creates a new no-op agent.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Agent for NoOpAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: &AgentContext) -> AgentOutcome {
        AgentOutcome::ok()
    }
}
