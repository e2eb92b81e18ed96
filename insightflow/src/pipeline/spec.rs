//! Stage specifications.

use super::FailureMode;
use crate::agents::Agent;
use crate::core::StageMode;
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Specification for one stage of a pipeline.
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// The unique name of the stage.
    pub name: String,
    /// How the member agents are executed.
    pub mode: StageMode,
    /// Member agents, in declared order.
    pub agents: Vec<Arc<dyn Agent>>,
    /// What the orchestrator does when this stage fails.
    pub failure_mode: FailureMode,
    /// Per-agent timeout; `None` lets agents run to completion.
    pub agent_timeout: Option<Duration>,
    /// Upper bound on concurrently running members of a parallel stage.
    /// Defaults to the member count.
    pub max_concurrency: Option<usize>,
}

impl StageSpec {
    /// Creates a new stage specification.
    #[must_use]
    pub fn new(name: impl Into<String>, mode: StageMode) -> Self {
        Self {
            name: name.into(),
            mode,
            agents: Vec::new(),
            failure_mode: FailureMode::default(),
            agent_timeout: None,
            max_concurrency: None,
        }
    }

    /// Creates a sequential stage.
    #[must_use]
    pub fn sequential(name: impl Into<String>) -> Self {
        Self::new(name, StageMode::Sequential)
    }

    /// Creates a parallel stage.
    #[must_use]
    pub fn parallel(name: impl Into<String>) -> Self {
        Self::new(name, StageMode::Parallel)
    }

    /// Adds an agent.
    #[must_use]
    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.push(agent);
        self
    }

    /// Adds several agents.
    #[must_use]
    pub fn with_agents(mut self, agents: impl IntoIterator<Item = Arc<dyn Agent>>) -> Self {
        self.agents.extend(agents);
        self
    }

    /// Sets the failure mode.
    #[must_use]
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Sets the per-agent timeout.
    #[must_use]
    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = Some(timeout);
        self
    }

    /// Caps the number of concurrently running members.
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    /// Returns the member agent names in declared order.
    #[must_use]
    pub fn agent_names(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.name().to_string()).collect()
    }

    /// Returns the worker count for a parallel run of this stage.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        let members = self.agents.len().max(1);
        self.max_concurrency.map_or(members, |max| max.clamp(1, members))
    }

    /// Validates the stage on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage is unnamed or empty, if two members share
    /// a name, if the concurrency cap is zero, or if two members of a parallel stage declare the same output key.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new("Stage name cannot be empty or whitespace-only"));
        }

        if self.agents.is_empty() {
            return Err(PipelineValidationError::new(format!("Stage '{}' has no agents", self.name))
                .with_stages(vec![self.name.clone()])
                .with_error_info(
                    ContractErrorInfo::new("CONTRACT-EMPTY", "Cannot run an empty stage")
                        .with_context_entry("stage", &self.name),
                ));
        }

        let mut names = HashSet::new();
        for agent in &self.agents {
            if !names.insert(agent.name()) {
                return Err(PipelineValidationError::new(format!(
                    "Agent '{}' appears twice in stage '{}'",
                    agent.name(),
                    self.name
                ))
                .with_stages(vec![self.name.clone()]));
            }
        }

        if self.max_concurrency == Some(0) {
            return Err(
                PipelineValidationError::new(format!("Stage '{}' allows zero concurrent agents", self.name))
                    .with_stages(vec![self.name.clone()]),
            );
        }

        if self.mode == crate::core::StageMode::Parallel {
            let mut writers: HashMap<String, &str> = HashMap::new();
            for agent in &self.agents {
                for key in agent.produces() {
                    if let Some(other) = writers.insert(key.clone(), agent.name()) {
                        return Err(PipelineValidationError::new(format!(
                            "Parallel agents '{}' and '{}' in stage '{}' both write '{}'",
                            other,
                            agent.name(),
                            self.name,
                            key
                        ))
                        .with_stages(vec![self.name.clone()])
                        .with_error_info(
                            ContractErrorInfo::new(
                                "CONTRACT-OVERLAP",
                                format!("Overlapping output key '{key}' in parallel stage"),
                            )
                            .with_fix_hint(
                                "Give each parallel member its own output keys or move one into a sequential stage.",
                            )
                            .with_context_entry("stage", &self.name)
                            .with_context_entry("key", key),
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}
