//! Pipeline builder with validation.

use super::{keys, PipelineOrchestrator, StageSpec};
use crate::agents::Agent;
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::events::{EventSink, NoOpEventSink};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Builder for creating validated pipelines.
///
/// Stages are checked as they are added. `build` runs the whole-pipeline
/// checks: at least one stage, a terminal agent, and every required key
/// satisfiable by an input or an earlier writer.
#[derive(Clone)]
pub struct PipelineBuilder {
    name: String,
    stages: Vec<StageSpec>,
    terminal: Option<Arc<dyn Agent>>,
    inputs: Vec<String>,
    event_sink: Option<Arc<dyn EventSink>>,
    /// Output key -> writing agent, across all stages added so far.
    writers: HashMap<String, String>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("stages", &self.stages)
            .field("terminal", &self.terminal)
            .field("inputs", &self.inputs)
            .field("has_event_sink", &self.event_sink.is_some())
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let mut writers = HashMap::new();
        writers.insert(keys::PIPELINE_STATUS.to_string(), keys::ORCHESTRATOR.to_string());
        Self {
            name: name.into(),
            stages: Vec::new(),
            terminal: None,
            inputs: Vec::new(),
            event_sink: None,
            writers,
        }
    }

    /// Declares a key supplied by the caller when the run starts.
    #[must_use]
    pub fn input(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !self.inputs.contains(&key) {
            self.inputs.push(key);
        }
        self
    }

    /// Adds a stage to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage is invalid on its own, reuses a stage
    /// name, or writes a key another agent already writes.
    pub fn stage(mut self, spec: StageSpec) -> Result<Self, PipelineValidationError> {
        self.add_stage(spec)?;
        Ok(self)
    }

    /// Adds a stage in place.
    ///
    /// # Errors
    ///
    /// See [`PipelineBuilder::stage`].
    pub fn add_stage(&mut self, spec: StageSpec) -> Result<(), PipelineValidationError> {
        spec.validate()?;

        if self.stages.iter().any(|s| s.name == spec.name) {
            return Err(PipelineValidationError::new(format!("Stage '{}' is defined twice", spec.name))
                .with_stages(vec![spec.name.clone()]));
        }

        let known_agents: HashSet<&str> = self
            .stages
            .iter()
            .flat_map(|s| s.agents.iter().map(|a| a.name()))
            .collect();
        if let Some(agent) = spec.agents.iter().find(|a| known_agents.contains(a.name())) {
            return Err(PipelineValidationError::new(format!(
                "Agent '{}' already belongs to another stage",
                agent.name()
            ))
            .with_stages(vec![spec.name.clone()]));
        }

        let mut staged = self.writers.clone();
        for agent in &spec.agents {
            claim_keys(&mut staged, agent.as_ref(), &spec.name)?;
        }

        self.writers = staged;
        self.stages.push(spec);
        Ok(())
    }

    /// Sets the terminal agent, which runs exactly once after all stages.
    #[must_use]
    pub fn terminal(mut self, agent: Arc<dyn Agent>) -> Self {
        self.terminal = Some(agent);
        self
    }

    /// Sets the event sink for runs of this pipeline.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline has no stages or no terminal agent,
    /// if the terminal agent writes a key some stage writes, or if a required
    /// key has no earlier writer.
    pub fn build(self) -> Result<PipelineOrchestrator, PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new("Pipeline name cannot be empty"));
        }

        if self.stages.is_empty() {
            return Err(PipelineValidationError::new("Pipeline has no stages").with_error_info(
                ContractErrorInfo::new("CONTRACT-EMPTY", "Cannot build an empty pipeline")
                    .with_fix_hint("Add at least one stage to the pipeline before building."),
            ));
        }

        let Some(terminal) = self.terminal else {
            return Err(PipelineValidationError::new("Pipeline has no terminal agent").with_error_info(
                ContractErrorInfo::new("CONTRACT-NO-TERMINAL", "A terminal agent is required")
                    .with_fix_hint("Call .terminal(agent) with the agent that emits the final artifact."),
            ));
        };

        if self.stages.iter().any(|s| s.agents.iter().any(|a| a.name() == terminal.name())) {
            return Err(PipelineValidationError::new(format!(
                "Terminal agent '{}' is also a stage member",
                terminal.name()
            )));
        }

        let mut writers = self.writers;
        claim_keys(&mut writers, terminal.as_ref(), "terminal")?;

        check_satisfiable(&self.inputs, &self.stages, terminal.as_ref())?;

        Ok(PipelineOrchestrator {
            name: self.name,
            stages: self.stages,
            terminal,
            input_keys: self.inputs,
            event_sink: self.event_sink.unwrap_or_else(|| Arc::new(NoOpEventSink)),
        })
    }
}

fn claim_keys(
    writers: &mut HashMap<String, String>,
    agent: &dyn Agent,
    stage: &str,
) -> Result<(), PipelineValidationError> {
    for key in agent.produces() {
        if let Some(existing) = writers.get(&key) {
            if existing != agent.name() {
                return Err(PipelineValidationError::new(format!(
                    "Key '{}' is written by both '{}' and '{}'",
                    key,
                    existing,
                    agent.name()
                ))
                .with_stages(vec![stage.to_string()])
                .with_error_info(
                    ContractErrorInfo::new(
                        "CONTRACT-DUPLICATE-WRITER",
                        format!("Key '{key}' has more than one writer"),
                    )
                    .with_fix_hint("Every context key must have exactly one designated writer.")
                    .with_context_entry("key", &key)
                    .with_context_entry("existing_writer", existing)
                    .with_context_entry("new_writer", agent.name()),
                ));
            }
        }
        writers.insert(key, agent.name().to_string());
    }
    Ok(())
}

/// Checks that every required key is an input or written before it is read.
///
/// Inside a sequential stage, earlier members count as earlier writers.
/// Inside a parallel stage, siblings do not.
fn check_satisfiable(
    inputs: &[String],
    stages: &[StageSpec],
    terminal: &dyn Agent,
) -> Result<(), PipelineValidationError> {
    let mut available: HashSet<String> = inputs.iter().cloned().collect();
    available.insert(keys::PIPELINE_STATUS.to_string());

    for stage in stages {
        let before_stage = available.clone();
        for agent in &stage.agents {
            let visible = match stage.mode {
                crate::core::StageMode::Sequential => &available,
                crate::core::StageMode::Parallel => &before_stage,
            };
            ensure_available(visible, agent.as_ref(), &stage.name)?;
            if stage.mode == crate::core::StageMode::Sequential {
                available.extend(agent.produces());
            }
        }
        for agent in &stage.agents {
            available.extend(agent.produces());
        }
    }

    ensure_available(&available, terminal, "terminal")
}

fn ensure_available(
    available: &HashSet<String>,
    agent: &dyn Agent,
    stage: &str,
) -> Result<(), PipelineValidationError> {
    let unsatisfied: Vec<String> = agent
        .requires()
        .into_iter()
        .filter(|k| !available.contains(k))
        .collect();
    if unsatisfied.is_empty() {
        return Ok(());
    }
    Err(PipelineValidationError::new(format!(
        "Agent '{}' in stage '{}' requires keys nothing writes before it: {}",
        agent.name(),
        stage,
        unsatisfied.join(", ")
    ))
    .with_stages(vec![stage.to_string()])
    .with_error_info(
        ContractErrorInfo::new("CONTRACT-UNSATISFIED", "Required key has no earlier writer")
            .with_fix_hint("Declare the key as an input or move its writer to an earlier stage.")
            .with_context_entry("agent", agent.name())
            .with_context_entry("keys", unsatisfied.join(", ")),
    ))
}
