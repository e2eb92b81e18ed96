//! The standard analysis pipeline.

use super::keys::DATA_PATH;
use super::{
    CleanerAgent, ExternalContextAgent, InternalInsightsAgent, MlAgent, ProfilerAgent, RecommendationAgent,
    ReportWriterAgent, VisualizationAgent,
};
use crate::collaborators::{
    BaselineModeler, Collaborators, CsvIngestion, DataSeriesPlotter, TextGenerator, UnconfiguredGenerator,
};
use crate::config::PipelineConfig;
use crate::context::ContextValue;
use crate::errors::{CollaboratorError, InsightflowError, PipelineValidationError};
use crate::events::LoggingEventSink;
use crate::memory::MemoryBank;
use crate::pipeline::{PipelineBuilder, PipelineRunResult, StageSpec};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Name of the standard pipeline.
pub const PIPELINE_NAME: &str = "insightflow-analysis";

/// Stage names of the standard pipeline, in execution order.
pub mod stages {
    /// Loads and profiles the dataset.
    pub const PROFILE: &str = "profile";
    /// Cleans the loaded table.
    pub const CLEAN: &str = "clean";
    /// Insights, external context and charts, concurrently.
    pub const ANALYZE: &str = "analyze";
    /// Predictive analysis.
    pub const MODEL: &str = "model";
    /// Strategic recommendations.
    pub const RECOMMEND: &str = "recommend";
}

/// Builds the built-in collaborators described by `config`.
///
/// Text generation uses Gemini when an API key is configured. Without one,
/// every generation call fails with a recognizable error and the agents fall
/// back to their placeholders.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn default_collaborators(config: &PipelineConfig) -> Result<Collaborators, CollaboratorError> {
    let generator = text_generator(config)?;
    Ok(Collaborators::new(
        Arc::new(CsvIngestion::new()),
        generator,
        Arc::new(DataSeriesPlotter::new(config.plots_dir())),
        Arc::new(BaselineModeler::new(config.ml_dir()).with_forecast_steps(config.forecast_steps)),
    ))
}

#[cfg(feature = "gemini")]
fn text_generator(config: &PipelineConfig) -> Result<Arc<dyn TextGenerator>, CollaboratorError> {
    match config.api_key.as_deref() {
        Some(key) => {
            let client = crate::collaborators::GeminiClient::new(key, &config.model_name)?;
            info!(model = %config.model_name, "Using Gemini for text generation");
            Ok(Arc::new(client))
        }
        None => {
            warn!("GEMINI_API_KEY is not set; generated sections will be placeholders");
            Ok(Arc::new(UnconfiguredGenerator::missing_api_key()))
        }
    }
}

#[cfg(not(feature = "gemini"))]
fn text_generator(config: &PipelineConfig) -> Result<Arc<dyn TextGenerator>, CollaboratorError> {
    if config.api_key.is_some() {
        warn!("Built without the gemini feature; ignoring the API key");
    } else {
        info!("Text generation is not configured");
    }
    Ok(Arc::new(UnconfiguredGenerator::new("built without the gemini feature")))
}

/// Builds the five-stage analysis pipeline with the report writer as its
/// terminal agent.
///
/// The run expects the dataset path under [`DATA_PATH`]. The configured
/// agent timeout applies to every stage agent. The report writer is never
/// cut off; the timeout only bounds its generation call.
///
/// # Errors
///
/// Returns an error if the stages fail validation, which only happens when
/// `config` carries a zero worker count.
pub fn analysis_pipeline(
    config: &PipelineConfig,
    collaborators: &Collaborators,
) -> Result<PipelineBuilder, PipelineValidationError> {
    let memory = MemoryBank::new(config.memory_path()).with_capacity(config.memory_capacity);
    let timeout = config.agent_timeout();
    let with_timeout = |spec: StageSpec| match timeout {
        Some(timeout) => spec.with_agent_timeout(timeout),
        None => spec,
    };

    let builder = PipelineBuilder::new(PIPELINE_NAME)
        .input(DATA_PATH)
        .stage(with_timeout(
            StageSpec::sequential(stages::PROFILE)
                .with_agent(Arc::new(ProfilerAgent::new(collaborators.ingestion.clone()))),
        ))?
        .stage(with_timeout(
            StageSpec::sequential(stages::CLEAN)
                .with_agent(Arc::new(CleanerAgent::new(collaborators.ingestion.clone()))),
        ))?
        .stage(with_timeout(
            StageSpec::parallel(stages::ANALYZE)
                .with_agent(Arc::new(InternalInsightsAgent::new(collaborators.generator.clone(), memory)))
                .with_agent(Arc::new(ExternalContextAgent::new(collaborators.generator.clone())))
                .with_agent(Arc::new(VisualizationAgent::new(collaborators.plotter.clone())))
                .with_max_concurrency(config.parallel_workers)
                .with_failure_mode(config.analyze_failure_mode),
        ))?
        .stage(with_timeout(
            StageSpec::sequential(stages::MODEL).with_agent(Arc::new(MlAgent::new(collaborators.modeler.clone()))),
        ))?
        .stage(with_timeout(
            StageSpec::sequential(stages::RECOMMEND)
                .with_agent(Arc::new(RecommendationAgent::new(collaborators.generator.clone()))),
        ))?;

    let mut report_writer = ReportWriterAgent::new(collaborators.generator.clone(), config.report_dir.clone());
    if let Some(timeout) = timeout {
        report_writer = report_writer.with_generation_timeout(timeout);
    }
    Ok(builder.terminal(Arc::new(report_writer)))
}

/// Runs the analysis pipeline over the dataset at `data_path`.
///
/// Stage failures do not make this return an error; they are reported in the
/// result and in the stamped report. Errors are limited to setup problems.
///
/// # Errors
///
/// Returns an error if the report directory cannot be created or the
/// pipeline fails validation.
pub async fn run_analysis(
    config: &PipelineConfig,
    collaborators: &Collaborators,
    data_path: &Path,
) -> Result<PipelineRunResult, InsightflowError> {
    tokio::fs::create_dir_all(&config.report_dir).await?;
    let pipeline = analysis_pipeline(config, collaborators)?
        .with_event_sink(Arc::new(LoggingEventSink::debug()))
        .build()?;

    info!(path = %data_path.display(), "Starting analysis");
    let inputs = [(
        DATA_PATH.to_string(),
        ContextValue::from(data_path.display().to_string()),
    )];
    Ok(pipeline.run(inputs).await)
}
