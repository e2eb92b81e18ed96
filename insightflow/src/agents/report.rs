//! The terminal report writer.

use super::keys::{
    EXTERNAL_CONTEXT, FINAL_REPORT_CONTENT, FINAL_REPORT_PATH, FINAL_REPORT_STATUS, INTERNAL_INSIGHTS,
    ML_REPORTS, PLOT_PATHS, PROFILE_REPORT, RECOMMENDATION_REPORT,
};
use super::support::settle;
use super::Agent;
use crate::collaborators::TextGenerator;
use crate::context::AgentContext;
use crate::core::{AgentOutcome, RunStatus};
use crate::errors::CollaboratorError;
use crate::pipeline::keys::PIPELINE_STATUS;
use crate::utils::iso_timestamp;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// File name of the final report inside the report directory.
pub const REPORT_FILE: &str = "final_analysis_report.md";

/// Placeholder for a section whose key is absent.
pub const DATA_UNAVAILABLE: &str = "N/A (data unavailable)";

const ML_SUMMARY_ROWS: usize = 10;

const SECTIONS: [(&str, &str); 6] = [
    ("Data Profile", PROFILE_REPORT),
    ("Internal Insights", INTERNAL_INSIGHTS),
    ("External Context", EXTERNAL_CONTEXT),
    ("Recommendation Report", RECOMMENDATION_REPORT),
    ("ML Reports Summary", ML_REPORTS),
    ("Plot Files", PLOT_PATHS),
];

/// Writes `final_analysis_report.md` from whatever the run produced.
///
/// Absent keys become [`DATA_UNAVAILABLE`] sections. The first line of the
/// file is `Status: SUCCESS` or `Status: FAILURE(<reason>)`, where the reason
/// carries the upstream failure, a generation failure, and the keys that were
/// unavailable. If generation fails, the raw prompt is written instead of the
/// synthesized report.
///
/// A generation timeout bounds only the generator call, so a slow generator
/// still leaves a stamped report on disk.
#[derive(Clone)]
pub struct ReportWriterAgent {
    generator: Arc<dyn TextGenerator>,
    report_dir: PathBuf,
    generation_timeout: Option<Duration>,
}

impl ReportWriterAgent {
    /// Agent name.
    pub const NAME: &'static str = "report_writer";

    /// Creates the agent writing into `report_dir`.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, report_dir: impl Into<PathBuf>) -> Self {
        Self {
            generator,
            report_dir: report_dir.into(),
            generation_timeout: None,
        }
    }

    /// Gives up on the generator after `timeout` and writes the raw prompt.
    #[must_use]
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = Some(timeout);
        self
    }

    /// Returns the path the report is written to.
    #[must_use]
    pub fn report_path(&self) -> PathBuf {
        self.report_dir.join(REPORT_FILE)
    }

    fn upstream_status(ctx: &AgentContext) -> RunStatus {
        ctx.get(PIPELINE_STATUS)
            .and_then(|value| value.as_report().cloned())
            .and_then(|json| serde_json::from_value(json).ok())
            .unwrap_or(RunStatus::Success)
    }

    async fn prompt(ctx: &AgentContext) -> (String, Vec<&'static str>) {
        let mut unavailable = Vec::new();
        let mut data = String::new();
        for (title, key) in SECTIONS {
            let body = match ctx.get(key) {
                Some(value) => value.render(),
                None => {
                    unavailable.push(key);
                    DATA_UNAVAILABLE.to_string()
                }
            };
            let _ = write!(data, "### {title}\n{}\n\n", body.trim_end());
        }
        if let Some(summaries) = ml_summaries(ctx).await {
            let _ = write!(data, "### ML Data Summaries\n{summaries}\n");
        }

        let prompt = format!(
            "You are a Senior Business Analyst. Based on the following structured data, \
             write a clear, professional, 500-700 word Markdown report.\n\n\
             The report MUST include:\n\
             1. **Executive Summary**\n\
             2. **Key Findings**\n\
             3. **Trends & Insights** (from internal + external data)\n\
             4. **Machine Learning Analysis Summary**\n\
             5. **Strategic Recommendations**\n\n\
             Sections marked {DATA_UNAVAILABLE} could not be produced in this run; say so \
             rather than inventing content.\n\
             Below is the structured data:\n\n\
             ------------------------------\n\
             {data}\
             ------------------------------\n"
        );
        (prompt, unavailable)
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentOutcome, AgentOutcome> {
        let upstream = Self::upstream_status(ctx);
        let (prompt, unavailable) = Self::prompt(ctx).await;

        let mut reasons: Vec<String> = upstream.reason().map(str::to_string).into_iter().collect();
        let generated = match self.generation_timeout {
            Some(limit) => tokio::time::timeout(limit, self.generator.generate(&prompt, false))
                .await
                .unwrap_or_else(|_| {
                    Err(CollaboratorError::failed(
                        "text_generator",
                        format!("timed out after {}ms", limit.as_millis()),
                    ))
                }),
            None => self.generator.generate(&prompt, false).await,
        };
        let body = match generated {
            Ok(generated) => generated.text().to_string(),
            Err(e) => {
                warn!(agent = Self::NAME, error = %e, "Report generation failed; writing raw prompt");
                reasons.push(format!("LLM error: {e}"));
                format!("# REPORT GENERATION FAILED\n\nLLM error. Raw prompt was:\n\n{prompt}")
            }
        };
        if !reasons.is_empty() && !unavailable.is_empty() {
            reasons.push(format!("data unavailable: {}", unavailable.join(", ")));
        }

        let status = if reasons.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::failure(reasons.join("; "))
        };

        let path = self.report_path();
        let content = format!("Status: {status}\nGenerated: {}\n\n{body}\n", iso_timestamp());
        let written = write_report(&path, &content).await;

        let (status, outcome) = match written {
            Ok(()) => {
                info!(agent = Self::NAME, path = %path.display(), %status, "Final report written");
                ctx.set(FINAL_REPORT_PATH, path.display().to_string())?;
                (status, AgentOutcome::ok())
            }
            Err(e) => {
                let reason = format!("could not write {}: {e}", path.display());
                warn!(agent = Self::NAME, %reason, "Final report not written");
                (RunStatus::failure(format!("File Write Error: {e}")), AgentOutcome::fault(reason))
            }
        };

        let stamp = serde_json::to_value(&status).map_err(|e| AgentOutcome::fault(e.to_string()))?;
        ctx.set(FINAL_REPORT_STATUS, stamp)?;
        ctx.set(FINAL_REPORT_CONTENT, content)?;
        Ok(outcome)
    }
}

impl std::fmt::Debug for ReportWriterAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportWriterAgent")
            .field("report_dir", &self.report_dir)
            .field("generation_timeout", &self.generation_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for ReportWriterAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn produces(&self) -> Vec<String> {
        vec![
            FINAL_REPORT_STATUS.to_string(),
            FINAL_REPORT_CONTENT.to_string(),
            FINAL_REPORT_PATH.to_string(),
        ]
    }

    async fn run(&self, ctx: &AgentContext) -> AgentOutcome {
        settle(self.execute(ctx).await)
    }
}

async fn write_report(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, content).await
}

/// Reads the head of every model artifact listed in `ml_reports`.
async fn ml_summaries(ctx: &AgentContext) -> Option<String> {
    let report = ctx.get(ML_REPORTS)?;
    let report = report.as_report()?.as_object()?.clone();

    let mut out = String::new();
    for (name, artifact) in report {
        let Some(path) = artifact.pointer("/written/path").and_then(|p| p.as_str()) else {
            continue;
        };
        let summary = match tokio::fs::read_to_string(path).await {
            Ok(content) => match serde_json::from_str::<serde_json::Value>(&content) {
                Ok(serde_json::Value::Array(rows)) => {
                    let head: Vec<_> = rows.into_iter().take(ML_SUMMARY_ROWS).collect();
                    serde_json::to_string_pretty(&head).unwrap_or_default()
                }
                Ok(other) => other.to_string(),
                Err(e) => format!("Error parsing {path}: {e}"),
            },
            Err(e) => format!("Error loading {path}: {e}"),
        };
        let _ = write!(out, "#### {name}\n{summary}\n\n");
    }
    (!out.is_empty()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ModelArtifact, ModelReport};
    use crate::context::SessionContext;
    use crate::core::ArtifactRef;
    use crate::errors::ErrorKind;
    use crate::testing::ScriptedGenerator;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn stamped(ctx: &AgentContext) -> RunStatus {
        serde_json::from_value(ctx.get(FINAL_REPORT_STATUS).unwrap().as_report().unwrap().clone()).unwrap()
    }

    fn full_context() -> AgentContext {
        let session = Arc::new(SessionContext::default());
        for (_, key) in SECTIONS {
            session.set(key, format!("{key} content"));
        }
        AgentContext::new(session, ReportWriterAgent::NAME)
    }

    #[tokio::test]
    async fn test_success_report() {
        let dir = tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::replying("# Analysis"));
        let agent = ReportWriterAgent::new(generator.clone(), dir.path());
        let ctx = full_context();

        let outcome = agent.run(&ctx).await;

        assert!(outcome.is_success());
        assert_eq!(stamped(&ctx), RunStatus::Success);
        let file = std::fs::read_to_string(agent.report_path()).unwrap();
        assert!(file.starts_with("Status: SUCCESS\n"));
        assert!(file.contains("# Analysis"));
        assert_eq!(ctx.get_text(FINAL_REPORT_CONTENT).unwrap(), file);
        assert!(!generator.prompts()[0].0.contains(&format!("\n{DATA_UNAVAILABLE}\n")));
    }

    #[tokio::test]
    async fn test_missing_keys_become_placeholders() {
        let dir = tempdir().unwrap();
        let session = Arc::new(SessionContext::default());
        session.set(
            PIPELINE_STATUS,
            serde_json::to_value(RunStatus::failure("stage 'profile' failed: data_profiler (agent fault: unreadable)"))
                .unwrap(),
        );
        let ctx = AgentContext::new(session, ReportWriterAgent::NAME);
        let generator = Arc::new(ScriptedGenerator::default());
        let agent = ReportWriterAgent::new(generator.clone(), dir.path());

        let outcome = agent.run(&ctx).await;

        assert!(outcome.is_success());
        let prompt = &generator.prompts()[0].0;
        assert_eq!(prompt.matches(DATA_UNAVAILABLE).count(), SECTIONS.len() + 1);

        let status = stamped(&ctx);
        let reason = status.reason().unwrap();
        assert!(reason.starts_with("stage 'profile' failed"));
        assert!(reason.contains("data unavailable: profile_report"));

        let file = std::fs::read_to_string(agent.report_path()).unwrap();
        assert!(file.starts_with("Status: FAILURE(stage 'profile' failed"));
    }

    #[tokio::test]
    async fn test_generation_failure_writes_raw_prompt() {
        let dir = tempdir().unwrap();
        let agent = ReportWriterAgent::new(Arc::new(ScriptedGenerator::failing("quota exceeded")), dir.path());
        let ctx = full_context();

        let outcome = agent.run(&ctx).await;

        assert!(outcome.is_success());
        let reason = stamped(&ctx).reason().unwrap().to_string();
        assert!(reason.starts_with("LLM error:"));
        assert!(!reason.contains("data unavailable"));
        let file = std::fs::read_to_string(agent.report_path()).unwrap();
        assert!(file.contains("# REPORT GENERATION FAILED"));
        assert!(file.contains("Senior Business Analyst"));
    }

    #[tokio::test]
    async fn test_slow_generation_still_writes_report() {
        let dir = tempdir().unwrap();
        let generator = ScriptedGenerator::default().with_delay(Duration::from_millis(500));
        let agent = ReportWriterAgent::new(Arc::new(generator), dir.path())
            .with_generation_timeout(Duration::from_millis(50));
        let ctx = full_context();

        let outcome = agent.run(&ctx).await;

        assert!(outcome.is_success());
        let reason = stamped(&ctx).reason().unwrap().to_string();
        assert!(reason.contains("timed out after 50ms"));
        let file = std::fs::read_to_string(agent.report_path()).unwrap();
        assert!(file.starts_with("Status: FAILURE(LLM error:"));
        assert!(file.contains("# REPORT GENERATION FAILED"));
    }

    #[tokio::test]
    async fn test_unwritable_report_dir_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "file").unwrap();
        let agent = ReportWriterAgent::new(Arc::new(ScriptedGenerator::default()), &blocker);
        let ctx = full_context();

        let outcome = agent.run(&ctx).await;

        assert_eq!(outcome.error_kind, Some(ErrorKind::AgentFault));
        assert!(stamped(&ctx).reason().unwrap().starts_with("File Write Error"));
        assert!(!ctx.has(FINAL_REPORT_PATH));
    }

    #[tokio::test]
    async fn test_ml_artifacts_are_summarized() {
        let dir = tempdir().unwrap();
        let forecast = dir.path().join("sales_forecast.json");
        let rows: Vec<_> = (0..12).map(|i| serde_json::json!({"day": i})).collect();
        std::fs::write(&forecast, serde_json::to_string(&rows).unwrap()).unwrap();

        let ctx = full_context();
        let report = ModelReport {
            sales_forecast: ModelArtifact::Written(ArtifactRef::new("forecast", &forecast)),
            anomalies: ModelArtifact::NotAvailable("no sales column".into()),
            demand_predictions: ModelArtifact::NotAvailable("no category column".into()),
        };
        ctx.session().set(ML_REPORTS, serde_json::to_value(report).unwrap());
        let generator = Arc::new(ScriptedGenerator::default());

        ReportWriterAgent::new(generator.clone(), dir.path()).run(&ctx).await;

        let prompt = &generator.prompts()[0].0;
        assert!(prompt.contains("#### sales_forecast"));
        assert!(prompt.contains("\"day\": 9"));
        assert!(!prompt.contains("\"day\": 10"));
    }
}
