//! Scripted collaborators and fixtures for running the analysis pipeline
//! without network access.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::collaborators::{Generated, PlotKind, PlotOutcome, Plotter, TextGenerator};
use crate::core::{ArtifactRef, Table};
use crate::errors::CollaboratorError;

const SAMPLE_SALES: &str = "\
OrderID,OrderDate,Product,Category,Price,Quantity
1001,2025-01-01,Laptop,Electronics,1200,1
1002,2025-01-01,Apples,Food,2.5,10
1003,2025-01-02,Headphones,Electronics,150,2
1004,2025-01-03,Bread,Food,3,5
1005,2025-01-03,Laptop,Electronics,1200,2
1006,2025-01-04,Apples,Food,2.5,
1007,2025-01-05,Monitor,Electronics,300,1
1007,2025-01-05,Monitor,Electronics,300,1
1008,2025-01-06,Bread,Food,abc,4
1009,2025-01-07,Headphones,Electronics,150,3
";

/// Writes a small sales dataset into `dir` and returns its path.
///
/// The dataset has a duplicate row and unparseable cells so that cleaning
/// has something to do.
///
/// # Panics
///
/// Panics if the file cannot be written.
#[allow(clippy::expect_used)]
pub fn sample_sales_csv(dir: &Path) -> PathBuf {
    let path = dir.join("sales_data.csv");
    std::fs::write(&path, SAMPLE_SALES).expect("write sample dataset");
    path
}

#[derive(Debug, Clone)]
enum Script {
    Reply,
    Fail(String),
}

/// A text generator that answers from a script and records every prompt.
///
/// Replies echo the first line of the prompt after a fixed prefix so tests
/// can tell the calls apart.
#[derive(Debug)]
pub struct ScriptedGenerator {
    prefix: String,
    script: Script,
    sources: Vec<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<(String, bool)>>,
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::replying("Generated")
    }
}

impl ScriptedGenerator {
    /// Creates a generator whose replies start with `prefix`.
    #[must_use]
    pub fn replying(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            script: Script::Reply,
            sources: Vec::new(),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Creates a generator that fails every call with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: Script::Fail(message.into()),
            ..Self::default()
        }
    }

    /// Sets the sources returned with grounded replies.
    #[must_use]
    pub fn with_sources(mut self, sources: &[&str]) -> Self {
        self.sources = sources.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Sleeps for `delay` before answering each call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the prompts received, with their grounded flag.
    #[must_use]
    pub fn prompts(&self) -> Vec<(String, bool)> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, grounded: bool) -> Result<Generated, CollaboratorError> {
        self.prompts.lock().push((prompt.to_string(), grounded));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            Script::Fail(message) => Err(CollaboratorError::failed("scripted_generator", message.clone())),
            Script::Reply => {
                let first_line = prompt.lines().find(|l| !l.trim().is_empty()).unwrap_or_default().trim();
                let text = format!("{}: {first_line}", self.prefix);
                if grounded {
                    Ok(Generated::Grounded {
                        text,
                        sources: self.sources.clone(),
                    })
                } else {
                    Ok(Generated::Text(text))
                }
            }
        }
    }
}

/// A plotter that returns one artifact per call without touching the disk.
#[derive(Debug, Default)]
pub struct ScriptedPlotter {
    calls: Mutex<Vec<(PlotKind, Vec<String>)>>,
}

impl ScriptedPlotter {
    /// Creates the plotter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the kinds and columns requested so far.
    #[must_use]
    pub fn calls(&self) -> Vec<(PlotKind, Vec<String>)> {
        self.calls.lock().clone()
    }
}

impl Plotter for ScriptedPlotter {
    fn plot(&self, _table: &Table, columns: &[String], kind: PlotKind) -> PlotOutcome {
        self.calls.lock().push((kind, columns.to_vec()));
        PlotOutcome::Artifacts(vec![ArtifactRef::new(
            "plot",
            format!("plots/{}.png", kind.file_stem()),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CsvIngestion, DataIngestion};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_sample_dataset_loads_and_cleans() {
        let dir = tempdir().unwrap();
        let path = sample_sales_csv(dir.path());

        let ingestion = CsvIngestion::new();
        let loaded = ingestion.load(&path).unwrap();
        assert_eq!(loaded.table.len(), 10);

        let cleaned = ingestion.clean(&loaded.table);
        assert_eq!(cleaned.len(), 9);
    }

    #[tokio::test]
    async fn test_scripted_generator_records_prompts() {
        let generator = ScriptedGenerator::replying("Insight").with_sources(&["https://example.com"]);

        let text = generator.generate("\nFirst line\nmore", false).await.unwrap();
        assert_eq!(text, Generated::Text("Insight: First line".into()));

        let grounded = generator.generate("query", true).await.unwrap();
        assert!(matches!(grounded, Generated::Grounded { ref sources, .. } if sources.len() == 1));

        assert_eq!(generator.prompts().len(), 2);
        assert!(generator.prompts()[1].1);
    }

    #[tokio::test]
    async fn test_failing_generator() {
        let generator = ScriptedGenerator::failing("quota exceeded");
        assert!(generator.generate("x", false).await.is_err());
        assert_eq!(generator.prompts().len(), 1);
    }

    #[test]
    fn test_scripted_plotter() {
        let plotter = ScriptedPlotter::new();
        let outcome = plotter.plot(&Table::default(), &["OrderDate".into()], PlotKind::SalesOverTime);
        assert!(matches!(outcome, PlotOutcome::Artifacts(ref a) if a[0].file_name() == "sales_trend.png"));
        assert_eq!(plotter.calls(), vec![(PlotKind::SalesOverTime, vec!["OrderDate".to_string()])]);
    }
}
