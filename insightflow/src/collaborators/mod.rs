//! External collaborators consumed by the analysis agents.
//!
//! Each capability is a trait so that agents can be run against scripted
//! doubles in tests. The built-in implementations are deliberately small:
//! numeric heuristics for modeling, chart data instead of rendered images,
//! and an HTTP client for text generation behind the `gemini` feature.

mod columns;
mod csv;
#[cfg(feature = "gemini")]
mod gemini;
mod generation;
mod modeling;
mod plotting;

pub use self::csv::CsvIngestion;
pub use columns::{date_column, sales_measure, SalesMeasure};
#[cfg(feature = "gemini")]
pub use gemini::GeminiClient;
pub use generation::{Generated, UnconfiguredGenerator};
pub use modeling::{BaselineModeler, ModelArtifact, ModelReport, DEFAULT_FORECAST_STEPS};
pub use plotting::{DataSeriesPlotter, NullPlotter, PlotKind, PlotOutcome};

use crate::core::Table;
use crate::errors::CollaboratorError;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::path::Path;
use std::sync::Arc;

/// A loaded dataset with its profile text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedData {
    /// The raw table.
    pub table: Table,
    /// Human-readable profile of the table.
    pub profile: String,
}

/// Loads and cleans tabular datasets.
#[cfg_attr(test, automock)]
pub trait DataIngestion: Send + Sync {
    /// Loads the dataset at `path` and profiles it.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or parsed.
    fn load(&self, path: &Path) -> Result<LoadedData, CollaboratorError>;

    /// Returns a cleaned copy of `table`.
    fn clean(&self, table: &Table) -> Table;
}

/// Generates text from a prompt, optionally grounded in search results.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates text for `prompt`. With `grounded`, the generator may
    /// consult external sources and return them with the text.
    ///
    /// # Errors
    ///
    /// Returns an error if the generator is unavailable or the call fails.
    async fn generate(&self, prompt: &str, grounded: bool) -> Result<Generated, CollaboratorError>;
}

/// Produces chart artifacts from a table.
#[cfg_attr(test, automock)]
pub trait Plotter: Send + Sync {
    /// Plots `columns` of `table` as `kind`.
    fn plot(&self, table: &Table, columns: &[String], kind: PlotKind) -> PlotOutcome;
}

/// Runs predictive analysis over a cleaned table.
#[cfg_attr(test, automock)]
pub trait Modeler: Send + Sync {
    /// Analyzes `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be modeled at all.
    fn analyze(&self, table: &Table) -> Result<ModelReport, CollaboratorError>;
}

/// The collaborators one analysis pipeline is wired with.
#[derive(Clone)]
pub struct Collaborators {
    /// Dataset loading and cleaning.
    pub ingestion: Arc<dyn DataIngestion>,
    /// Text generation.
    pub generator: Arc<dyn TextGenerator>,
    /// Chart production.
    pub plotter: Arc<dyn Plotter>,
    /// Predictive analysis.
    pub modeler: Arc<dyn Modeler>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Creates a bundle from its parts.
    #[must_use]
    pub fn new(
        ingestion: Arc<dyn DataIngestion>,
        generator: Arc<dyn TextGenerator>,
        plotter: Arc<dyn Plotter>,
        modeler: Arc<dyn Modeler>,
    ) -> Self {
        Self {
            ingestion,
            generator,
            plotter,
            modeler,
        }
    }

    /// Replaces the text generator.
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Replaces the plotter.
    #[must_use]
    pub fn with_plotter(mut self, plotter: Arc<dyn Plotter>) -> Self {
        self.plotter = plotter;
        self
    }

    /// Replaces the modeler.
    #[must_use]
    pub fn with_modeler(mut self, modeler: Arc<dyn Modeler>) -> Self {
        self.modeler = modeler;
        self
    }
}
