//! Dataset loading and cleaning agents.

use super::keys::{CLEANED_DF, DATA_PATH, PROFILE_REPORT, RAW_DF};
use super::support::{blocking, read_table, settle};
use super::Agent;
use crate::collaborators::DataIngestion;
use crate::context::AgentContext;
use crate::core::AgentOutcome;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Loads the dataset at `data_path` and profiles it.
#[derive(Clone)]
pub struct ProfilerAgent {
    ingestion: Arc<dyn DataIngestion>,
}

impl ProfilerAgent {
    /// Agent name.
    pub const NAME: &'static str = "data_profiler";

    /// Creates the agent.
    #[must_use]
    pub fn new(ingestion: Arc<dyn DataIngestion>) -> Self {
        Self { ingestion }
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentOutcome, AgentOutcome> {
        let path = ctx
            .get_text(DATA_PATH)
            .map(PathBuf::from)
            .ok_or_else(|| AgentOutcome::fault(format!("'{DATA_PATH}' must hold a path")))?;

        let ingestion = self.ingestion.clone();
        let source = path.clone();
        let loaded = blocking(move || ingestion.load(&source))
            .await?
            .map_err(|e| AgentOutcome::fault(format!("could not load {}: {e}", path.display())))?;

        info!(rows = loaded.table.len(), "Dataset profiled");
        ctx.set(RAW_DF, loaded.table)?;
        ctx.set(PROFILE_REPORT, loaded.profile)?;
        Ok(AgentOutcome::ok())
    }
}

impl std::fmt::Debug for ProfilerAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilerAgent").finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for ProfilerAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn requires(&self) -> Vec<String> {
        vec![DATA_PATH.to_string()]
    }

    fn produces(&self) -> Vec<String> {
        vec![RAW_DF.to_string(), PROFILE_REPORT.to_string()]
    }

    async fn run(&self, ctx: &AgentContext) -> AgentOutcome {
        settle(self.execute(ctx).await)
    }
}

/// Cleans the raw dataset. Fails when nothing survives cleaning.
#[derive(Clone)]
pub struct CleanerAgent {
    ingestion: Arc<dyn DataIngestion>,
}

impl CleanerAgent {
    /// Agent name.
    pub const NAME: &'static str = "data_cleaner";

    /// Creates the agent.
    #[must_use]
    pub fn new(ingestion: Arc<dyn DataIngestion>) -> Self {
        Self { ingestion }
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentOutcome, AgentOutcome> {
        let raw = read_table(ctx, RAW_DF)?;
        let original_rows = raw.len();

        let ingestion = self.ingestion.clone();
        let cleaned = blocking(move || ingestion.clean(&raw)).await?;
        if cleaned.is_empty() {
            return Err(AgentOutcome::fault(format!("no rows left after cleaning {original_rows} rows")));
        }

        info!(original_rows, cleaned_rows = cleaned.len(), "Dataset cleaned");
        ctx.set(CLEANED_DF, cleaned)?;
        Ok(AgentOutcome::ok())
    }
}

impl std::fmt::Debug for CleanerAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanerAgent").finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for CleanerAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn requires(&self) -> Vec<String> {
        vec![RAW_DF.to_string()]
    }

    fn produces(&self) -> Vec<String> {
        vec![CLEANED_DF.to_string()]
    }

    async fn run(&self, ctx: &AgentContext) -> AgentOutcome {
        settle(self.execute(ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CsvIngestion, MockDataIngestion};
    use crate::context::SessionContext;
    use crate::core::Table;
    use crate::errors::{CollaboratorError, ErrorKind};
    use crate::testing::sample_sales_csv;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn context(agent: &str) -> AgentContext {
        AgentContext::new(Arc::new(SessionContext::default()), agent)
    }

    #[tokio::test]
    async fn test_profiler_loads_dataset() {
        let dir = tempdir().unwrap();
        let ctx = context(ProfilerAgent::NAME);
        ctx.session().set(DATA_PATH, sample_sales_csv(dir.path()).display().to_string());

        let outcome = ProfilerAgent::new(Arc::new(CsvIngestion::new())).run(&ctx).await;

        assert!(outcome.is_success());
        assert_eq!(ctx.get(RAW_DF).unwrap().as_table().unwrap().len(), 10);
        assert!(ctx.get_text(PROFILE_REPORT).unwrap().contains("Data Profile Report"));
    }

    #[tokio::test]
    async fn test_profiler_unreadable_source_fails() {
        let mut ingestion = MockDataIngestion::new();
        ingestion
            .expect_load()
            .returning(|_| Err(CollaboratorError::failed("csv_ingestion", "permission denied")));
        let ctx = context(ProfilerAgent::NAME);
        ctx.session().set(DATA_PATH, "/data/sales.csv");

        let outcome = ProfilerAgent::new(Arc::new(ingestion)).run(&ctx).await;

        assert_eq!(outcome.error_kind, Some(ErrorKind::AgentFault));
        assert!(outcome.describe().contains("permission denied"));
        assert!(!ctx.has(PROFILE_REPORT));
    }

    #[tokio::test]
    async fn test_cleaner_writes_cleaned_table() {
        let mut ingestion = MockDataIngestion::new();
        ingestion.expect_clean().times(1).returning(|table| {
            let mut cleaned = Table::new(table.columns.clone());
            cleaned.push_row(vec!["kept".into()]);
            cleaned
        });
        let ctx = context(CleanerAgent::NAME);
        ctx.session().set(RAW_DF, Table::new(vec!["a".into()]));

        let outcome = CleanerAgent::new(Arc::new(ingestion)).run(&ctx).await;

        assert!(outcome.is_success());
        assert_eq!(ctx.get(CLEANED_DF).unwrap().as_table().unwrap().rows, vec![vec!["kept".to_string()]]);
    }

    #[tokio::test]
    async fn test_cleaner_fails_on_empty_result() {
        let mut ingestion = MockDataIngestion::new();
        ingestion.expect_clean().returning(|_| Table::default());
        let ctx = context(CleanerAgent::NAME);
        ctx.session().set(RAW_DF, Table::new(vec!["a".into()]));

        let outcome = CleanerAgent::new(Arc::new(ingestion)).run(&ctx).await;
        assert!(outcome.is_failure());
        assert!(!ctx.has(CLEANED_DF));
    }
}
