//! Chart generation agent.

use super::keys::{CLEANED_DF, PLOT_PATHS};
use super::support::{blocking, read_table, settle};
use super::Agent;
use crate::collaborators::{date_column, PlotKind, PlotOutcome, Plotter};
use crate::context::AgentContext;
use crate::core::{AgentOutcome, ArtifactRef, Table};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Asks the plotter for the sales trend and top products charts.
///
/// Charts that do not apply are left out; an empty `plot_paths` is still a
/// success.
#[derive(Clone)]
pub struct VisualizationAgent {
    plotter: Arc<dyn Plotter>,
}

impl VisualizationAgent {
    /// Agent name.
    pub const NAME: &'static str = "visualization";

    /// Creates the agent.
    #[must_use]
    pub fn new(plotter: Arc<dyn Plotter>) -> Self {
        Self { plotter }
    }

    fn requests(table: &Table) -> Vec<(PlotKind, Vec<String>)> {
        let mut requests = Vec::new();
        if let Some(date) = date_column(table) {
            requests.push((PlotKind::SalesOverTime, vec![table.columns[date].clone()]));
        }
        if let Some(product) = table.find_column(&["product", "item"]) {
            requests.push((PlotKind::TopProducts, vec![table.columns[product].clone()]));
        }
        requests
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentOutcome, AgentOutcome> {
        let table = read_table(ctx, CLEANED_DF)?;
        let plotter = self.plotter.clone();

        let artifacts: Vec<ArtifactRef> = blocking(move || {
            let mut artifacts = Vec::new();
            for (kind, columns) in Self::requests(&table) {
                match plotter.plot(&table, &columns, kind) {
                    PlotOutcome::Artifacts(written) => artifacts.extend(written),
                    PlotOutcome::NotApplicable(reason) => debug!(?kind, %reason, "Chart skipped"),
                }
            }
            artifacts
        })
        .await?;

        info!(agent = Self::NAME, plots = artifacts.len(), "Charts generated");
        ctx.set(PLOT_PATHS, artifacts)?;
        Ok(AgentOutcome::ok())
    }
}

impl std::fmt::Debug for VisualizationAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualizationAgent").finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for VisualizationAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn requires(&self) -> Vec<String> {
        vec![CLEANED_DF.to_string()]
    }

    fn produces(&self) -> Vec<String> {
        vec![PLOT_PATHS.to_string()]
    }

    async fn run(&self, ctx: &AgentContext) -> AgentOutcome {
        settle(self.execute(ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{MockPlotter, NullPlotter};
    use crate::context::SessionContext;
    use crate::testing::ScriptedPlotter;
    use pretty_assertions::assert_eq;

    fn context(columns: &[&str]) -> AgentContext {
        let session = Arc::new(SessionContext::default());
        let mut table = Table::new(columns.iter().map(|c| (*c).to_string()).collect());
        table.push_row(vec!["x".into(); columns.len()]);
        session.set(CLEANED_DF, table);
        AgentContext::new(session, VisualizationAgent::NAME)
    }

    #[tokio::test]
    async fn test_requests_both_charts() {
        let plotter = Arc::new(ScriptedPlotter::new());
        let ctx = context(&["OrderDate", "Product", "Price"]);

        let outcome = VisualizationAgent::new(plotter.clone()).run(&ctx).await;

        assert!(outcome.is_success());
        assert_eq!(
            plotter.calls(),
            vec![
                (PlotKind::SalesOverTime, vec!["OrderDate".to_string()]),
                (PlotKind::TopProducts, vec!["Product".to_string()]),
            ]
        );
        assert_eq!(ctx.get(PLOT_PATHS).unwrap().as_artifacts().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_skips_charts_without_columns() {
        let mut plotter = MockPlotter::new();
        plotter.expect_plot().never();
        let ctx = context(&["Store", "Revenue"]);

        let outcome = VisualizationAgent::new(Arc::new(plotter)).run(&ctx).await;

        assert!(outcome.is_success());
        assert!(ctx.get(PLOT_PATHS).unwrap().as_artifacts().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_not_applicable_is_still_success() {
        let ctx = context(&["OrderDate", "Product"]);
        let outcome = VisualizationAgent::new(Arc::new(NullPlotter)).run(&ctx).await;
        assert!(outcome.is_success());
    }
}
