//! Predictive analysis agent.

use super::keys::{CLEANED_DF, ML_REPORTS};
use super::support::{blocking, read_table, settle};
use super::Agent;
use crate::collaborators::Modeler;
use crate::context::AgentContext;
use crate::core::AgentOutcome;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Runs the modeler over the cleaned data and stores its report.
///
/// Individual analyses that do not apply are recorded as not available
/// inside the report. Only a modeler that cannot run at all fails the agent.
#[derive(Clone)]
pub struct MlAgent {
    modeler: Arc<dyn Modeler>,
}

impl MlAgent {
    /// Agent name.
    pub const NAME: &'static str = "ml";

    /// Creates the agent.
    #[must_use]
    pub fn new(modeler: Arc<dyn Modeler>) -> Self {
        Self { modeler }
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentOutcome, AgentOutcome> {
        let table = read_table(ctx, CLEANED_DF)?;
        let modeler = self.modeler.clone();
        let report = blocking(move || modeler.analyze(&table))
            .await?
            .map_err(|e| AgentOutcome::fault(format!("modeling failed: {e}")))?;

        info!(agent = Self::NAME, artifacts = report.artifacts().len(), "Models evaluated");
        let report = serde_json::to_value(&report).map_err(|e| AgentOutcome::fault(e.to_string()))?;
        ctx.set(ML_REPORTS, report)?;
        Ok(AgentOutcome::ok())
    }
}

impl std::fmt::Debug for MlAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MlAgent").finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for MlAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn requires(&self) -> Vec<String> {
        vec![CLEANED_DF.to_string()]
    }

    fn produces(&self) -> Vec<String> {
        vec![ML_REPORTS.to_string()]
    }

    async fn run(&self, ctx: &AgentContext) -> AgentOutcome {
        settle(self.execute(ctx).await)
    }
}
