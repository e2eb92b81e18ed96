//! Strategic recommendation agent.

use super::keys::{EXTERNAL_CONTEXT, INTERNAL_INSIGHTS, ML_REPORTS, RECOMMENDATION_REPORT};
use super::support::settle;
use super::Agent;
use crate::collaborators::TextGenerator;
use crate::context::AgentContext;
use crate::core::AgentOutcome;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

const UNAVAILABLE: &str = "N/A (data unavailable)";

/// Synthesizes recommendations from the model report, the insights and the
/// external context.
///
/// When generation fails, a template naming the available model outputs is
/// written instead.
#[derive(Clone)]
pub struct RecommendationAgent {
    generator: Arc<dyn TextGenerator>,
}

impl RecommendationAgent {
    /// Agent name.
    pub const NAME: &'static str = "recommendation";

    /// Creates the agent.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn section(ctx: &AgentContext, key: &str) -> String {
        ctx.get(key).map_or_else(|| UNAVAILABLE.to_string(), |value| value.render())
    }

    fn fallback(ml_reports: &str) -> String {
        format!(
            "Automated recommendations could not be generated. Review the model outputs \
             directly before acting:\n\n{ml_reports}\n\n\
             1. **Demand Focus:** prioritize the categories with a positive demand trend.\n\
             2. **Risk Mitigation:** review the transactions flagged as anomalies.\n\
             3. **Future Planning:** compare the sales forecast with current stock levels."
        )
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentOutcome, AgentOutcome> {
        if !ctx.has(ML_REPORTS) {
            ctx.set(
                RECOMMENDATION_REPORT,
                "ML results were unavailable, unable to provide data-driven recommendations.",
            )?;
            return Err(AgentOutcome::missing_precondition(&[ML_REPORTS.to_string()]));
        }
        let ml_reports = Self::section(ctx, ML_REPORTS);

        let prompt = format!(
            "You are a strategy consultant. Using the analysis below, propose three specific, \
             actionable business recommendations.\n\n\
             **MODEL OUTPUTS:**\n{ml_reports}\n\n\
             **INTERNAL INSIGHTS:**\n{}\n\n\
             **EXTERNAL CONTEXT:**\n{}\n",
            Self::section(ctx, INTERNAL_INSIGHTS),
            Self::section(ctx, EXTERNAL_CONTEXT),
        );

        match self.generator.generate(&prompt, false).await {
            Ok(generated) => {
                ctx.set(RECOMMENDATION_REPORT, generated.text())?;
                Ok(AgentOutcome::ok())
            }
            Err(e) => {
                warn!(agent = Self::NAME, error = %e, "Recommendation generation failed; using template");
                ctx.set(RECOMMENDATION_REPORT, Self::fallback(&ml_reports))?;
                Ok(AgentOutcome::degraded(e.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for RecommendationAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationAgent").finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for RecommendationAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn requires(&self) -> Vec<String> {
        vec![ML_REPORTS.to_string()]
    }

    fn produces(&self) -> Vec<String> {
        vec![RECOMMENDATION_REPORT.to_string()]
    }

    async fn run(&self, ctx: &AgentContext) -> AgentOutcome {
        settle(self.execute(ctx).await)
    }
}
