//! Generated insight agents: internal findings backed by long-term memory,
//! and grounded external market context.

use super::keys::{CLEANED_DF, EXTERNAL_CONTEXT, INTERNAL_INSIGHTS, PROFILE_REPORT};
use super::support::{blocking, read_table, settle, CancelOnDrop};
use super::Agent;
use crate::collaborators::TextGenerator;
use crate::context::{AgentContext, ContextValue};
use crate::core::{AgentOutcome, Table};
use crate::memory::MemoryBank;
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Number of past insights quoted in the prompt.
pub const MEMORY_WINDOW: usize = 3;

const NO_PAST_INSIGHTS: &str = "No past analysis found.";
const SNAPSHOT_ROWS: usize = 5;
const MAX_CATEGORIES: usize = 5;

/// Generates internal insights from the cleaned data, comparing against
/// the last few runs' insights, and appends the new insight to memory.
///
/// A generator failure is degraded to a placeholder; the placeholder is not
/// remembered. A memory write failure is logged and otherwise ignored. If
/// the agent is cut off before the memory write takes the store lock, the
/// insight is not remembered; once the lock is held the write completes.
#[derive(Clone)]
pub struct InternalInsightsAgent {
    generator: Arc<dyn TextGenerator>,
    memory: MemoryBank,
}

impl InternalInsightsAgent {
    /// Agent name.
    pub const NAME: &'static str = "internal_insights";

    /// Creates the agent.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, memory: MemoryBank) -> Self {
        Self { generator, memory }
    }

    fn prompt(past: &str, profile: &str, snapshot: &str) -> String {
        format!(
            "You are an expert internal data analyst. Generate 3 key insights.\n\n\
             **PAST INSIGHTS (for context/comparison):**\n{past}\n\n\
             **CURRENT DATA:**\n{profile}\n{snapshot}\n\
             Based on the CURRENT DATA (and considering the past trends), provide three \
             professional, actionable internal insights."
        )
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentOutcome, AgentOutcome> {
        let cleaned = read_table(ctx, CLEANED_DF)?;
        let profile = ctx
            .get_text(PROFILE_REPORT)
            .ok_or_else(|| AgentOutcome::missing_precondition(&[PROFILE_REPORT.to_string()]))?;

        let memory = self.memory.clone();
        let past = blocking(move || memory.recent(MEMORY_WINDOW)).await?;
        let past = if past.is_empty() {
            NO_PAST_INSIGHTS.to_string()
        } else {
            past.iter().map(|r| r.as_prompt_line()).collect::<Vec<_>>().join("\n")
        };

        let prompt = Self::prompt(&past, &profile, &cleaned.head_markdown(SNAPSHOT_ROWS));
        let insights = match self.generator.generate(&prompt, false).await {
            Ok(generated) => generated.text().to_string(),
            Err(e) => {
                warn!(agent = Self::NAME, error = %e, "Insight generation failed; using placeholder");
                ctx.set(INTERNAL_INSIGHTS, format!("Internal insights unavailable: {e}"))?;
                return Ok(AgentOutcome::degraded(e.to_string()));
            }
        };

        let memory = self.memory.clone();
        let remembered = insights.clone();
        let cancel = CancelOnDrop::new();
        let cancelled = cancel.flag();
        let written = blocking(move || memory.write_unless_cancelled(remembered, Self::NAME, &cancelled)).await?;
        cancel.disarm();
        match written {
            Ok(Some(record)) => info!(agent = Self::NAME, timestamp = %record.timestamp, "Insight remembered"),
            Ok(None) => {}
            Err(e) => warn!(agent = Self::NAME, error = %e, "Could not persist insight to memory"),
        }

        ctx.set(INTERNAL_INSIGHTS, insights)?;
        Ok(AgentOutcome::ok())
    }
}

impl std::fmt::Debug for InternalInsightsAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalInsightsAgent")
            .field("memory", &self.memory.path())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for InternalInsightsAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn requires(&self) -> Vec<String> {
        vec![CLEANED_DF.to_string(), PROFILE_REPORT.to_string()]
    }

    fn produces(&self) -> Vec<String> {
        vec![INTERNAL_INSIGHTS.to_string()]
    }

    async fn run(&self, ctx: &AgentContext) -> AgentOutcome {
        settle(self.execute(ctx).await)
    }
}

/// Searches for market context around the dataset's categories.
#[derive(Clone)]
pub struct ExternalContextAgent {
    generator: Arc<dyn TextGenerator>,
}

impl ExternalContextAgent {
    /// Agent name.
    pub const NAME: &'static str = "external_context";

    /// Creates the agent.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Builds the search query from the category column, if the table has one.
    #[must_use]
    pub fn query(table: Option<&Table>, year: i32) -> String {
        let categories: BTreeSet<&str> = table
            .and_then(|t| t.find_column(&["category"]).map(|i| (t, i)))
            .map(|(t, i)| t.column(i).map(str::trim).filter(|c| !c.is_empty()).collect())
            .unwrap_or_default();

        if categories.is_empty() {
            format!("Current retail market trends {year}")
        } else {
            let named: Vec<&str> = categories.into_iter().take(MAX_CATEGORIES).collect();
            format!(
                "Current market trends for {} industries {year}",
                named.join(" and ").to_lowercase()
            )
        }
    }

    async fn execute(&self, ctx: &AgentContext) -> Result<AgentOutcome, AgentOutcome> {
        if !ctx.has(PROFILE_REPORT) {
            return Err(AgentOutcome::missing_precondition(&[PROFILE_REPORT.to_string()]));
        }
        let cleaned = ctx.get(CLEANED_DF);
        let query = Self::query(cleaned.as_ref().and_then(ContextValue::as_table), Utc::now().year());
        info!(agent = Self::NAME, %query, "Searching external context");

        let prompt = format!(
            "Search for: {query}\n\nSummarize the findings most relevant to a business analyst \
             in a few short paragraphs."
        );
        match self.generator.generate(&prompt, true).await {
            Ok(generated) => {
                ctx.set(EXTERNAL_CONTEXT, generated)?;
                Ok(AgentOutcome::ok())
            }
            Err(e) => {
                warn!(agent = Self::NAME, error = %e, "External search failed; using placeholder");
                ctx.set(EXTERNAL_CONTEXT, format!("External market context unavailable: {e}"))?;
                Ok(AgentOutcome::degraded(e.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for ExternalContextAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalContextAgent").finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for ExternalContextAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn requires(&self) -> Vec<String> {
        vec![PROFILE_REPORT.to_string()]
    }

    fn produces(&self) -> Vec<String> {
        vec![EXTERNAL_CONTEXT.to_string()]
    }

    async fn run(&self, ctx: &AgentContext) -> AgentOutcome {
        settle(self.execute(ctx).await)
    }
}
