//! Memory records and the on-disk document.

use crate::utils::iso_timestamp;
use serde::{Deserialize, Serialize};

/// One finding persisted across runs. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// When the record was written. Older stores call this `date`.
    #[serde(alias = "date")]
    pub timestamp: String,
    /// The agent that wrote the record.
    #[serde(default)]
    pub source: String,
    /// The insight text.
    pub insight: String,
}

impl MemoryRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(insight: impl Into<String>, source: impl Into<String>) -> Self {
        Self::at(insight, source, iso_timestamp())
    }

    /// Creates a record with an explicit timestamp.
    #[must_use]
    pub fn at(insight: impl Into<String>, source: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            source: source.into(),
            insight: insight.into(),
        }
    }

    /// Renders the record as one prompt line: `- <timestamp>: <insight>`.
    #[must_use]
    pub fn as_prompt_line(&self) -> String {
        format!("- {}: {}", self.timestamp, self.insight)
    }
}

/// The JSON document stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MemoryDocument {
    pub(crate) past_insights: Vec<MemoryRecord>,
}
