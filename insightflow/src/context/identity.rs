//! Run identity for tracking pipeline executions.

use crate::utils::Timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this pipeline run.
    pub pipeline_run_id: Uuid,

    /// The pipeline that owns the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_name: Option<String>,

    /// When the run started.
    pub started_at: Timestamp,
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl RunIdentity {
    /// Creates a new run identity with a time-ordered run ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipeline_run_id: Uuid::now_v7(),
            pipeline_name: None,
            started_at: Utc::now(),
        }
    }

    /// Sets the pipeline name.
    #[must_use]
    pub fn with_pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = Some(name.into());
        self
    }
}
