//! References to artifacts written by collaborators.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file produced during a run (plot, forecast series, metrics table).
///
/// The context stores the reference only; the content stays on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// The type of artifact (e.g. "plot", "forecast", "anomalies").
    #[serde(rename = "type")]
    pub kind: String,

    /// Where the artifact was written.
    pub path: PathBuf,

    /// When the artifact was created (ISO 8601).
    pub created_at: String,
}

impl ArtifactRef {
    /// Creates a new artifact reference stamped with the current time.
    #[must_use]
    pub fn new(kind: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            kind: kind.into(),
            path: path.into(),
            created_at: crate::utils::iso_timestamp(),
        }
    }

    /// Returns the artifact path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file name, or the full path if it has none.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}
