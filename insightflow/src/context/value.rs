//! Opaque values stored in the session context.

use crate::core::{ArtifactRef, Table};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A value held under one context key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContextValue {
    /// Free text (profiles, generated insights, paths).
    Text(String),
    /// Tabular data.
    Table(Table),
    /// A structured report.
    Report(serde_json::Value),
    /// References to files written by collaborators.
    Artifacts(Vec<ArtifactRef>),
    /// Generated text with the sources it was grounded on.
    Grounded {
        /// The generated text.
        text: String,
        /// Source references.
        sources: Vec<String>,
    },
}

impl ContextValue {
    /// Returns the text of a `Text` or `Grounded` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::Grounded { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Returns the table of a `Table` value.
    #[must_use]
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Returns the JSON of a `Report` value.
    #[must_use]
    pub fn as_report(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Report(report) => Some(report),
            _ => None,
        }
    }

    /// Returns the references of an `Artifacts` value.
    #[must_use]
    pub fn as_artifacts(&self) -> Option<&[ArtifactRef]> {
        match self {
            Self::Artifacts(artifacts) => Some(artifacts),
            _ => None,
        }
    }

    /// Returns a short name for the value's variant.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Table(_) => "table",
            Self::Report(_) => "report",
            Self::Artifacts(_) => "artifacts",
            Self::Grounded { .. } => "grounded",
        }
    }

    /// Renders the value as Markdown-friendly text for prompts and reports.
    ///
    /// Tables are cut to their first ten rows.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Table(table) => table.head_markdown(10),
            Self::Report(report) => {
                serde_json::to_string_pretty(report).unwrap_or_else(|_| report.to_string())
            }
            Self::Artifacts(artifacts) => {
                if artifacts.is_empty() {
                    return "(none)".to_string();
                }
                let mut out = String::new();
                for artifact in artifacts {
                    let _ = writeln!(out, "- {} ({})", artifact.path.display(), artifact.kind);
                }
                out
            }
            Self::Grounded { text, sources } => {
                let mut out = text.clone();
                if !sources.is_empty() {
                    out.push_str("\n\nSources:\n");
                    for source in sources {
                        let _ = writeln!(out, "- {source}");
                    }
                }
                out
            }
        }
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Table> for ContextValue {
    fn from(value: Table) -> Self {
        Self::Table(value)
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Report(value)
    }
}

impl From<Vec<ArtifactRef>> for ContextValue {
    fn from(value: Vec<ArtifactRef>) -> Self {
        Self::Artifacts(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let text = ContextValue::from("hello");
        assert_eq!(text.as_text(), Some("hello"));
        assert!(text.as_table().is_none());

        let grounded = ContextValue::Grounded {
            text: "market grows".to_string(),
            sources: vec!["https://example.com".to_string()],
        };
        assert_eq!(grounded.as_text(), Some("market grows"));
        assert_eq!(grounded.type_name(), "grounded");
    }

    #[test]
    fn test_render_grounded_lists_sources() {
        let grounded = ContextValue::Grounded {
            text: "market grows".to_string(),
            sources: vec!["https://example.com".to_string()],
        };
        let rendered = grounded.render();
        assert!(rendered.starts_with("market grows"));
        assert!(rendered.contains("- https://example.com"));
    }

    #[test]
    fn test_render_empty_artifacts() {
        assert_eq!(ContextValue::Artifacts(Vec::new()).render(), "(none)");
    }

    #[test]
    fn test_serialization_is_tagged() {
        let json = serde_json::to_value(ContextValue::from("x")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text", "value": "x"}));
    }
}
