//! Generated text and the fallback generator.

use super::TextGenerator;
use crate::context::ContextValue;
use crate::errors::CollaboratorError;
use async_trait::async_trait;

/// Text returned by a [`TextGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    /// Plain generated text.
    Text(String),
    /// Text grounded in external sources.
    Grounded {
        /// The generated text.
        text: String,
        /// The sources consulted.
        sources: Vec<String>,
    },
}

impl Generated {
    /// Returns the generated text.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Grounded { text, .. } => text,
        }
    }
}

impl From<Generated> for ContextValue {
    fn from(generated: Generated) -> Self {
        match generated {
            Generated::Text(text) => Self::Text(text),
            Generated::Grounded { text, sources } => Self::Grounded { text, sources },
        }
    }
}

/// Generator used when no model is configured. Every call fails with
/// [`CollaboratorError::Unavailable`], which agents degrade on.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredGenerator {
    reason: String,
}

impl UnconfiguredGenerator {
    /// Creates a generator that reports `reason` on every call.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    /// The generator for a missing `GEMINI_API_KEY`.
    #[must_use]
    pub fn missing_api_key() -> Self {
        Self::new("GEMINI_API_KEY is not set")
    }
}

#[async_trait]
impl TextGenerator for UnconfiguredGenerator {
    async fn generate(&self, _prompt: &str, _grounded: bool) -> Result<Generated, CollaboratorError> {
        Err(CollaboratorError::unavailable("text_generator", self.reason.clone()))
    }
}
