//! Error types for the insightflow framework.
//!
//! Two layers live here. [`ErrorKind`] is the taxonomy an agent reports
//! through its [`AgentOutcome`](crate::core::AgentOutcome); the `thiserror`
//! types below are what fallible library calls return.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for insightflow operations.
#[derive(Debug, Error)]
pub enum InsightflowError {
    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A session context write was rejected.
    #[error("{0}")]
    Context(#[from] ContextError),

    /// The memory bank could not be read or written.
    #[error("{0}")]
    MemoryBank(#[from] MemoryBankError),

    /// An external collaborator signalled a failure.
    #[error("{0}")]
    Collaborator(#[from] CollaboratorError),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure categories an agent can report.
///
/// The orchestrator does not branch on the kind; it only carries it into
/// the run result and the terminal report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required context key was absent when the agent was due to run.
    MissingPrecondition,
    /// The agent's own work failed, panicked or timed out.
    AgentFault,
    /// A collaborator returned a recognised failure signal.
    ExternalServiceError,
    /// The memory bank could not be read or written.
    PersistenceError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPrecondition => write!(f, "missing precondition"),
            Self::AgentFault => write!(f, "agent fault"),
            Self::ExternalServiceError => write!(f, "external service error"),
            Self::PersistenceError => write!(f, "persistence error"),
        }
    }
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONTRACT-OVERLAP").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when pipeline validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Errors raised by the session context.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    /// An agent tried to write a key designated to another writer.
    #[error("Ownership violation: '{writer}' attempted to write '{key}' which is owned by '{owner}'")]
    OwnershipViolation {
        /// The key being written.
        key: String,
        /// The designated writer.
        owner: String,
        /// The agent that attempted the write.
        writer: String,
    },

    /// Two writers were registered for the same key.
    #[error("Key '{key}' already has designated writer '{owner}', cannot assign '{requested}'")]
    OwnerConflict {
        /// The key.
        key: String,
        /// The writer already registered.
        owner: String,
        /// The writer that was refused.
        requested: String,
    },
}

/// Errors from the persisted memory bank.
#[derive(Debug, Error)]
pub enum MemoryBankError {
    /// Filesystem failure while reading or writing the store.
    #[error("Memory bank IO error at {path}: {source}")]
    Io {
        /// The store path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The store could not be serialized.
    #[error("Memory bank serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another writer held the store lock for too long.
    #[error("Timed out waiting for memory bank lock at {0}")]
    LockTimeout(PathBuf),
}

impl MemoryBankError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure signals from external collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The collaborator is not configured (e.g. missing API key).
    #[error("{collaborator} is not configured: {reason}")]
    Unavailable {
        /// Which collaborator.
        collaborator: String,
        /// Why it is unavailable.
        reason: String,
    },

    /// The collaborator ran and reported a failure.
    #[error("{collaborator} failed: {message}")]
    Failed {
        /// Which collaborator.
        collaborator: String,
        /// The failure message.
        message: String,
    },

    /// The input could not be used by the collaborator.
    #[error("Invalid input for {collaborator}: {message}")]
    InvalidInput {
        /// Which collaborator.
        collaborator: String,
        /// What was wrong.
        message: String,
    },
}

impl CollaboratorError {
    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(collaborator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            collaborator: collaborator.into(),
            reason: reason.into(),
        }
    }

    /// Creates a failed error.
    #[must_use]
    pub fn failed(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// The config path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`PipelineConfig`](crate::config::PipelineConfig).
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        /// The config path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("Invalid config value for '{field}': {message}")]
    Invalid {
        /// The offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Provides default suggestions for pipeline contract error codes.
pub struct ContractSuggestions;

impl ContractSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "CONTRACT-OVERLAP" => Some(
                "Agents in one parallel stage write concurrently. \
                 Give each member its own output keys or move one into a sequential stage.",
            ),
            "CONTRACT-DUPLICATE-WRITER" => Some(
                "Every context key has exactly one designated writer. \
                 Rename one of the keys or merge the producing agents.",
            ),
            "CONTRACT-UNSATISFIED" => Some(
                "A required key must be produced by an earlier stage or supplied as a run input. \
                 Reorder the stages or declare the key as an input.",
            ),
            "CONTRACT-EMPTY" => Some("Add at least one stage with at least one agent."),
            "CONTRACT-NO-TERMINAL" => Some(
                "Every pipeline emits one terminal artifact. Register a terminal agent.",
            ),
            _ => None,
        }
    }
}
