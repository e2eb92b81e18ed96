//! Core domain model types for insightflow.
//!
//! This module contains the fundamental types used throughout the framework:
//! - Stage modes and run status enums
//! - The agent outcome type with factory methods
//! - Artifact references and the tabular data structure

mod artifact;
mod outcome;
mod status;
mod table;

pub use artifact::ArtifactRef;
pub use outcome::AgentOutcome;
pub use status::{OutcomeStatus, RunStatus, StageMode};
pub use table::{parse_number, Table};
