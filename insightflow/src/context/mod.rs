//! Context management for pipeline execution.
//!
//! This module provides:
//! - The per-run [`SessionContext`] shared by every agent of one run
//! - The agent-scoped [`AgentContext`] view that enforces key ownership
//! - Opaque [`ContextValue`]s and the [`RunIdentity`] of a run

mod agent;
mod identity;
mod session;
mod value;

pub use agent::AgentContext;
pub use identity::RunIdentity;
pub use session::SessionContext;
pub use value::ContextValue;
