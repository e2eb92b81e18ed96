//! Agent-scoped view over the session context.

use super::{ContextValue, SessionContext};
use crate::errors::ContextError;
use std::sync::Arc;

/// The context handed to one agent invocation.
///
/// Reads go straight to the shared [`SessionContext`]; writes are made in
/// the agent's name so that the single-writer rule is enforced.
#[derive(Debug, Clone)]
pub struct AgentContext {
    session: Arc<SessionContext>,
    agent: String,
}

impl AgentContext {
    /// Creates a view of `session` for the named agent.
    #[must_use]
    pub fn new(session: Arc<SessionContext>, agent: impl Into<String>) -> Self {
        Self {
            session,
            agent: agent.into(),
        }
    }

    /// Returns the agent name.
    #[must_use]
    pub fn agent_name(&self) -> &str {
        &self.agent
    }

    /// Returns the shared session.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Gets a clone of the value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ContextValue> {
        self.session.get(key)
    }

    /// Checks if a key is present.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.session.has(key)
    }

    /// Gets the text under `key`, if the key holds text.
    #[must_use]
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_text().map(str::to_string))
    }

    /// Writes `value` under `key` as this agent.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::OwnershipViolation`] if another agent owns the key.
    pub fn set(&self, key: impl Into<String>, value: impl Into<ContextValue>) -> Result<(), ContextError> {
        self.session.set_as(&self.agent, key, value)
    }

    /// Emits an event tagged with this agent's name.
    pub fn emit(&self, event_type: &str, data: serde_json::Value) {
        self.session.try_emit_event(
            event_type,
            Some(serde_json::json!({ "agent": self.agent, "data": data })),
        );
    }
}
