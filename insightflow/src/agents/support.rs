//! Helpers shared by the analysis agents.

use crate::context::AgentContext;
use crate::core::{AgentOutcome, Table};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reads the table under `key`.
pub(crate) fn read_table(ctx: &AgentContext, key: &str) -> Result<Table, AgentOutcome> {
    match ctx.get(key) {
        Some(value) => value
            .as_table()
            .cloned()
            .ok_or_else(|| AgentOutcome::fault(format!("'{key}' holds {}, expected a table", value.type_name()))),
        None => Err(AgentOutcome::missing_precondition(&[key.to_string()])),
    }
}

/// Runs blocking collaborator work off the async workers.
pub(crate) async fn blocking<T, F>(task: F) -> Result<T, AgentOutcome>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AgentOutcome::fault(format!("blocking task failed: {e}")))
}

/// Sets its flag when dropped while armed.
///
/// An agent future dropped by a timeout cannot stop a blocking task it has
/// already spawned; the task reads the flag instead.
#[derive(Debug)]
pub(crate) struct CancelOnDrop {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl CancelOnDrop {
    pub(crate) fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            armed: true,
        }
    }

    pub(crate) fn flag(&self) -> Arc<AtomicBool> {
        self.flag.clone()
    }

    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::Release);
        }
    }
}

/// Folds an agent body written with `?` into its outcome.
pub(crate) fn settle(result: Result<AgentOutcome, AgentOutcome>) -> AgentOutcome {
    result.unwrap_or_else(|outcome| outcome)
}
