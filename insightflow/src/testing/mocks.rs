//! Mock agents for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::agents::Agent;
use crate::context::AgentContext;
use crate::core::AgentOutcome;
use crate::errors::ErrorKind;

/// A mock agent that counts calls and returns a configurable outcome.
#[derive(Debug)]
pub struct MockAgent {
    name: String,
    requires: Vec<String>,
    produces: Vec<String>,
    outcome: Mutex<AgentOutcome>,
    call_count: AtomicUsize,
}

impl MockAgent {
    /// Creates a new mock agent that succeeds.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
            produces: Vec::new(),
            outcome: Mutex::new(AgentOutcome::ok()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Declares required keys.
    #[must_use]
    pub fn requiring(mut self, keys: &[&str]) -> Self {
        self.requires = keys.iter().map(|k| (*k).to_string()).collect();
        self
    }

    /// Declares produced keys. The mock writes each of them on success.
    #[must_use]
    pub fn producing(mut self, keys: &[&str]) -> Self {
        self.produces = keys.iter().map(|k| (*k).to_string()).collect();
        self
    }

    /// Sets the outcome to return.
    pub fn set_outcome(&self, outcome: AgentOutcome) {
        *self.outcome.lock() = outcome;
    }

    /// Returns the number of times the agent ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires(&self) -> Vec<String> {
        self.requires.clone()
    }

    fn produces(&self) -> Vec<String> {
        self.produces.clone()
    }

    async fn run(&self, ctx: &AgentContext) -> AgentOutcome {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcome.lock().clone();
        if outcome.is_success() {
            for key in &self.produces {
                if let Err(e) = ctx.set(key.clone(), format!("{} output", self.name)) {
                    return AgentOutcome::fault(e.to_string());
                }
            }
        }
        outcome
    }
}

/// An agent that writes one text value under one key.
#[derive(Debug)]
pub struct WriterAgent {
    name: String,
    key: String,
    value: String,
}

impl WriterAgent {
    /// Creates a new writer agent.
    #[must_use]
    pub fn new(name: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
impl Agent for WriterAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn produces(&self) -> Vec<String> {
        vec![self.key.clone()]
    }

    async fn run(&self, ctx: &AgentContext) -> AgentOutcome {
        match ctx.set(self.key.clone(), self.value.clone()) {
            Ok(()) => AgentOutcome::ok(),
            Err(e) => AgentOutcome::fault(e.to_string()),
        }
    }
}

/// An agent that always fails with the given kind.
#[derive(Debug)]
pub struct FailingAgent {
    name: String,
    kind: ErrorKind,
    message: String,
}

impl FailingAgent {
    /// Creates a failing agent reporting an agent fault.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_kind(name, ErrorKind::AgentFault, message)
    }

    /// Creates a failing agent reporting the given kind.
    #[must_use]
    pub fn with_kind(name: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            message: message.into(),
        }
    }
}

#[async_trait]
impl Agent for FailingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: &AgentContext) -> AgentOutcome {
        AgentOutcome::fail(self.kind, &self.message)
    }
}

/// An agent that panics when run.
#[derive(Debug)]
pub struct PanickingAgent {
    name: String,
    message: String,
}

impl PanickingAgent {
    /// Creates a new panicking agent.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Agent for PanickingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: &AgentContext) -> AgentOutcome {
        panic!("{}", self.message);
    }
}

/// An agent that sleeps before succeeding.
#[derive(Debug)]
pub struct SlowAgent {
    name: String,
    delay: Duration,
    early_write: Option<String>,
}

impl SlowAgent {
    /// Creates a new slow agent.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            early_write: None,
        }
    }

    /// Creates a slow agent with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(name: impl Into<String>, ms: u64) -> Self {
        Self::new(name, Duration::from_millis(ms))
    }

    /// Writes `key` before sleeping, to observe partial-write rollback.
    #[must_use]
    pub fn writing_first(mut self, key: impl Into<String>) -> Self {
        self.early_write = Some(key.into());
        self
    }
}

#[async_trait]
impl Agent for SlowAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn produces(&self) -> Vec<String> {
        self.early_write.iter().cloned().collect()
    }

    async fn run(&self, ctx: &AgentContext) -> AgentOutcome {
        if let Some(key) = &self.early_write {
            if let Err(e) = ctx.set(key.clone(), "partial") {
                return AgentOutcome::fault(e.to_string());
            }
        }
        tokio::time::sleep(self.delay).await;
        AgentOutcome::ok()
    }
}

/// An agent that appends its name to a shared log when run.
#[derive(Debug)]
pub struct RecordingAgent {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingAgent {
    /// Creates a new recording agent writing to `log`.
    #[must_use]
    pub fn new(name: impl Into<String>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }
}

#[async_trait]
impl Agent for RecordingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: &AgentContext) -> AgentOutcome {
        self.log.lock().push(self.name.clone());
        AgentOutcome::ok()
    }
}
