//! The shared keyed store of one pipeline run.

use super::{ContextValue, RunIdentity};
use crate::errors::ContextError;
use crate::events::{EventSink, NoOpEventSink};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Shared mutable context threaded through one pipeline run.
///
/// One instance is created per run and handed to every agent behind an
/// `Arc`. Reads are unrestricted. Writes made through an
/// [`AgentContext`](super::AgentContext) are checked against the key's
/// designated writer; a key without a registered writer is claimed by its
/// first writer.
///
/// The map sits behind one coarse `RwLock`: parallel members only ever
/// touch disjoint keys, so the lock is held for single inserts and never
/// contended for long.
pub struct SessionContext {
    run_id: RunIdentity,
    data: RwLock<HashMap<String, ContextValue>>,
    owners: RwLock<HashMap<String, String>>,
    event_sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("run_id", &self.run_id.pipeline_run_id)
            .field("keys", &self.keys())
            .finish_non_exhaustive()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(RunIdentity::new())
    }
}

impl SessionContext {
    /// Creates an empty context for a run.
    #[must_use]
    pub fn new(run_id: RunIdentity) -> Self {
        Self {
            run_id,
            data: RwLock::new(HashMap::new()),
            owners: RwLock::new(HashMap::new()),
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Seeds the context with run inputs.
    #[must_use]
    pub fn with_inputs(self, inputs: impl IntoIterator<Item = (String, ContextValue)>) -> Self {
        self.data.write().extend(inputs);
        self
    }

    /// Returns the run identity.
    #[must_use]
    pub fn run_id(&self) -> &RunIdentity {
        &self.run_id
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Emits an event on the run's sink.
    pub fn try_emit_event(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.event_sink.try_emit(event_type, data);
    }

    /// Gets a clone of the value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ContextValue> {
        self.data.read().get(key).cloned()
    }

    /// Checks if a key is present.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Writes a value without an ownership check.
    ///
    /// Used for run inputs. Agents write through
    /// [`AgentContext::set`](super::AgentContext::set) instead.
    pub fn set(&self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.data.write().insert(key.into(), value.into());
    }

    /// Writes a value on behalf of `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::OwnershipViolation`] if the key is designated
    /// to a different writer.
    pub fn set_as(
        &self,
        writer: &str,
        key: impl Into<String>,
        value: impl Into<ContextValue>,
    ) -> Result<(), ContextError> {
        let key = key.into();
        {
            let mut owners = self.owners.write();
            match owners.get(&key) {
                Some(owner) if owner != writer => {
                    return Err(ContextError::OwnershipViolation {
                        key,
                        owner: owner.clone(),
                        writer: writer.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    owners.insert(key.clone(), writer.to_string());
                }
            }
        }
        self.data.write().insert(key, value.into());
        Ok(())
    }

    /// Registers `owner` as the designated writer of `key`.
    ///
    /// Registering the same owner twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::OwnerConflict`] if another writer holds the key.
    pub fn register_owner(&self, key: impl Into<String>, owner: impl Into<String>) -> Result<(), ContextError> {
        let key = key.into();
        let owner = owner.into();
        let mut owners = self.owners.write();
        match owners.get(&key) {
            Some(existing) if *existing != owner => Err(ContextError::OwnerConflict {
                key,
                owner: existing.clone(),
                requested: owner,
            }),
            Some(_) => Ok(()),
            None => {
                owners.insert(key, owner);
                Ok(())
            }
        }
    }

    /// Returns the designated writer of `key`.
    #[must_use]
    pub fn owner_of(&self, key: &str) -> Option<String> {
        self.owners.read().get(key).cloned()
    }

    /// Removes every value owned by `owner` and returns the removed keys.
    ///
    /// Used to discard the partial state of an agent that timed out.
    pub fn discard_owned_by(&self, owner: &str) -> Vec<String> {
        let owned: Vec<String> = self
            .owners
            .read()
            .iter()
            .filter(|(_, o)| o.as_str() == owner)
            .map(|(k, _)| k.clone())
            .collect();

        let mut data = self.data.write();
        let mut removed: Vec<String> = owned.into_iter().filter(|k| data.remove(k).is_some()).collect();
        removed.sort();
        removed
    }

    /// Returns the required keys that are absent, in the order given.
    #[must_use]
    pub fn missing<'a>(&self, required: impl IntoIterator<Item = &'a String>) -> Vec<String> {
        let data = self.data.read();
        required
            .into_iter()
            .filter(|k| !data.contains_key(k.as_str()))
            .cloned()
            .collect()
    }

    /// Returns all keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if the context is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Returns a JSON view of the whole context with keys in sorted order.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        let data = self.data.read();
        let ordered: BTreeMap<&String, serde_json::Value> = data
            .iter()
            .map(|(k, v)| (k, serde_json::to_value(v).unwrap_or(serde_json::Value::Null)))
            .collect();
        serde_json::to_value(ordered).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_set_has() {
        let ctx = SessionContext::default();
        assert!(!ctx.has("data_path"));

        ctx.set("data_path", "data/sales.csv");
        assert!(ctx.has("data_path"));
        assert_eq!(ctx.get("data_path"), Some(ContextValue::from("data/sales.csv")));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_set_as_claims_unowned_key() {
        let ctx = SessionContext::default();
        ctx.set_as("profiler", "profile_report", "rows: 3").unwrap();
        assert_eq!(ctx.owner_of("profile_report").as_deref(), Some("profiler"));

        let err = ctx.set_as("cleaner", "profile_report", "overwrite").unwrap_err();
        assert!(matches!(err, ContextError::OwnershipViolation { .. }));
        assert_eq!(ctx.get("profile_report"), Some(ContextValue::from("rows: 3")));
    }

    #[test]
    fn test_register_owner_conflict() {
        let ctx = SessionContext::default();
        ctx.register_owner("cleaned_df", "cleaner").unwrap();
        ctx.register_owner("cleaned_df", "cleaner").unwrap();

        let err = ctx.register_owner("cleaned_df", "profiler").unwrap_err();
        assert!(matches!(err, ContextError::OwnerConflict { .. }));
    }

    #[test]
    fn test_discard_owned_by() {
        let ctx = SessionContext::default();
        ctx.register_owner("a", "slow").unwrap();
        ctx.register_owner("b", "slow").unwrap();
        ctx.set_as("slow", "a", "partial").unwrap();
        ctx.set_as("other", "c", "kept").unwrap();

        assert_eq!(ctx.discard_owned_by("slow"), vec!["a".to_string()]);
        assert!(!ctx.has("a"));
        assert!(ctx.has("c"));
    }

    #[test]
    fn test_missing_and_snapshot() {
        let ctx = SessionContext::default().with_inputs([("b".to_string(), ContextValue::from("2"))]);
        ctx.set("a", "1");

        let required = vec!["a".to_string(), "x".to_string()];
        assert_eq!(ctx.missing(&required), vec!["x".to_string()]);

        let snapshot = ctx.snapshot();
        assert_eq!(ctx.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(snapshot["a"]["value"], "1");
    }
}
