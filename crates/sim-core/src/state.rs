//! Per-stream mutable state.

use crate::values::{Record, Value};
use std::collections::HashMap;

/// Mutable key/value state owned by exactly one stream.
///
/// Generator functions read and write arbitrary keys (sequence cursors,
/// stateful values) while a record is being built, and the scheduler calls
/// [`StateStore::update`] once per tick after the record is final. A store is
/// never shared between streams, so no synchronization is involved.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    values: HashMap<String, Value>,
    last_record: Option<Record>,
}

impl StateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded from an initial snapshot.
    pub fn with_initial<I>(initial: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            values: initial.into_iter().collect(),
            last_record: None,
        }
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Set a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Check whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of keys (the last record is not counted).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no keys are set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Record the outcome of a tick.
    pub fn update(&mut self, record: &Record) {
        self.last_record = Some(record.clone());
    }

    /// The record of the most recent tick, if any tick completed.
    pub fn last_record(&self) -> Option<&Record> {
        self.last_record.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_snapshot() {
        let state = StateStore::with_initial([("counter".to_string(), Value::Int(10))]);
        assert_eq!(state.get("counter"), Some(&Value::Int(10)));
        assert!(state.last_record().is_none());
    }

    #[test]
    fn test_update_keeps_latest_record() {
        let mut state = StateStore::new();

        let mut first = Record::new();
        first.insert("n", Value::Int(1));
        state.update(&first);

        let mut second = Record::new();
        second.insert("n", Value::Int(2));
        state.update(&second);

        assert_eq!(state.last_record(), Some(&second));
        assert!(state.is_empty());
    }

    #[test]
    fn test_set_and_remove() {
        let mut state = StateStore::new();
        assert_eq!(state.set("k", Value::Int(1)), None);
        assert_eq!(state.set("k", Value::Int(2)), Some(Value::Int(1)));
        assert!(state.contains_key("k"));
        assert_eq!(state.remove("k"), Some(Value::Int(2)));
        assert_eq!(state.len(), 0);
    }
}
