use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-node results accumulated during one plan execution, keyed by
/// `"<nodeId>_result"`. Append-only: an existing key is never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanContext {
    entries: BTreeMap<String, String>,
}

impl PlanContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `raw` under `key`. Returns `false` and leaves the context
    /// untouched when the key is already present.
    pub fn record(&mut self, key: impl Into<String>, raw: impl Into<String>) -> bool {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, raw.into());
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.entries
    }
}
