//! The per-lineage scratch space shared between lifecycle hooks and specs.
//!
//! A [`Bag`] is created fresh for every subject/context run episode: setup
//! blocks populate it, every spec run starts from a pristine copy of the
//! post-setup state, and teardown observes whatever the last executed spec
//! left behind. Snapshots are cheap because the backing store is a
//! persistent map.

use im::HashMap;

use crate::value::Value;

/// An open key/value store with structural-sharing snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bag {
    entries: HashMap<String, Value>,
}

impl Bag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value under `key`, replacing any previous entry.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an independent copy of the current state. Mutations on either
    /// side are invisible to the other; the persistent backing map makes
    /// this an O(1) operation.
    pub fn snapshot(&self) -> Bag {
        self.clone()
    }
}
