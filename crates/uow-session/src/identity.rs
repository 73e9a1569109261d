//! One tracked instance per key.

use std::collections::HashMap;
use std::hash::Hash;

/// Mapping from persistence key to the domain object tracked under it.
///
/// The first object registered under a key keeps the slot until the key is
/// removed; later registrations never shadow it.
#[derive(Clone, Debug)]
pub struct IdentityMap<K, O> {
    entries: HashMap<K, O>,
}

impl<K: Eq + Hash, O> IdentityMap<K, O> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Register `object` under `key`.
    ///
    /// Returns `false` and leaves the map unchanged if the key is already
    /// registered.
    pub fn register(&mut self, key: K, object: O) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, object);
        true
    }

    /// Remove the entry for `key`. Absent keys are ignored.
    pub fn remove(&mut self, key: &K) -> Option<O> {
        self.entries.remove(key)
    }

    pub fn lookup(&self, key: &K) -> Option<&O> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, O> Default for IdentityMap<K, O> {
    fn default() -> Self {
        Self::new()
    }
}
