//! A single keyed table of the cache registry.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

/// Opaque cached value. `Value::Null` is a legitimate cached value and is
/// distinct from "never cached".
pub type CacheValue = serde_json::Value;

/// One namespace: a concurrent map from `K` to [`CacheValue`].
#[derive(Debug)]
pub struct Namespace<K> {
    entries: RwLock<HashMap<K, CacheValue>>,
}

impl<K: Eq + Hash> Namespace<K> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a key. `None` means the key was never cached (or removed).
    pub fn get<Q>(&self, key: &Q) -> Option<CacheValue>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entries = self.entries.read().expect("namespace lock");
        entries.get(key).cloned()
    }

    /// Insert or replace a value, returning the previous one.
    pub fn put(&self, key: K, value: CacheValue) -> Option<CacheValue> {
        let mut entries = self.entries.write().expect("namespace lock");
        entries.insert(key, value)
    }

    /// Remove a key, returning the value it held.
    pub fn remove<Q>(&self, key: &Q) -> Option<CacheValue>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut entries = self.entries.write().expect("namespace lock");
        entries.remove(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entries = self.entries.read().expect("namespace lock");
        entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("namespace lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write().expect("namespace lock");
        let count = entries.len();
        entries.clear();
        count
    }
}

impl<K: Eq + Hash + Clone> Namespace<K> {
    /// Snapshot of the current keys, in no particular order.
    pub fn keys(&self) -> Vec<K> {
        let entries = self.entries.read().expect("namespace lock");
        entries.keys().cloned().collect()
    }
}

impl<K: Eq + Hash> Default for Namespace<K> {
    fn default() -> Self {
        Self::new()
    }
}
