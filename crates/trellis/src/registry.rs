//! Weak per-account registries.
//!
//! Screens register themselves under an account key so account-wide events
//! can reach every live instance. The registry never keeps an instance alive;
//! dead entries are pruned whenever a key is read or written.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::logging::targets;

/// A registry of weakly held instances grouped by key.
pub struct AccountRegistry<K, T> {
    entries: Mutex<HashMap<K, Vec<Weak<T>>>>,
}

impl<K: Eq + Hash + Clone, T> Default for AccountRegistry<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, T> AccountRegistry<K, T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register `instance` under `key`. Registering twice is a no-op.
    ///
    /// Dead entries under `key` are pruned first.
    pub fn register(&self, key: K, instance: &Arc<T>) {
        let mut entries = self.entries.lock();
        let list = entries.entry(key).or_default();
        list.retain(|existing| existing.strong_count() > 0);
        let weak = Arc::downgrade(instance);
        if !list.iter().any(|existing| existing.ptr_eq(&weak)) {
            list.push(weak);
        }
    }

    /// Remove `instance` from `key`. Returns whether it was registered.
    pub fn unregister(&self, key: &K, instance: &Arc<T>) -> bool {
        let mut entries = self.entries.lock();
        let Some(list) = entries.get_mut(key) else {
            return false;
        };
        let weak = Arc::downgrade(instance);
        let before = list.len();
        list.retain(|existing| !existing.ptr_eq(&weak));
        let removed = list.len() != before;
        if list.is_empty() {
            entries.remove(key);
        }
        removed
    }

    /// Live instances registered under `key`, in registration order.
    pub fn live(&self, key: &K) -> Vec<Arc<T>> {
        let mut entries = self.entries.lock();
        let Some(list) = entries.get_mut(key) else {
            return Vec::new();
        };

        let mut live = Vec::with_capacity(list.len());
        list.retain(|weak| match weak.upgrade() {
            Some(instance) => {
                live.push(instance);
                true
            }
            None => false,
        });
        if list.is_empty() {
            entries.remove(key);
        }
        live
    }

    /// Number of live instances under `key`.
    pub fn count(&self, key: &K) -> usize {
        self.live(key).len()
    }

    /// Drop dead entries for every key. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut entries = self.entries.lock();
        let mut removed = 0;
        entries.retain(|_, list| {
            let before = list.len();
            list.retain(|weak| weak.strong_count() > 0);
            removed += before - list.len();
            !list.is_empty()
        });
        if removed > 0 {
            tracing::trace!(target: targets::REGISTRY, removed, "pruned dead registrations");
        }
        removed
    }

    /// Keys with at least one registration, live or not yet pruned.
    pub fn keys(&self) -> Vec<K> {
        self.entries.lock().keys().cloned().collect()
    }
}
