//! Adapter for host-provided key/value stores.

use dashmap::DashMap;
use std::sync::Arc;

use super::backend::CacheBackend;

/// A flat key/value store owned by the host (object cache, shared memory,
/// a remote cache...). Assumed unbounded and possibly shared across
/// processes; any blocking it does is the host's business.
pub trait ExternalStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&self, key: &str, value: Vec<u8>);
    fn clear(&self) {}
}

/// Unbounded backend delegating to an [`ExternalStore`].
///
/// Group scoping is done by key namespacing. The group length is part of
/// the prefix so `("a:b", "c")` and `("a", "b:c")` never collide.
pub struct ExternalBackend {
    store: Arc<dyn ExternalStore>,
}

impl ExternalBackend {
    pub fn new(store: Arc<dyn ExternalStore>) -> Self {
        Self { store }
    }

    fn namespaced(group: &str, key: &str) -> String {
        format!("{}:{group}:{key}", group.len())
    }
}

impl CacheBackend for ExternalBackend {
    fn get(&self, group: &str, key: &str) -> Option<Vec<u8>> {
        self.store.get(&Self::namespaced(group, key))
    }

    fn set(&self, group: &str, key: &str, value: Vec<u8>) -> Option<String> {
        self.store.set(&Self::namespaced(group, key), value);
        None
    }

    fn len(&self, _group: &str) -> Option<usize> {
        None
    }

    fn capacity(&self) -> Option<usize> {
        None
    }

    fn clear(&self) {
        self.store.clear();
    }
}

/// Process-wide `DashMap` store, for hosts without an object cache of
/// their own and for tests of the unbounded path.
#[derive(Default)]
pub struct SharedMapStore {
    entries: DashMap<String, Vec<u8>>,
}

impl SharedMapStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ExternalStore for SharedMapStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        self.entries.insert(key.to_string(), value);
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespacing_prevents_cross_group_collisions() {
        let store = Arc::new(SharedMapStore::new());
        let backend = ExternalBackend::new(store.clone());
        backend.set("a:b", "c", b"first".to_vec());
        backend.set("a", "b:c", b"second".to_vec());
        assert_eq!(store.len(), 2);
        assert_eq!(backend.get("a:b", "c"), Some(b"first".to_vec()));
        assert_eq!(backend.get("a", "b:c"), Some(b"second".to_vec()));
    }
}
