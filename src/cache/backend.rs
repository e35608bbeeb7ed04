//! Cache backends: the in-process FIFO map and the trait both backends share.

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;

/// Storage behind a [`CachePool`](super::CachePool).
///
/// Implementations must be safe to share between concurrent pipeline runs;
/// the pool itself adds no locking.
pub trait CacheBackend: Send + Sync {
    /// Look up `key` within `group` without affecting eviction order.
    fn get(&self, group: &str, key: &str) -> Option<Vec<u8>>;

    /// Store a value, returning the key evicted to make room (if any).
    fn set(&self, group: &str, key: &str, value: Vec<u8>) -> Option<String>;

    /// Number of entries in a group, when the backend can tell.
    fn len(&self, group: &str) -> Option<usize>;

    /// Per-group capacity bound, `None` for unbounded backends.
    fn capacity(&self) -> Option<usize>;

    /// Drop every entry.
    fn clear(&self);
}

/// In-process backend holding at most `capacity` entries per group.
///
/// Eviction is first-in-first-out: reads never refresh an entry and
/// overwriting an existing key keeps its original insertion slot. Built on
/// `lru::LruCache` by only ever reading through `peek`/`peek_mut`, which
/// leaves the recency list in insertion order.
pub struct FifoBackend {
    capacity: NonZeroUsize,
    groups: Mutex<HashMap<String, LruCache<String, Vec<u8>>>>,
}

impl FifoBackend {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            groups: Mutex::new(HashMap::new()),
        }
    }
}

impl CacheBackend for FifoBackend {
    fn get(&self, group: &str, key: &str) -> Option<Vec<u8>> {
        let groups = self.groups.lock();
        groups.get(group)?.peek(key).cloned()
    }

    fn set(&self, group: &str, key: &str, value: Vec<u8>) -> Option<String> {
        let mut groups = self.groups.lock();
        let entries = groups
            .entry(group.to_string())
            .or_insert_with(|| LruCache::new(self.capacity));

        if let Some(existing) = entries.peek_mut(key) {
            *existing = value;
            return None;
        }

        entries
            .push(key.to_string(), value)
            .map(|(evicted_key, _)| evicted_key)
    }

    fn len(&self, group: &str) -> Option<usize> {
        Some(self.groups.lock().get(group).map_or(0, LruCache::len))
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.capacity.get())
    }

    fn clear(&self) {
        self.groups.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(cap: usize) -> FifoBackend {
        FifoBackend::new(NonZeroUsize::new(cap).expect("non-zero capacity"))
    }

    #[test]
    fn test_reads_do_not_refresh_entries() {
        let cache = backend(2);
        cache.set("g", "a", b"1".to_vec());
        cache.set("g", "b", b"2".to_vec());
        // A read of "a" would promote it under LRU; FIFO must still evict it.
        assert_eq!(cache.get("g", "a"), Some(b"1".to_vec()));
        let evicted = cache.set("g", "c", b"3".to_vec());
        assert_eq!(evicted.as_deref(), Some("a"));
        assert!(cache.get("g", "a").is_none());
        assert!(cache.get("g", "b").is_some());
    }

    #[test]
    fn test_overwrite_keeps_insertion_slot() {
        let cache = backend(2);
        cache.set("g", "a", b"1".to_vec());
        cache.set("g", "b", b"2".to_vec());
        assert!(cache.set("g", "a", b"updated".to_vec()).is_none());
        let evicted = cache.set("g", "c", b"3".to_vec());
        assert_eq!(evicted.as_deref(), Some("a"));
    }

    #[test]
    fn test_groups_are_independent() {
        let cache = backend(1);
        cache.set("one", "k", b"1".to_vec());
        cache.set("two", "k", b"2".to_vec());
        assert_eq!(cache.get("one", "k"), Some(b"1".to_vec()));
        assert_eq!(cache.get("two", "k"), Some(b"2".to_vec()));
        assert_eq!(cache.len("one"), Some(1));
        assert_eq!(cache.len("missing"), Some(0));
    }
}
