//! Group-scoped cache pool
//!
//! Memoizes expensive parse results (parsed stylesheets) across pipeline
//! runs. The backend is chosen once at construction:
//! - [`FifoBackend`]: in-process map, at most `capacity` entries per group,
//!   oldest entry evicted first.
//! - [`ExternalBackend`]: delegates to a host [`ExternalStore`], no bound.
//!
//! The pool is the only object shared between runs, so every backend does
//! its own locking and the pool itself is `Send + Sync`.

mod backend;
mod external;

pub use backend::{CacheBackend, FifoBackend};
pub use external::{ExternalBackend, ExternalStore, SharedMapStore};

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::SanitizerConfig;
use crate::pipeline::{PipelineResult, SanitizeError};

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Hit ratio between 0.0 and 1.0
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Fixed-capacity, group-scoped key/value pool
pub struct CachePool {
    backend: Box<dyn CacheBackend>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

impl CachePool {
    /// Pool backed by the in-process FIFO map.
    ///
    /// # Errors
    ///
    /// Returns [`SanitizeError::Cache`] when `capacity` is zero.
    pub fn local(capacity: usize) -> PipelineResult<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| SanitizeError::Cache("cache capacity must be at least 1".into()))?;
        Ok(Self::with_backend(Box::new(FifoBackend::new(capacity))))
    }

    /// Pool backed by a host store, without a capacity bound.
    pub fn external(store: Arc<dyn ExternalStore>) -> Self {
        Self::with_backend(Box::new(ExternalBackend::new(store)))
    }

    pub fn with_backend(backend: Box<dyn CacheBackend>) -> Self {
        Self {
            backend,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Pick the backend from the `use_external_cache` capability flag.
    ///
    /// # Errors
    ///
    /// Fails when the flag asks for an external cache but the host supplied
    /// no store, or when the local capacity is zero.
    pub fn from_config(
        config: &SanitizerConfig,
        store: Option<Arc<dyn ExternalStore>>,
    ) -> PipelineResult<Self> {
        if config.use_external_cache() {
            let store = store.ok_or_else(|| {
                SanitizeError::Cache(
                    "use_external_cache is set but no external store was provided".into(),
                )
            })?;
            Ok(Self::external(store))
        } else {
            Self::local(config.cache_capacity())
        }
    }

    pub fn get(&self, group: &str, key: &str) -> Option<Vec<u8>> {
        let value = self.backend.get(group, key);
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    pub fn set(&self, group: &str, key: &str, value: Vec<u8>) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
        if let Some(evicted) = self.backend.set(group, key, value) {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            log::trace!("Cache group '{group}' at capacity, evicted oldest entry '{evicted}'");
        }
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// # Errors
    ///
    /// Propagates the error from `compute`; nothing is stored in that case.
    pub fn get_or_insert_with<E>(
        &self,
        group: &str,
        key: &str,
        compute: impl FnOnce() -> Result<Vec<u8>, E>,
    ) -> Result<Vec<u8>, E> {
        if let Some(value) = self.get(group, key) {
            return Ok(value);
        }
        let value = compute()?;
        self.set(group, key, value.clone());
        Ok(value)
    }

    /// Entries currently held by a group (`None` for external stores).
    #[must_use]
    pub fn group_len(&self, group: &str) -> Option<usize> {
        self.backend.len(group)
    }

    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.backend.capacity().is_some()
    }

    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.backend.capacity()
    }

    pub fn clear(&self) {
        self.backend.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for CachePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachePool")
            .field("capacity", &self.backend.capacity())
            .field("stats", &self.stats())
            .finish()
    }
}
