//! TTL cache with lazy eviction on read

use crate::cache::reaper::Sweep;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// A single cached value stamped at store time
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Key-value store with a fixed cache-wide TTL.
///
/// `get` never returns an entry once its TTL has elapsed: expired entries
/// are removed on read, and the [`Reaper`](crate::cache::Reaper) evicts
/// them eagerly between reads. Cloning is cheap and shares the underlying
/// map, so one cache can serve every call site in the process.
#[derive(Debug)]
pub struct TtlCache<V> {
    inner: Arc<Mutex<HashMap<String, CacheEntry<V>>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache whose entries live for `ttl` from their store time
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a value, overwriting any prior entry for the key.
    ///
    /// The TTL clock starts now; overwriting restarts it.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
        };
        self.lock().insert(key.into(), entry);
    }

    /// Get the value for `key` if present and unexpired.
    ///
    /// An expired entry is evicted as a side effect and `None` is
    /// returned. An entry is expired once `ttl` has fully elapsed, so a
    /// read at the exact expiry instant already misses.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut map = self.lock();
        match map.get(key) {
            Some(entry) if now.duration_since(entry.stored_at) < self.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                map.remove(key);
                debug!(key, "evicted expired cache entry on read");
                None
            }
            None => None,
        }
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries at all
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            ttl: self.ttl,
        }
    }
}

impl<V: Clone + Send + Sync> Sweep for TtlCache<V> {
    fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, entry| now.duration_since(entry.stored_at) < self.ttl);
        before - map.len()
    }

    fn name(&self) -> &'static str {
        "ttl-cache"
    }
}
