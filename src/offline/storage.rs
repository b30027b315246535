//! Response storage behind the offline interceptor
//!
//! A namespaced response store with a swappable backend. Only an
//! in-memory backend ships: precached responses are rebuilt on every
//! install, never carried across sessions.

use crate::offline::fetch::Response;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Storage backend for precached responses.
///
/// Namespaces correspond to manifest versions; `put_all` is the single
/// commit point, so an install either lands completely or not at all.
/// `clear_namespace` and `namespaces` exist for the collaborator that
/// discards stale versions after a new install — the interceptor itself
/// never calls them.
pub trait CacheStorage: Send + Sync {
    /// Look up an exact url match within a namespace
    fn get(&self, namespace: &str, url: &str) -> Option<Response>;

    /// Commit a full set of entries to a namespace in one step
    fn put_all(&self, namespace: &str, entries: Vec<(String, Response)>);

    /// Drop a whole namespace; returns the number of entries removed
    fn clear_namespace(&self, namespace: &str) -> usize;

    /// All namespaces currently holding entries
    fn namespaces(&self) -> Vec<String>;
}

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<HashMap<String, HashMap<String, Response>>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, HashMap<String, Response>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total entries across all namespaces
    pub fn len(&self) -> usize {
        self.lock().values().map(HashMap::len).sum()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStorage for MemoryStorage {
    fn get(&self, namespace: &str, url: &str) -> Option<Response> {
        self.lock().get(namespace)?.get(url).cloned()
    }

    fn put_all(&self, namespace: &str, entries: Vec<(String, Response)>) {
        let count = entries.len();
        // A commit is the whole set: leftovers from a prior commit to
        // the same namespace must not survive it
        self.lock()
            .insert(namespace.to_string(), entries.into_iter().collect());
        debug!(namespace, count, "committed precache entries");
    }

    fn clear_namespace(&self, namespace: &str) -> usize {
        self.lock()
            .remove(namespace)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    fn namespaces(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_all_then_get() {
        let storage = MemoryStorage::new();
        storage.put_all(
            "v1",
            vec![("/".to_string(), Response::new(200, "<html>"))],
        );
        assert_eq!(storage.get("v1", "/"), Some(Response::new(200, "<html>")));
        assert_eq!(storage.get("v1", "/missing"), None);
        assert_eq!(storage.get("v2", "/"), None);
    }

    #[test]
    fn clear_namespace_removes_everything() {
        let storage = MemoryStorage::new();
        storage.put_all(
            "v1",
            vec![
                ("/".to_string(), Response::new(200, "a")),
                ("/venues".to_string(), Response::new(200, "b")),
            ],
        );
        assert_eq!(storage.clear_namespace("v1"), 2);
        assert!(storage.is_empty());
        assert_eq!(storage.clear_namespace("v1"), 0);
    }

    #[test]
    fn recommit_replaces_namespace_wholesale() {
        let storage = MemoryStorage::new();
        storage.put_all(
            "v1",
            vec![
                ("/".to_string(), Response::new(200, "a")),
                ("/venues".to_string(), Response::new(200, "b")),
            ],
        );
        storage.put_all("v1", vec![("/".to_string(), Response::new(200, "a2"))]);

        // The second commit is the whole set: nothing merges in from
        // the first
        assert_eq!(storage.get("v1", "/"), Some(Response::new(200, "a2")));
        assert_eq!(storage.get("v1", "/venues"), None);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn namespaces_listed() {
        let storage = MemoryStorage::new();
        storage.put_all("v1", vec![("/".to_string(), Response::new(200, "a"))]);
        storage.put_all("v2", vec![("/".to_string(), Response::new(200, "b"))]);
        let mut namespaces = storage.namespaces();
        namespaces.sort();
        assert_eq!(namespaces, vec!["v1", "v2"]);
    }
}
