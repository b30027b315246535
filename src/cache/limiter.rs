//! Sliding-window rate limiter
//!
//! Admission control over a rolling trailing window. The window is a
//! sliding log of admitted timestamps, pruned on every check, not fixed
//! buckets; no persistence across restarts.

use crate::cache::reaper::Sweep;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Per-key request admission over a trailing time window.
///
/// Cloning is cheap and shares the underlying logs, so one limiter can
/// guard every call site in the process.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    inner: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    window: Duration,
    max_requests: usize,
}

impl SlidingWindowLimiter {
    /// Create a limiter admitting at most `max_requests` per key within
    /// the trailing `window`
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit or deny a request for `key`.
    ///
    /// Timestamps older than the window are pruned first; the request is
    /// admitted and recorded iff fewer than `max_requests` remain.
    /// Denial records nothing, so a rejected burst does not extend the
    /// window.
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut logs = self.lock();
        let log = logs.entry(key.to_string()).or_default();
        log.retain(|stamp| now.duration_since(*stamp) < self.window);

        if log.len() < self.max_requests {
            log.push_back(now);
            true
        } else {
            debug!(key, in_window = log.len(), "rate limit denial");
            false
        }
    }

    /// Number of keys currently holding a request log
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }
}

impl Clone for SlidingWindowLimiter {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            window: self.window,
            max_requests: self.max_requests,
        }
    }
}

impl Sweep for SlidingWindowLimiter {
    fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut logs = self.lock();
        let mut pruned = 0;
        logs.retain(|_, log| {
            let before = log.len();
            log.retain(|stamp| now.duration_since(*stamp) < self.window);
            pruned += before - log.len();
            !log.is_empty()
        });
        pruned
    }

    fn name(&self) -> &'static str {
        "rate-limiter"
    }
}
