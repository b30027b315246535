//! Resiliency service lifecycle
//!
//! The explicitly constructed owner of the process-wide cache and rate
//! limiter, and of the reaper that bounds their memory. Replaces
//! module-level singletons with an `init`/`shutdown` lifecycle the
//! hosting process controls.

use crate::cache::{Reaper, SlidingWindowLimiter, TtlCache};
use crate::config::ResilienceConfig;
use tracing::info;

/// Process-wide resiliency service.
///
/// Hands out cheap clones of its cache and limiter; both remain
/// independent primitives — in particular the limiter is not wired into
/// any call executor, that composition is left to call sites.
pub struct Resilience<V> {
    cache: TtlCache<V>,
    limiter: SlidingWindowLimiter,
    reaper: Option<Reaper>,
}

impl<V: Clone + Send + Sync + 'static> Resilience<V> {
    /// Construct the shared structures and start the reaper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn init(config: &ResilienceConfig) -> Self {
        let cache = TtlCache::new(config.cache.ttl());
        let limiter =
            SlidingWindowLimiter::new(config.rate_limit.window(), config.rate_limit.max_requests);
        let reaper = Reaper::spawn(
            vec![Box::new(cache.clone()), Box::new(limiter.clone())],
            config.reaper.interval(),
        );
        info!(
            ttl_secs = config.cache.ttl_secs,
            window_secs = config.rate_limit.window_secs,
            max_requests = config.rate_limit.max_requests,
            "resiliency service started"
        );
        Self {
            cache,
            limiter,
            reaper: Some(reaper),
        }
    }

    /// The shared TTL cache
    pub fn cache(&self) -> &TtlCache<V> {
        &self.cache
    }

    /// The shared rate limiter
    pub fn limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    /// Stop the reaper and release the service.
    ///
    /// Clones of the cache and limiter handed out earlier stay usable;
    /// only the background sweep stops.
    pub async fn shutdown(mut self) {
        if let Some(reaper) = self.reaper.take() {
            reaper.shutdown().await;
        }
        info!("resiliency service stopped");
    }
}
