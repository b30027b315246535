//! Periodic reaper for the in-memory structures
//!
//! Sweeps every registered [`Sweep`] target on a fixed interval to bound
//! their memory. Unlike an unmanaged recurring timer, the reaper hands
//! its owner an explicit stop handle: drop it and the task aborts, or
//! call [`Reaper::shutdown`] for an orderly stop.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// A structure the reaper can sweep for dead entries
pub trait Sweep: Send + Sync {
    /// Evict everything expired; returns the number of evicted items
    fn sweep(&self) -> usize;

    /// Short name used in sweep logs
    fn name(&self) -> &'static str;
}

/// Recurring background sweep over a set of [`Sweep`] targets.
///
/// Sweeps run on their own task and never block callers of the swept
/// structures beyond ordinary mutex contention.
pub struct Reaper {
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Reaper {
    /// Spawn the sweep task; the first sweep runs one full interval
    /// after spawn.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(targets: Vec<Box<dyn Sweep>>, every: Duration) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately; swallow that tick so sweeps
            // are spaced one full period apart from spawn
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for target in &targets {
                            let evicted = target.sweep();
                            if evicted > 0 {
                                debug!(structure = target.name(), evicted, "reaper sweep");
                            }
                        }
                    }
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("reaper stopped");
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop the sweep task and wait for it to finish
    pub async fn shutdown(mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        // Orderly shutdown already took the handle; a plain drop must
        // not leak the recurring task
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{SlidingWindowLimiter, TtlCache};
    use tokio::time::{advance, sleep};

    #[tokio::test(start_paused = true)]
    async fn sweeps_both_structures_on_interval() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(5));
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(5), 10);
        cache.set("k", 1);
        limiter.allow("k");

        let reaper = Reaper::spawn(
            vec![Box::new(cache.clone()), Box::new(limiter.clone())],
            Duration::from_secs(10),
        );

        // Everything expires at t=5; the sweep lands at t=10
        sleep(Duration::from_secs(11)).await;
        assert_eq!(cache.len(), 0);
        assert_eq!(limiter.tracked_keys(), 0);

        reaper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_sweeping() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(1));
        let reaper = Reaper::spawn(vec![Box::new(cache.clone())], Duration::from_secs(10));
        reaper.shutdown().await;

        cache.set("k", 1);
        advance(Duration::from_secs(30)).await;
        // Entry is expired but nothing swept it; len counts raw entries
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_aborts_task() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(1));
        let reaper = Reaper::spawn(vec![Box::new(cache.clone())], Duration::from_secs(10));
        drop(reaper);

        cache.set("k", 1);
        advance(Duration::from_secs(30)).await;
        assert_eq!(cache.len(), 1);
    }
}
