//! In-memory admission control and caching
//!
//! Two process-wide leaf structures plus the background task that bounds
//! their memory:
//!
//! - [`TtlCache`]: key-value store with a fixed cache-wide TTL, expired
//!   entries evicted lazily on read and eagerly by the reaper
//! - [`SlidingWindowLimiter`]: per-key request admission over a rolling
//!   trailing window (a sliding log, not fixed buckets)
//! - [`Reaper`]: recurring sweep over both structures, with an explicit
//!   stop handle tied to the hosting process lifecycle
//!
//! All three use `tokio::time::Instant`, so tests drive them
//! deterministically under tokio's paused clock. Neither structure
//! persists anything across restarts.

pub mod limiter;
pub mod reaper;
pub mod ttl;

pub use limiter::SlidingWindowLimiter;
pub use reaper::{Reaper, Sweep};
pub use ttl::TtlCache;
