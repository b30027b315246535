//! Retrying call execution
//!
//! Wraps an arbitrary asynchronous operation in a bounded-retry state
//! machine: `Idle -> Loading -> Succeeded`, or `Loading -> Loading` with
//! linear backoff until the retry budget runs out and the state becomes
//! `Failed` with the configured default value substituted for data.
//!
//! Each invocation carries a generation number; a completion whose
//! generation no longer matches the executor's current one is dropped
//! before touching caller-visible state. That is cooperative,
//! best-effort cancellation: in-flight operations are not preempted, but
//! pending backoff timers are invalidated when an invocation is
//! superseded or the executor is torn down. No deadline is imposed on
//! the operation itself; a stuck call only retries after it settles.
//!
//! The executor is a primitive independent of
//! [`TtlCache`](crate::cache::TtlCache) and
//! [`SlidingWindowLimiter`](crate::cache::SlidingWindowLimiter);
//! callers compose them if and how they see fit.

pub mod executor;
pub mod state;

pub use executor::CallExecutor;
pub use state::{CallOptions, CallState, CallStatus};
