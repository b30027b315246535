//! Call state and executor options

use crate::error::GreenroomError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Call status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Snapshot of one logical call site's state
#[derive(Debug, Clone)]
pub struct CallState<T> {
    /// Current status
    pub status: CallStatus,

    /// Last successful result, or the configured default after terminal
    /// failure
    pub data: Option<T>,

    /// Most recent error, cleared on re-invocation
    pub error: Option<Arc<GreenroomError>>,

    /// Retries consumed by the current invocation; never exceeds
    /// `max_retries`
    pub attempt: u32,

    /// Invocation epoch; stale async completions carry an older value
    /// and are discarded
    pub generation: u64,
}

impl<T> CallState<T> {
    /// Initial state before any invocation
    pub fn idle() -> Self {
        Self {
            status: CallStatus::Idle,
            data: None,
            error: None,
            attempt: 0,
            generation: 0,
        }
    }

    /// Whether an invocation is currently in flight or backing off
    pub fn is_loading(&self) -> bool {
        self.status == CallStatus::Loading
    }
}

/// Configuration for a [`CallExecutor`](crate::call::CallExecutor)
#[derive(Debug, Clone)]
pub struct CallOptions<T> {
    /// Retries after the initial attempt before terminal failure
    pub max_retries: u32,

    /// Base backoff unit, scaled linearly by attempt number
    /// (delay, 2*delay, 3*delay, ...)
    pub retry_delay: Duration,

    /// Substituted for data on terminal failure or empty success
    pub default_value: Option<T>,

    /// When false, a single failure is terminal
    pub enable_retry: bool,
}

impl<T> Default for CallOptions<T> {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            default_value: None,
            enable_retry: true,
        }
    }
}

impl<T> CallOptions<T> {
    /// Set the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base backoff delay
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Set the fallback value
    pub fn with_default_value(mut self, default_value: T) -> Self {
        self.default_value = Some(default_value);
        self
    }

    /// Disable automatic retry
    pub fn without_retry(mut self) -> Self {
        self.enable_retry = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_defaults() {
        let options: CallOptions<u32> = CallOptions::default();
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.retry_delay, Duration::from_millis(1000));
        assert!(options.default_value.is_none());
        assert!(options.enable_retry);
    }

    #[test]
    fn options_builder() {
        let options = CallOptions::default()
            .with_max_retries(5)
            .with_retry_delay(Duration::from_millis(250))
            .with_default_value(vec![1, 2, 3])
            .without_retry();
        assert_eq!(options.max_retries, 5);
        assert_eq!(options.retry_delay, Duration::from_millis(250));
        assert_eq!(options.default_value, Some(vec![1, 2, 3]));
        assert!(!options.enable_retry);
    }

    #[test]
    fn state_idle() {
        let state: CallState<u32> = CallState::idle();
        assert_eq!(state.status, CallStatus::Idle);
        assert!(!state.is_loading());
        assert_eq!(state.attempt, 0);
        assert_eq!(state.generation, 0);
    }

    #[test]
    fn status_serialize() {
        let json = serde_json::to_string(&CallStatus::Succeeded).unwrap();
        assert_eq!(json, r#""succeeded""#);
    }
}
