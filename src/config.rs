//! Configuration for the resiliency core
//!
//! Plain serde structs with sensible defaults; the hosting application
//! constructs these (or deserializes them from its own config source)
//! and hands them to [`crate::service::Resilience::init`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the resiliency service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub reaper: ReaperConfig,
}

/// TTL cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache-wide entry lifetime in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl CacheConfig {
    /// Entry lifetime as a `Duration`
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Sliding-window rate limiter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Trailing window length in seconds
    pub window_secs: u64,

    /// Maximum admitted requests per key within the window
    pub max_requests: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 50,
        }
    }
}

impl RateLimitConfig {
    /// Window length as a `Duration`
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Periodic reaper settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaperConfig {
    /// Sweep interval in seconds
    pub interval_secs: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

impl ReaperConfig {
    /// Sweep interval as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
