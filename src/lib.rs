//! Greenroom - Offline-First Client Resiliency Core
//!
//! TTL caching, sliding-window rate limiting, retrying call execution,
//! and offline request interception with deferred write sync for
//! venue-booking clients.

pub mod cache;
pub mod call;
pub mod config;
pub mod error;
pub mod offline;
pub mod service;
pub mod signal;

pub use error::{GreenroomError, GreenroomResult};
