//! Error types for Greenroom
//!
//! All modules use `GreenroomResult<T>` as their return type.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for Greenroom operations
pub type GreenroomResult<T> = Result<T, GreenroomError>;

/// All errors that can occur in Greenroom
#[derive(Error, Debug)]
pub enum GreenroomError {
    // Call executor errors
    #[error("call failed: {reason}")]
    CallFailed { reason: String },

    #[error("retry requested before any operation was invoked")]
    CallNotInvoked,

    // Offline interceptor errors
    #[error("precache install failed for {resource}: {reason}")]
    PrecacheInstall { resource: String, reason: String },

    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    // Deferred write errors
    #[error("replay rejected for write {id}: {reason}")]
    ReplayRejected { id: Uuid, reason: String },
}

impl GreenroomError {
    /// Create a call failure error
    pub fn call_failed(reason: impl Into<String>) -> Self {
        Self::CallFailed {
            reason: reason.into(),
        }
    }

    /// Create a precache install error for a manifest resource
    pub fn precache(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PrecacheInstall {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Create a fetch passthrough error
    pub fn fetch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a replay rejection error for a queued write
    pub fn replay_rejected(id: Uuid, reason: impl Into<String>) -> Self {
        Self::ReplayRejected {
            id,
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    ///
    /// Transient failures (a failed call, a network fetch, a rejected replay)
    /// may succeed on a later attempt; the rest are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CallFailed { .. } | Self::Fetch { .. } | Self::ReplayRejected { .. }
        )
    }
}
