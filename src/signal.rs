//! Platform signal bus
//!
//! Replaces direct platform event listeners with a broadcast channel the
//! core publishes to and collaborators subscribe to. The host adapts its
//! platform events (a sync opportunity, a connectivity flip) onto the
//! bus; the core never talks to a platform event API directly.

use tokio::sync::broadcast;
use tracing::debug;

/// Sync tag for deferred booking submissions
pub const BOOKING_SYNC_TAG: &str = "background-sync-booking";

/// A platform-level event carried over the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformSignal {
    /// A synchronization opportunity for the given tag
    Sync { tag: String },

    /// Connectivity changed; consumed by presentation collaborators,
    /// only transported here
    Connectivity { online: bool },
}

impl PlatformSignal {
    /// Convenience constructor for a sync signal
    pub fn sync(tag: impl Into<String>) -> Self {
        Self::Sync { tag: tag.into() }
    }
}

/// Broadcast bus for [`PlatformSignal`]s.
///
/// Signals published with no subscribers are dropped, matching platform
/// events that fire with nobody listening.
#[derive(Debug, Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<PlatformSignal>,
}

impl SignalBus {
    /// Create a bus buffering up to `capacity` signals per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a signal; returns the number of subscribers that will
    /// see it
    pub fn publish(&self, signal: PlatformSignal) -> usize {
        debug!(?signal, "publishing platform signal");
        self.tx.send(signal).unwrap_or(0)
    }

    /// Subscribe to all signals published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PlatformSignal> {
        self.tx.subscribe()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(32)
    }
}
