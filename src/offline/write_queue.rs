//! Deferred write queue with signal-driven replay

use crate::error::GreenroomResult;
use crate::signal::{PlatformSignal, SignalBus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Queued write status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStatus {
    Pending,
    Replaying,
    Failed,
    Committed,
}

/// A write captured while offline, held until replay commits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedWrite {
    /// Unique write ID
    pub id: Uuid,

    /// Opaque payload for the downstream API
    pub payload: serde_json::Value,

    /// When the write was captured
    pub enqueued_at: DateTime<Utc>,

    /// Current status
    pub status: WriteStatus,
}

/// The downstream API a write is replayed against.
///
/// A sync signal can legitimately fire more than once for the same
/// queued write (at-least-once), so the receiving API must tolerate
/// duplicate submissions; that contract lives with the implementor.
#[async_trait]
pub trait WriteReplayer: Send + Sync {
    /// Submit one queued write; `Ok` acknowledges it as committed
    async fn replay(&self, write: &QueuedWrite) -> GreenroomResult<()>;
}

/// Counts from one replay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub committed: usize,
    pub failed: usize,
}

/// FIFO queue of writes captured while offline.
///
/// Writes are replayed strictly in enqueue order when a sync signal
/// fires; a write leaves the queue only once its replay is acknowledged
/// committed. Failed replays stay queued for the next signal with no
/// retry bound and no dead-letter: unlike the call executor's bounded
/// backoff, retry scheduling belongs to the platform that emits the
/// signals. Cloning shares the underlying queue.
#[derive(Debug)]
pub struct DeferredWriteQueue {
    inner: Arc<Mutex<VecDeque<QueuedWrite>>>,
}

impl DeferredWriteQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<QueuedWrite>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Capture a write for later replay; returns its ID
    pub fn enqueue(&self, payload: serde_json::Value) -> Uuid {
        let write = QueuedWrite {
            id: Uuid::new_v4(),
            payload,
            enqueued_at: Utc::now(),
            status: WriteStatus::Pending,
        };
        let id = write.id;
        self.lock().push_back(write);
        debug!(%id, "deferred write enqueued");
        id
    }

    /// Number of queued writes
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the queue in replay order
    pub fn snapshot(&self) -> Vec<QueuedWrite> {
        self.lock().iter().cloned().collect()
    }

    /// Replay the queue in FIFO order against `replayer`.
    ///
    /// Committed writes are removed; failed writes are marked `Failed`
    /// and stay queued for the next signal.
    pub async fn process(&self, replayer: &dyn WriteReplayer) -> ReplayOutcome {
        let mut outcome = ReplayOutcome::default();
        let mut index = 0;

        loop {
            let write = {
                let mut queue = self.lock();
                match queue.get_mut(index) {
                    Some(write) => {
                        write.status = WriteStatus::Replaying;
                        write.clone()
                    }
                    None => break,
                }
            };

            match replayer.replay(&write).await {
                Ok(()) => {
                    let mut queue = self.lock();
                    if let Some(pos) = queue.iter().position(|w| w.id == write.id) {
                        queue.remove(pos);
                    }
                    outcome.committed += 1;
                    info!(id = %write.id, "deferred write committed");
                }
                Err(err) => {
                    let mut queue = self.lock();
                    if let Some(w) = queue.iter_mut().find(|w| w.id == write.id) {
                        w.status = WriteStatus::Failed;
                    }
                    outcome.failed += 1;
                    index += 1;
                    warn!(id = %write.id, error = %err, "deferred write replay failed, keeping queued");
                }
            }
        }

        outcome
    }

    /// Spawn a worker that replays the queue whenever `bus` carries a
    /// sync signal with `tag`. Returns the worker's handle; abort it to
    /// detach.
    pub fn attach(
        &self,
        bus: &SignalBus,
        replayer: Arc<dyn WriteReplayer>,
        tag: impl Into<String>,
    ) -> JoinHandle<()> {
        use tokio::sync::broadcast;

        let queue = self.clone();
        let mut rx = bus.subscribe();
        let tag = tag.into();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(PlatformSignal::Sync { tag: signal_tag }) if signal_tag == tag => {
                        let outcome = queue.process(replayer.as_ref()).await;
                        debug!(
                            tag = %tag,
                            committed = outcome.committed,
                            failed = outcome.failed,
                            "sync signal processed"
                        );
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "sync worker lagged behind signal bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!(tag = %tag, "sync worker detached");
        })
    }
}

impl Default for DeferredWriteQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DeferredWriteQueue {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
