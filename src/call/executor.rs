//! Generation-gated retrying driver for asynchronous operations

use crate::call::state::{CallOptions, CallState, CallStatus};
use crate::error::{GreenroomError, GreenroomResult};
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

/// The operation a [`CallExecutor`] drives: a re-invokable factory for
/// futures yielding an optional result or an error. `Ok(None)` is an
/// empty success; the configured default value is substituted.
pub type CallOperation<T> =
    Arc<dyn Fn() -> BoxFuture<'static, GreenroomResult<Option<T>>> + Send + Sync>;

struct ExecutorInner<T> {
    generation: u64,
    operation: Option<CallOperation<T>>,
    driver: Option<JoinHandle<()>>,
}

/// Owns the call state for one logical call site and drives bounded
/// retries with linear backoff.
///
/// [`invoke`](CallExecutor::invoke) starts (or restarts) the operation;
/// call it again whenever the operation's inputs change — the previous
/// invocation is superseded and its pending completions and backoff
/// timers can no longer mutate state. Collaborators observe state via
/// [`state`](CallExecutor::state) snapshots or a
/// [`subscribe`](CallExecutor::subscribe)d watch channel.
pub struct CallExecutor<T> {
    options: CallOptions<T>,
    tx: watch::Sender<CallState<T>>,
    inner: Arc<Mutex<ExecutorInner<T>>>,
}

impl<T: Clone + Send + Sync + 'static> CallExecutor<T> {
    /// Create an executor in the `Idle` state
    pub fn new(options: CallOptions<T>) -> Self {
        let (tx, _) = watch::channel(CallState::idle());
        Self {
            options,
            tx,
            inner: Arc::new(Mutex::new(ExecutorInner {
                generation: 0,
                operation: None,
                driver: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ExecutorInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Invoke `operation`, superseding any in-flight invocation.
    ///
    /// Transitions to `Loading`, clears the prior error, and bumps the
    /// generation so stale completions are dropped. Pending backoff
    /// timers from the superseded invocation are cancelled.
    pub fn invoke<F, Fut>(&self, operation: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GreenroomResult<Option<T>>> + Send + 'static,
    {
        let operation: CallOperation<T> = Arc::new(move || {
            let fut: BoxFuture<'static, GreenroomResult<Option<T>>> = Box::pin(operation());
            fut
        });
        self.start(operation);
    }

    /// Reset the attempt counter and re-invoke the stored operation,
    /// independent of the automatic backoff schedule.
    pub fn retry(&self) -> GreenroomResult<()> {
        let operation = self
            .lock()
            .operation
            .clone()
            .ok_or(GreenroomError::CallNotInvoked)?;
        self.start(operation);
        Ok(())
    }

    /// Current state snapshot
    pub fn state(&self) -> CallState<T> {
        self.tx.borrow().clone()
    }

    /// Watch channel carrying every state transition
    pub fn subscribe(&self) -> watch::Receiver<CallState<T>> {
        self.tx.subscribe()
    }

    /// Invalidate the current invocation and cancel any pending backoff
    /// timer. In-flight operations are not preempted; their completions
    /// are discarded.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        if let Some(driver) = inner.driver.take() {
            driver.abort();
        }
    }

    fn start(&self, operation: CallOperation<T>) {
        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.operation = Some(operation.clone());
            if let Some(driver) = inner.driver.take() {
                driver.abort();
            }
            let generation = inner.generation;
            // Published under the generation lock: a superseded driver
            // holding a settled result cannot slip its publish between
            // the bump and this Loading transition
            self.tx.send_modify(|state| {
                state.status = CallStatus::Loading;
                state.error = None;
                state.attempt = 0;
                state.generation = generation;
            });
            generation
        };

        let handle = tokio::spawn(drive(
            operation,
            generation,
            Arc::clone(&self.inner),
            self.tx.clone(),
            self.options.clone(),
        ));

        // A racing invoke() may have superseded us between the bump and
        // the spawn; its generation wins and our driver must not linger
        let mut inner = self.lock();
        if inner.generation == generation {
            inner.driver = Some(handle);
        } else {
            handle.abort();
        }
    }
}

impl<T> Drop for CallExecutor<T> {
    fn drop(&mut self) {
        if let Some(driver) = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .driver
            .take()
        {
            driver.abort();
        }
    }
}

fn is_current<T>(inner: &Mutex<ExecutorInner<T>>, generation: u64) -> bool {
    inner
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .generation
        == generation
}

/// Publish a state change iff `generation` is still current, holding
/// the generation lock across both the compare and the publish so a
/// concurrent re-invocation cannot interleave between them. No await
/// happens under the lock. Returns false when the publish was dropped
/// as stale.
fn publish_if_current<T>(
    inner: &Mutex<ExecutorInner<T>>,
    generation: u64,
    tx: &watch::Sender<CallState<T>>,
    update: impl FnOnce(&mut CallState<T>),
) -> bool {
    let guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.generation != generation {
        return false;
    }
    tx.send_modify(update);
    true
}

async fn drive<T: Clone + Send + Sync + 'static>(
    operation: CallOperation<T>,
    generation: u64,
    inner: Arc<Mutex<ExecutorInner<T>>>,
    tx: watch::Sender<CallState<T>>,
    options: CallOptions<T>,
) {
    let mut attempt: u32 = 0;
    loop {
        let result = (operation)().await;

        match result {
            Ok(value) => {
                let data = value.or_else(|| options.default_value.clone());
                let published = publish_if_current(&inner, generation, &tx, |state| {
                    state.status = CallStatus::Succeeded;
                    state.data = data;
                    state.error = None;
                    state.attempt = 0;
                });
                if !published {
                    debug!(generation, "dropping stale call completion");
                }
                return;
            }
            Err(err) => {
                let err = Arc::new(err);
                if options.enable_retry && attempt < options.max_retries {
                    attempt += 1;
                    let err_for_state = Arc::clone(&err);
                    let published = publish_if_current(&inner, generation, &tx, |state| {
                        state.error = Some(err_for_state);
                        state.attempt = attempt;
                    });
                    if !published {
                        debug!(generation, "dropping stale call completion");
                        return;
                    }
                    debug!(attempt, error = %err, "call failed, backing off");

                    sleep(options.retry_delay * attempt).await;
                    if !is_current(&inner, generation) {
                        return;
                    }
                } else {
                    let published = publish_if_current(&inner, generation, &tx, |state| {
                        state.status = CallStatus::Failed;
                        state.data = options.default_value.clone();
                        state.error = Some(Arc::clone(&err));
                    });
                    if published {
                        warn!(attempt, error = %err, "call failed terminally");
                    } else {
                        debug!(generation, "dropping stale call completion");
                    }
                    return;
                }
            }
        }
    }
}
