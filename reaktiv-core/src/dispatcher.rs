//! The two priority queues and the worker task that drains them with
//! strict priority.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::action::{BoxedAction, Priority};
use crate::error::{ReaktivError, Result};

/// The two unbounded FIFO queues and the plumbing `reset`/`cleanup` need
/// to restart or stop the worker.
pub(crate) struct Dispatcher {
    high_tx: mpsc::UnboundedSender<BoxedAction>,
    normal_tx: mpsc::UnboundedSender<BoxedAction>,
    high_rx: AsyncMutex<mpsc::UnboundedReceiver<BoxedAction>>,
    normal_rx: AsyncMutex<mpsc::UnboundedReceiver<BoxedAction>>,
    closed: AtomicBool,
}

impl Dispatcher {
    pub(crate) fn new() -> Self {
        let (high_tx, high_rx) = mpsc::unbounded_channel();
        let (normal_tx, normal_rx) = mpsc::unbounded_channel();
        Self {
            high_tx,
            normal_tx,
            high_rx: AsyncMutex::new(high_rx),
            normal_rx: AsyncMutex::new(normal_rx),
            closed: AtomicBool::new(false),
        }
    }

    /// Non-blocking enqueue. Never awaits; the caller's context need not be
    /// the store's.
    pub(crate) fn enqueue(&self, action: BoxedAction) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ReaktivError::StoreClosed);
        }
        let result = match action.priority() {
            Priority::High => self.high_tx.send(action),
            Priority::Normal => self.normal_tx.send(action),
        };
        result.map_err(|_| ReaktivError::StoreClosed)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// A handler invoked with each dequeued action. Returns `Ok(())` on a
/// normal commit; errors are logged by the worker and do not stop it,
/// except `UnknownModuleForAction`, which is also logged but likewise
/// non-fatal to the worker loop (the dispatcher survives, per the error
/// taxonomy).
pub(crate) type ActionHandler =
    Arc<dyn Fn(BoxedAction) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Drain `high` to empty, then pop exactly one from `normal`, yield, and
/// repeat. A `tokio::select!` in `biased` mode checks `high` on every
/// iteration before `normal`, so newly arrived high-priority work always
/// preempts whatever normal-priority work is still queued.
pub(crate) async fn run_worker(
    dispatcher: Arc<Dispatcher>,
    handler: ActionHandler,
    cancel: CancellationToken,
) {
    let mut high_guard = dispatcher.high_rx.lock().await;
    let mut normal_guard = dispatcher.normal_rx.lock().await;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!("dispatcher worker cancelled");
                break;
            }

            high = high_guard.recv() => {
                match high {
                    Some(action) => {
                        if let Err(err) = handler(action).await {
                            tracing::warn!(error = %err, "high-priority action failed");
                        }
                    }
                    None => break,
                }
            }

            normal = normal_guard.recv() => {
                match normal {
                    Some(action) => {
                        if let Err(err) = handler(action).await {
                            tracing::warn!(error = %err, "normal-priority action failed");
                        }
                        tokio::task::yield_now().await;
                    }
                    None => break,
                }
            }
        }
    }
}

/// Spawn the worker onto `tracker` (or `handle`, if a custom runtime was
/// configured) — the tracker owns the task's lifetime for `cleanup`/
/// `reset` purposes either way.
pub(crate) fn spawn_worker(
    tracker: &TaskTracker,
    handle: Option<&tokio::runtime::Handle>,
    dispatcher: Arc<Dispatcher>,
    handler: ActionHandler,
    cancel: CancellationToken,
) {
    match handle {
        Some(handle) => {
            tracker.spawn_on(run_worker(dispatcher, handler, cancel), handle);
        }
        None => {
            tracker.spawn(run_worker(dispatcher, handler, cancel));
        }
    }
}
