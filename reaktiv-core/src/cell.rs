//! Reactive cell: single-writer, multi-subscriber holder of one state value.

use tokio::sync::watch;

use crate::module::State;

/// Holds one module's current state and publishes commits to subscribers.
///
/// Backed by [`tokio::sync::watch`], which already gives the semantics the
/// store contract asks for: a subscription's first poll yields whatever
/// value is current at subscribe time, and every later commit is observed
/// by every live subscriber.
///
/// Writes are only legal while the store's state-mutation lock is held;
/// [`ReactiveCell::set`] is crate-private for exactly that reason.
pub struct ReactiveCell<S: State> {
    tx: watch::Sender<S>,
}

impl<S: State> ReactiveCell<S> {
    /// Create a cell holding `initial`.
    pub fn new(initial: S) -> Self {
        Self {
            tx: watch::Sender::new(initial),
        }
    }

    /// Non-suspending read of the current value, for synchronous contexts
    /// (e.g. building a view model off the render thread).
    pub fn get(&self) -> S {
        self.tx.borrow().clone()
    }

    /// A restartable subscription whose first emission is the value
    /// current at subscribe time.
    pub fn subscribe(&self) -> StateSubscription<S> {
        StateSubscription {
            rx: self.tx.subscribe(),
            delivered_current: false,
        }
    }

    /// Commit a new value. Only called by the base handler under the
    /// state-mutation lock.
    ///
    /// Equal-value writes are not coalesced: every commit is a distinct
    /// value in the subscription stream, even if it equals the prior
    /// value. See `DESIGN.md` for the reasoning.
    pub(crate) fn set(&self, value: S) {
        // `send` only notifies if the value's representation differs by
        // pointer/generation, not by equality, so an explicit `send_modify`
        // guarantees every commit is observed even when `S: PartialEq` and
        // the value happens to compare equal to the previous one.
        self.tx.send_modify(|slot| *slot = value);
    }
}

/// A restartable sequence of committed state values.
///
/// The first call to [`StateSubscription::next`] always yields the value
/// that was current when the subscription was created; subsequent calls
/// suspend until the next commit.
pub struct StateSubscription<S: State> {
    rx: watch::Receiver<S>,
    delivered_current: bool,
}

impl<S: State> StateSubscription<S> {
    /// Non-suspending read of the latest value this subscription has seen
    /// (or the value current at creation, if nothing has committed since).
    pub fn current(&self) -> S {
        self.rx.borrow().clone()
    }

    /// Await the next committed value. The very first call returns
    /// immediately with the value current at subscribe time; every call
    /// after that suspends until a new commit lands.
    pub async fn next(&mut self) -> S {
        if !self.delivered_current {
            self.delivered_current = true;
            return self.rx.borrow().clone();
        }
        // `changed()` only errors when the sender half is dropped, which
        // cannot happen while the owning `ModuleInfo` is alive.
        let _ = self.rx.changed().await;
        self.rx.borrow().clone()
    }
}

impl<S: State> Clone for StateSubscription<S> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            delivered_current: false,
        }
    }
}
