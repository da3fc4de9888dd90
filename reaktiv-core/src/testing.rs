//! Test utilities for driving a reaktiv store end to end.
//!
//! - [`TestHarness`]: wraps a built [`Store`], with a convenience method
//!   for the common "dispatch, then wait for the resulting commit" shape.
//! - [`RecordingObserver`]: a [`LogicObserver`] that records every event
//!   for later assertions.
//! - With the `testing-time` feature: [`pause_time`]/[`advance_time`]/
//!   [`resume_time`], for tests that need deterministic control over any
//!   timers a module's logic uses.

use std::sync::{Arc, Mutex};

use crate::action::Action;
use crate::error::Result;
use crate::module::State;
use crate::observer::{LogicEvent, LogicObserver};
use crate::store::Store;

/// Pause tokio's virtual clock. Timers stop advancing with wall-clock time
/// until [`resume_time`] or [`advance_time`] is called. Requires the
/// current-thread test runtime (`#[tokio::test]`'s default).
#[cfg(feature = "testing-time")]
pub fn pause_time() {
    tokio::time::pause();
}

/// Resume tokio's virtual clock after [`pause_time`].
#[cfg(feature = "testing-time")]
pub fn resume_time() {
    tokio::time::resume();
}

/// Advance tokio's virtual clock by `duration` without pausing the test.
/// Any timers due within that span fire before this returns.
#[cfg(feature = "testing-time")]
pub async fn advance_time(duration: std::time::Duration) {
    tokio::time::advance(duration).await;
}

/// Thin wrapper around a built [`Store`] for tests.
pub struct TestHarness {
    store: Store,
}

impl TestHarness {
    /// Wrap an already-built store.
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Subscribe to `S`, record its value at subscribe time, dispatch
    /// `action`, then await the next commit — i.e. the value resulting
    /// from this dispatch specifically, not a pre-existing one.
    pub async fn dispatch_and_await<S: State, A: Action>(&self, action: A) -> Result<S> {
        let mut sub = self.store.select_state::<S>().await?;
        let _baseline = sub.next().await;
        self.store.dispatch(action)?;
        Ok(sub.next().await)
    }
}

/// A [`LogicObserver`] that records every event it receives, for test
/// assertions about which logic ran and in what order.
#[derive(Default, Clone)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<LogicEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, oldest first.
    pub fn events(&self) -> Vec<LogicEvent> {
        self.events.lock().expect("recording observer poisoned").clone()
    }

    /// Method names of every `Start` event recorded, in order.
    pub fn started_methods(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .filter_map(|e| matches!(e, LogicEvent::Start(_)).then(|| e.meta().method))
            .collect()
    }
}

impl LogicObserver for RecordingObserver {
    fn on_event(&self, event: &LogicEvent) {
        self.events.lock().expect("recording observer poisoned").push(event.clone());
    }
}
