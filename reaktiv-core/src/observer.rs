//! Process-wide observer interface for logic tracing.
//!
//! Three event kinds (start/complete/fail) tied to a logic method
//! invocation. Observers are registered process-wide and invoked
//! synchronously at the emission site; redaction and formatting happen in
//! the emitter, never in the observer.

use std::panic::Location;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One logic-method invocation event.
#[derive(Debug, Clone)]
pub enum LogicEvent {
    /// A logic method started executing.
    Start(LogicEventMeta),
    /// A logic method completed without error.
    Complete {
        meta: LogicEventMeta,
        /// Human-readable summary of the result, already formatted (and
        /// redacted, if applicable) by the emitter.
        result_summary: String,
        duration: Duration,
    },
    /// A logic method failed.
    Fail {
        meta: LogicEventMeta,
        exception_type: String,
        exception_message: String,
        /// Best-effort stack/backtrace rendering, if available.
        stack: Option<String>,
        duration: Duration,
    },
}

impl LogicEvent {
    /// The shared metadata carried by every variant.
    pub fn meta(&self) -> &LogicEventMeta {
        match self {
            LogicEvent::Start(meta) => meta,
            LogicEvent::Complete { meta, .. } => meta,
            LogicEvent::Fail { meta, .. } => meta,
        }
    }
}

/// Identity and correlation metadata shared by every [`LogicEvent`]
/// variant.
#[derive(Debug, Clone)]
pub struct LogicEventMeta {
    /// Fully-qualified logic type name (`std::any::type_name`).
    pub logic_type: &'static str,
    /// The method name being traced.
    pub method: &'static str,
    /// Already-redacted parameter strings.
    pub params: Vec<String>,
    /// Correlates start/complete/fail events for one invocation.
    pub correlation_id: Uuid,
    /// Wall-clock time the event was captured.
    pub timestamp: DateTime<Utc>,
    /// Caller's source location, when captured with `#[track_caller]`.
    pub location: Option<&'static Location<'static>>,
}

/// Implemented by anything that wants to observe logic invocations.
pub trait LogicObserver: Send + Sync + 'static {
    /// Called synchronously at the emission site.
    fn on_event(&self, event: &LogicEvent);
}

static REGISTRY: OnceLock<RwLock<Vec<Arc<dyn LogicObserver>>>> = OnceLock::new();

fn registry() -> &'static RwLock<Vec<Arc<dyn LogicObserver>>> {
    REGISTRY.get_or_init(|| RwLock::new(Vec::new()))
}

/// Register a process-wide observer. Returns a handle that can be passed
/// to [`deregister`].
pub fn register(observer: Arc<dyn LogicObserver>) -> ObserverHandle {
    let mut guard = registry().write().expect("observer registry poisoned");
    guard.push(observer.clone());
    ObserverHandle(observer)
}

/// A previously-registered observer, used only to identify it for removal.
pub struct ObserverHandle(Arc<dyn LogicObserver>);

/// Remove a previously registered observer.
pub fn deregister(handle: &ObserverHandle) {
    let mut guard = registry().write().expect("observer registry poisoned");
    guard.retain(|o| !Arc::ptr_eq(o, &handle.0));
}

/// Emit an event to every currently registered observer, in registration
/// order.
pub fn emit(event: LogicEvent) {
    let guard = registry().read().expect("observer registry poisoned");
    for observer in guard.iter() {
        observer.on_event(&event);
    }
}

/// Default, no-op redaction hook: callers performing their own redaction
/// should format parameters before constructing a [`LogicEventMeta`]
/// rather than relying on this.
pub fn redact_default(value: &str) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording(Mutex<Vec<String>>);

    impl LogicObserver for Recording {
        fn on_event(&self, event: &LogicEvent) {
            self.0.lock().unwrap().push(event.meta().method.to_string());
        }
    }

    #[test]
    fn observers_receive_events_synchronously() {
        let recorder = Arc::new(Recording(Mutex::new(Vec::new())));
        let handle = register(recorder.clone());

        emit(LogicEvent::Start(LogicEventMeta {
            logic_type: "TestLogic",
            method: "handle",
            params: vec![],
            correlation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            location: None,
        }));

        assert_eq!(recorder.0.lock().unwrap().as_slice(), ["handle"]);
        deregister(&handle);
    }
}
