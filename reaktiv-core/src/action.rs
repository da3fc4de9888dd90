//! Action trait: routing key, priority marker, and the value contract.

use std::any::Any;
use std::fmt::Debug;

/// Whether an action should be drained ahead of normal-priority work.
///
/// High-priority actions are observed in strict FIFO order among
/// themselves; normal-priority actions are observed in strict FIFO order
/// among themselves; a normal action is only dequeued once the high queue
/// is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Drained only once the high-priority queue is empty.
    Normal,
    /// Drained ahead of any normal-priority action.
    High,
}

/// Marker trait for actions that can be dispatched to a store.
///
/// Actions are tagged values: the concrete variant determines routing via
/// [`Action::module_tag`], a stable identifier for the module that owns it.
/// Use `#[derive(Action)]` from `reaktiv-macros` to implement this from
/// `#[action(module = "...")]` / `#[action(priority = "high")]` attributes.
pub trait Action: Clone + Debug + Send + 'static {
    /// Name used for logging and the observer interface.
    fn name(&self) -> &'static str;

    /// Stable identifier of the module that owns this action. The
    /// dispatcher uses this as a registry key; an unrecognized tag is a
    /// fatal `UnknownModuleForAction` error.
    fn module_tag(&self) -> &'static str;

    /// Dispatch priority for this action. Defaults to [`Priority::Normal`].
    fn priority(&self) -> Priority {
        Priority::Normal
    }

    /// Convenience: `true` when [`Action::priority`] is [`Priority::High`].
    fn is_high_priority(&self) -> bool {
        matches!(self.priority(), Priority::High)
    }
}

/// Object-safe counterpart of [`Action`], auto-implemented for every `T:
/// Action`. This is the form that actually travels through the priority
/// queues and the middleware chain, since the queues carry actions from
/// many different modules' action hierarchies at once.
pub trait DynAction: Debug + Send + 'static {
    /// See [`Action::name`].
    fn name(&self) -> &'static str;
    /// See [`Action::module_tag`].
    fn module_tag(&self) -> &'static str;
    /// See [`Action::priority`].
    fn priority(&self) -> Priority;
    /// Borrow as `dyn Any` so the owning module's dispatch closure can
    /// downcast back to its concrete action type.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Action> DynAction for T {
    fn name(&self) -> &'static str {
        Action::name(self)
    }

    fn module_tag(&self) -> &'static str {
        Action::module_tag(self)
    }

    fn priority(&self) -> Priority {
        Action::priority(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A type-erased action, as carried by the priority queues.
pub type BoxedAction = Box<dyn DynAction>;
