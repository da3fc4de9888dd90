//! Core runtime for reaktiv: a multi-module, priority-dispatched, reactive
//! state store.
//!
//! # Core concepts
//!
//! - [`Action`](action::Action): a routed, prioritized value dispatched to
//!   the store.
//! - [`Module`](module::Module): a module's initial state, reducer, and
//!   logic factory.
//! - [`ReactiveCell`](cell::ReactiveCell): holds one module's state and
//!   publishes every commit to subscribers.
//! - [`StoreAccessor`](accessor::StoreAccessor): the capability handle
//!   given to logic and middleware to dispatch and select state.
//! - [`Store`](store::Store) / [`StoreBuilder`](store::StoreBuilder): the
//!   running store and its construction DSL.
//!
//! # Example
//!
//! ```ignore
//! use reaktiv_core::prelude::*;
//!
//! #[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
//! struct CounterState { count: i32 }
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction { Increment }
//!
//! impl Action for CounterAction {
//!     fn name(&self) -> &'static str { "Increment" }
//!     fn module_tag(&self) -> &'static str { "Counter" }
//! }
//!
//! struct CounterModule;
//!
//! impl Module for CounterModule {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Logic = NoopLogic;
//!
//!     fn module_tag(&self) -> &'static str { "Counter" }
//!     fn initial_state(&self) -> Self::State { CounterState { count: 0 } }
//!     fn reduce(&self, state: &Self::State, _action: &Self::Action) -> Self::State {
//!         CounterState { count: state.count + 1 }
//!     }
//!     fn create_logic(&self, _accessor: StoreAccessor) -> Self::Logic { NoopLogic }
//! }
//! ```

pub mod accessor;
pub mod action;
pub mod cell;
pub mod dispatcher;
pub mod error;
pub mod external;
pub mod logic;
pub mod middleware;
pub mod module;
pub mod observer;
pub mod persistence;
pub mod registry;
pub mod store;
pub mod testing;

pub use accessor::StoreAccessor;
pub use action::{Action, Priority};
pub use cell::{ReactiveCell, StateSubscription};
pub use error::{ReaktivError, Result};
pub use external::{ExternalApplyOutcome, ExternalApplyReport};
pub use logic::{Logic, NoopLogic};
pub use middleware::{LoggingMiddleware, Middleware, MiddlewareContext};
pub use module::{Module, State, TypeRegistrar};
pub use observer::{deregister, emit, register, LogicEvent, LogicEventMeta, LogicObserver};
pub use persistence::{PersistedSnapshot, PersistenceBackend, TypeRegistry};
pub use store::{Store, StoreBuilder};
#[cfg(feature = "testing-time")]
pub use testing::{advance_time, pause_time, resume_time};

/// Convenient imports for building on top of reaktiv-core.
pub mod prelude {
    pub use crate::accessor::StoreAccessor;
    pub use crate::action::{Action, Priority};
    pub use crate::cell::StateSubscription;
    pub use crate::error::{ReaktivError, Result};
    pub use crate::logic::{Logic, NoopLogic};
    pub use crate::middleware::{LoggingMiddleware, Middleware, MiddlewareContext};
    pub use crate::module::{Module, State, TypeRegistrar};
    pub use crate::persistence::PersistenceBackend;
    pub use crate::store::{Store, StoreBuilder};
}
