//! reaktiv: a multi-module, priority-dispatched, reactive state store.
//!
//! Like Redux/Elm, but async and multi-module: each module owns a slice of
//! state, a pure reducer, and a logic task that can dispatch further actions
//! and read any module's state through a [`StoreAccessor`].
//!
//! # Example
//! ```ignore
//! use reaktiv::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! #[action(module = "Counter")]
//! enum CounterAction {
//!     Increment,
//! }
//!
//! #[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
//! struct CounterState { count: i32 }
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

pub use reaktiv_core::*;
pub use reaktiv_macros::Action;

pub mod prelude {
    pub use reaktiv_core::prelude::*;
    pub use reaktiv_macros::Action;
}
