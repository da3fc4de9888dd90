//! Store accessor: the stable handle given to every module's logic and to
//! middleware.

use std::any::TypeId;
use std::sync::Arc;

use crate::action::Action;
use crate::cell::{ReactiveCell, StateSubscription};
use crate::error::{ReaktivError, Result};
use crate::module::State;
use crate::persistence::TypeRegistry;
use crate::store::StoreInner;

/// Stable capability handle used by logic and middleware to communicate
/// with the store. Never exposes the internal registry or the
/// state-mutation lock directly.
///
/// Cheaply `Clone` — internally an `Arc` to the store's shared state.
#[derive(Clone)]
pub struct StoreAccessor {
    pub(crate) inner: Arc<StoreInner>,
}

impl StoreAccessor {
    /// Non-blocking enqueue of `action` onto the high- or normal-priority
    /// queue, per its [`Action::priority`]. Fails if the store has been
    /// [`crate::store::Store::cleanup`]'d.
    pub fn dispatch<A: Action>(&self, action: A) -> Result<()> {
        self.inner.dispatch_boxed(Box::new(action))
    }

    /// Await the initialization barrier, then return a subscription to
    /// `S`'s committed values. The first emission is the current value.
    pub async fn select_state<S: State>(&self) -> Result<StateSubscription<S>> {
        self.inner.wait_for_init().await;
        self.select_state_now::<S>()
    }

    /// Non-suspending variant of [`StoreAccessor::select_state`], for
    /// callers that can guarantee initialization has already completed
    /// (e.g. code running after `StoreBuilder::build` has returned).
    pub fn select_state_now<S: State>(&self) -> Result<StateSubscription<S>> {
        let type_id = TypeId::of::<S>();
        let info = self
            .inner
            .registry
            .by_state_type_id(type_id, std::any::type_name::<S>())?;
        let cell = info
            .cell
            .clone()
            .downcast::<ReactiveCell<S>>()
            .map_err(|_| ReaktivError::UnknownState {
                requested: std::any::type_name::<S>(),
                available: vec![],
            })?;
        Ok(cell.subscribe())
    }

    /// Await the initialization barrier, then return the constructed
    /// logic handle of type `L`.
    pub async fn select_logic<L: Send + Sync + 'static>(&self) -> Result<Arc<L>> {
        self.inner.wait_for_init().await;
        let type_id = TypeId::of::<L>();
        let info = self
            .inner
            .registry
            .by_logic_type_id(type_id, std::any::type_name::<L>())?;
        let logic = info
            .logic
            .get()
            .ok_or(ReaktivError::NotYetInitialized)?
            .clone();
        logic.downcast::<L>().map_err(|_| ReaktivError::UnknownLogic {
            requested: std::any::type_name::<L>(),
            available: vec![],
        })
    }

    /// The store-wide type registry assembled from every registered
    /// module's [`crate::module::TypeRegistrar::register_types`] at build
    /// time. Lets a module's own nested codec (reached from `reduce` or
    /// logic) check whether a tag it encounters is one any module declared.
    pub fn type_registry(&self) -> &Arc<TypeRegistry> {
        &self.inner.type_registry
    }
}
