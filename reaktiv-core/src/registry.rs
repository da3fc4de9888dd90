//! Module registry: the three-key lookup (module / state / logic identity)
//! onto a shared `ModuleInfo` triple.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use crate::error::{ReaktivError, Result};
use crate::external::ExternalApplyOutcome;

/// A boxed future, as produced by the erased dispatch/persistence entry
/// points stored per module.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The erased per-module entry point set built generically at registration
/// time. Each closure already knows the module's concrete `State`/`Action`
/// types; callers only ever see `&'static str` tags and `TypeId`s.
///
/// One `ModuleInfo` per module, reachable by module identity, state
/// identity, or logic identity — the same triple under three keys.
pub struct ModuleInfo {
    pub(crate) module_tag: &'static str,
    pub(crate) state_type_name: &'static str,
    pub(crate) logic_type_name: &'static str,
    pub(crate) state_type_id: TypeId,
    pub(crate) logic_type_id: TypeId,

    /// Downcast the boxed action and reduce under the state-mutation lock,
    /// committing the result to the cell. Does not invoke logic; see
    /// `spawn_logic`, called separately by the base handler so the commit
    /// and the fire-and-forget logic dispatch aren't coupled to the same
    /// closure's lifetime.
    pub(crate) dispatch_action:
        Box<dyn Fn(&dyn Any) -> BoxFuture<'static, Result<()>> + Send + Sync>,

    /// Type-erased handle to the cell (`Arc<ReactiveCell<M::State>>`),
    /// downcast by `select_state::<S>()`.
    pub(crate) cell: Arc<dyn Any + Send + Sync>,

    /// Lazily populated once the store's accessor exists and
    /// `Module::create_logic` has run (`StoreBuilder::build`'s second
    /// init pass). Type-erased `Arc<M::Logic>`, downcast by
    /// `select_logic::<L>()`.
    pub(crate) logic: Arc<OnceLock<Arc<dyn Any + Send + Sync>>>,

    /// Produce the future that invokes this module's logic for one
    /// committed action, reading `logic` once it's populated. The
    /// returned future is spawned by the caller, not awaited inline.
    pub(crate) spawn_logic: Box<dyn Fn(&dyn Any) -> BoxFuture<'static, ()> + Send + Sync>,

    /// Encode the current state as a JSON value for persistence. A
    /// lock-free read through the cell's own API.
    pub(crate) encode_state: Box<dyn Fn() -> Result<serde_json::Value> + Send + Sync>,

    /// Decode a JSON value and write it directly into the cell under the
    /// state-mutation lock, bypassing actions/reducers (`load_state`).
    pub(crate) load_state:
        Box<dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<()>> + Send + Sync>,

    /// Decode, then either overwrite or run the module's merge hook, then
    /// commit under the state-mutation lock (`apply_external_states`).
    pub(crate) apply_external:
        Box<dyn Fn(serde_json::Value) -> BoxFuture<'static, ExternalApplyOutcome> + Send + Sync>,
}

/// Three lookup indices onto the same set of `ModuleInfo`s, built once at
/// store init and never mutated after — safe to read lock-free once the
/// initialization barrier has released.
#[derive(Default)]
pub struct ModuleRegistry {
    by_tag: HashMap<&'static str, Arc<ModuleInfo>>,
    by_state_type: HashMap<TypeId, Arc<ModuleInfo>>,
    by_logic_type: HashMap<TypeId, Arc<ModuleInfo>>,
}

impl ModuleRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a `ModuleInfo`, indexing it under all three keys. Returns
    /// `DuplicateStateRegistration` if the state type is already present.
    pub(crate) fn register(&mut self, info: ModuleInfo) -> Result<()> {
        if self.by_state_type.contains_key(&info.state_type_id) {
            return Err(ReaktivError::DuplicateStateRegistration {
                state_type: info.state_type_name,
            });
        }
        let info = Arc::new(info);
        self.by_tag.insert(info.module_tag, info.clone());
        self.by_state_type.insert(info.state_type_id, info.clone());
        self.by_logic_type.insert(info.logic_type_id, info);
        Ok(())
    }

    pub(crate) fn by_tag(&self, tag: &'static str) -> Result<&Arc<ModuleInfo>> {
        self.by_tag
            .get(tag)
            .ok_or(ReaktivError::UnknownModuleForAction { tag })
    }

    pub(crate) fn by_state_type_id(
        &self,
        type_id: TypeId,
        requested: &'static str,
    ) -> Result<&Arc<ModuleInfo>> {
        self.by_state_type
            .get(&type_id)
            .ok_or_else(|| ReaktivError::UnknownState {
                requested,
                available: self.state_type_names(),
            })
    }

    pub(crate) fn by_logic_type_id(
        &self,
        type_id: TypeId,
        requested: &'static str,
    ) -> Result<&Arc<ModuleInfo>> {
        self.by_logic_type
            .get(&type_id)
            .ok_or_else(|| ReaktivError::UnknownLogic {
                requested,
                available: self.logic_type_names(),
            })
    }

    pub(crate) fn all(&self) -> impl Iterator<Item = &Arc<ModuleInfo>> {
        self.by_tag.values()
    }

    /// Find a module by its state type's `type_name`, used to resolve the
    /// string keys of a [`crate::persistence::PersistedSnapshot`] back onto
    /// a module at load/apply-external time.
    pub(crate) fn by_state_type_name(&self, name: &str) -> Option<&Arc<ModuleInfo>> {
        self.by_state_type
            .values()
            .find(|info| info.state_type_name == name)
    }

    fn state_type_names(&self) -> Vec<&'static str> {
        self.by_state_type
            .values()
            .map(|i| i.state_type_name)
            .collect()
    }

    fn logic_type_names(&self) -> Vec<&'static str> {
        self.by_logic_type
            .values()
            .map(|i| i.logic_type_name)
            .collect()
    }
}
