//! Module contract: initial state, reducer, logic factory.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::accessor::StoreAccessor;
use crate::action::Action;
use crate::logic::Logic;
use crate::persistence::TypeRegistry;

/// Marker bound for values that can live in a [`ReactiveCell`](crate::cell::ReactiveCell)
/// and round-trip through the persistence codec.
///
/// Blanket-implemented for any type meeting the bounds; modules do not
/// implement this directly.
pub trait State: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> State for T where T: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// A module: pure contract of initial state, reducer, and logic factory.
///
/// A reducer must be total and must not observe other modules' state; the
/// only communication a module's logic has with the rest of the store is
/// through the [`StoreAccessor`] handed to [`Module::create_logic`].
pub trait Module: Send + Sync + 'static {
    /// This module's state type. Exactly one module may register a given
    /// state type with a store (builder-time invariant).
    type State: State;

    /// This module's action hierarchy. Modules should own exactly one.
    type Action: Action;

    /// The logic value constructed after all modules' states are
    /// registered, so logic may look up any module's state or logic.
    type Logic: Logic<Self::Action>;

    /// Stable identifier for this module, matching the `module_tag` values
    /// produced by `Self::Action::module_tag`.
    fn module_tag(&self) -> &'static str;

    /// The state this module starts with.
    fn initial_state(&self) -> Self::State;

    /// Pure reduction: `(state, action) -> next state`. Must not fail and
    /// must not observe any other module's state.
    fn reduce(&self, state: &Self::State, action: &Self::Action) -> Self::State;

    /// Construct this module's logic, bound to the given accessor.
    fn create_logic(&self, accessor: StoreAccessor) -> Self::Logic;

    /// Combine the module's current state with an externally supplied
    /// state, used only by [`crate::store::Store::apply_external_states`].
    ///
    /// Default overwrites with `incoming` outright. Override to preserve
    /// locally-owned state an external snapshot can't express (e.g.
    /// non-serializable fields) instead of blindly overwriting — this is
    /// the opt-in "merge hook" the external-override contract describes.
    fn merge_external(&self, local: &Self::State, incoming: Self::State) -> Self::State {
        let _ = local;
        incoming
    }
}

/// Opt-in hook for modules whose state embeds a polymorphic nested type
/// that the persistence codec needs to know how to validate when decoding.
pub trait TypeRegistrar: Module {
    /// Contribute this module's nested custom type decoders to the store's
    /// type registry.
    fn register_types(&self, registry: &mut TypeRegistry);
}

/// Calls `M::register_types` if `M` also implements [`TypeRegistrar`],
/// otherwise does nothing — detected via trait-impl resolution rather
/// than a second builder method, so `StoreBuilder::module` stays the only
/// registration call site a module author needs.
///
/// Two non-overlapping impls, one on `&M` and one on `&&M`: calling through
/// `(&m).maybe_register_types(..)` where `m: &M` gives an expression of
/// type `&&M`, so method resolution tries the `&&M` impl (gated on
/// `TypeRegistrar`) before falling back to autoderef onto the `&M` impl
/// (gated only on `Module`, always available).
pub(crate) trait MaybeRegisterTypes<M> {
    fn maybe_register_types(self, registry: &mut TypeRegistry);
}

impl<M: Module> MaybeRegisterTypes<M> for &M {
    fn maybe_register_types(self, _registry: &mut TypeRegistry) {}
}

impl<M: TypeRegistrar> MaybeRegisterTypes<M> for &&M {
    fn maybe_register_types(self, registry: &mut TypeRegistry) {
        self.register_types(registry);
    }
}
