//! Error taxonomy for the store runtime.

use thiserror::Error;

/// Errors surfaced by the store's public operations.
///
/// Variants map directly onto the error taxonomy of the store contract:
/// routing failures, selector failures, builder-time failures, and
/// persistence failures are each represented distinctly so callers can
/// match on the failure mode rather than parsing messages.
#[derive(Debug, Error)]
pub enum ReaktivError {
    /// `dispatch` was called after `cleanup`.
    #[error("store is closed")]
    StoreClosed,

    /// An action's `module_tag` has no registered module.
    #[error("no module registered for action tag {tag:?}")]
    UnknownModuleForAction {
        /// The unresolved `module_tag`.
        tag: &'static str,
    },

    /// `select_state` was called for an unregistered state type.
    #[error("unknown state type {requested:?}; available: {available:?}")]
    UnknownState {
        /// The requested state type identifier.
        requested: &'static str,
        /// All currently registered state type identifiers.
        available: Vec<&'static str>,
    },

    /// `select_logic` was called for an unregistered logic type.
    #[error("unknown logic type {requested:?}; available: {available:?}")]
    UnknownLogic {
        /// The requested logic type identifier.
        requested: &'static str,
        /// All currently registered logic type identifiers.
        available: Vec<&'static str>,
    },

    /// Two modules declared the same state type at build time.
    #[error("duplicate registration of state type {state_type:?}")]
    DuplicateStateRegistration {
        /// The colliding state type identifier.
        state_type: &'static str,
    },

    /// `save_state` was called without a configured persistence backend.
    #[error("no persistence backend configured")]
    NoPersistenceConfigured,

    /// Encoding or decoding the persisted snapshot failed.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// A selector was invoked and the store has not finished building.
    #[error("store has not completed initialization")]
    NotYetInitialized,

    /// The configured persistence backend reported a failure.
    #[error("persistence backend error: {0}")]
    PersistenceBackend(String),

    /// A module's [`crate::logic::Logic::handle`] returned an error.
    /// Surfaced through the observer interface as [`crate::observer::LogicEvent::Fail`];
    /// does not roll back the commit that triggered it.
    #[error("logic failed: {0}")]
    LogicFailed(String),
}

impl ReaktivError {
    /// Short, stable tag for the active variant, used as `exception_type`
    /// when a logic failure is reported through the observer interface.
    pub fn variant_name(&self) -> &'static str {
        match self {
            ReaktivError::StoreClosed => "StoreClosed",
            ReaktivError::UnknownModuleForAction { .. } => "UnknownModuleForAction",
            ReaktivError::UnknownState { .. } => "UnknownState",
            ReaktivError::UnknownLogic { .. } => "UnknownLogic",
            ReaktivError::DuplicateStateRegistration { .. } => "DuplicateStateRegistration",
            ReaktivError::NoPersistenceConfigured => "NoPersistenceConfigured",
            ReaktivError::SerializationError(_) => "SerializationError",
            ReaktivError::NotYetInitialized => "NotYetInitialized",
            ReaktivError::PersistenceBackend(_) => "PersistenceBackend",
            ReaktivError::LogicFailed(_) => "LogicFailed",
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReaktivError>;
