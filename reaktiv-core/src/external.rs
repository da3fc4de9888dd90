//! External-state override: a privileged, atomic back door used by
//! developer-tools sync and test fixtures.

use std::collections::HashMap;

/// Outcome of applying one entry of an external-state snapshot to a single
/// module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalApplyOutcome {
    /// The incoming value was committed (directly, or through the
    /// module's [`crate::module::Module::merge_external`] hook).
    Applied,
    /// The state-type key is registered, but the incoming value did not
    /// decode into the module's state type. Logged, not propagated as an
    /// error — other entries still apply.
    TypeMismatch {
        /// Decoding error message, for diagnostics.
        reason: String,
    },
    /// The state-type key has no registered module. Ignored.
    UnknownKey,
}

/// Result of a full `apply_external_states` call: per-key diagnostics.
pub type ExternalApplyReport = HashMap<String, ExternalApplyOutcome>;
