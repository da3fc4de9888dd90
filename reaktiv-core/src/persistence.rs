//! Persistence manager: encode/decode the full state map against an
//! opaque backing storage strategy.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{ReaktivError, Result};

/// The wire shape of a persisted snapshot: state-type identifier to
/// encoded value. Each value's discriminator is implicit in which key it
/// is stored under — the registry resolves the decoder for a key, so an
/// unrecognized key at decode time fails the whole load fast, while
/// unrecognized *fields* inside a known value are tolerated because
/// `serde_json::Value` carries them structurally until the per-module
/// decoder consumes what it recognizes.
pub type PersistedSnapshot = HashMap<String, serde_json::Value>;

/// Strategy for the opaque backing storage a [`PersistenceManager`] writes
/// to and reads from. The manager itself is format-agnostic; backends only
/// move bytes.
#[async_trait]
pub trait PersistenceBackend: Send + Sync + 'static {
    /// Persist the given bytes, replacing any prior snapshot.
    async fn save(&self, bytes: Vec<u8>) -> Result<()>;

    /// Read the most recently saved bytes, or `None` if nothing has been
    /// saved yet.
    async fn load(&self) -> Result<Option<Vec<u8>>>;

    /// Query whether a snapshot exists, without decoding it.
    async fn has_persisted_state(&self) -> Result<bool>;
}

/// Encodes/decodes the full state map against a [`PersistenceBackend`].
///
/// The manager only knows about bytes and [`PersistedSnapshot`]s; the
/// store is responsible for turning a snapshot into per-module
/// `encode_state`/`load_state` calls (see [`crate::registry::ModuleInfo`]).
pub struct PersistenceManager<B: PersistenceBackend> {
    backend: B,
}

impl<B: PersistenceBackend> PersistenceManager<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Serialize `snapshot` to JSON and write it to the backend.
    pub async fn save(&self, snapshot: &PersistedSnapshot) -> Result<()> {
        let bytes = serde_json::to_vec(snapshot)
            .map_err(|e| ReaktivError::SerializationError(e.to_string()))?;
        self.backend.save(bytes).await
    }

    /// Read and decode the persisted snapshot, or `None` if absent.
    pub async fn load(&self) -> Result<Option<PersistedSnapshot>> {
        let Some(bytes) = self.backend.load().await? else {
            return Ok(None);
        };
        let snapshot: PersistedSnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| ReaktivError::SerializationError(e.to_string()))?;
        Ok(Some(snapshot))
    }

    /// Query the backend without decoding.
    pub async fn has_persisted_state(&self) -> Result<bool> {
        self.backend.has_persisted_state().await
    }
}

/// A table of nested custom-type validators contributed by modules that
/// implement [`crate::module::TypeRegistrar`], for state types that embed
/// a polymorphic tagged union as a nested field.
///
/// Registering a type here does not change how the outer state decodes
/// (that is still ordinary `serde`); it lets a module assert, at store
/// build time, which nested discriminator tags it expects to see, so a
/// custom nested codec used inside `State::reduce`-adjacent code can fail
/// fast on a tag nobody registered instead of silently dropping data.
#[derive(Default)]
pub struct TypeRegistry {
    known_tags: HashMap<&'static str, Vec<&'static str>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `tag` is a known discriminator for the nested union
    /// identified by `union_name`.
    pub fn register(&mut self, union_name: &'static str, tag: &'static str) {
        self.known_tags.entry(union_name).or_default().push(tag);
    }

    /// `true` if `tag` was registered for `union_name`.
    pub fn is_known(&self, union_name: &str, tag: &str) -> bool {
        self.known_tags
            .get(union_name)
            .is_some_and(|tags| tags.iter().any(|t| *t == tag))
    }

    /// `true` if any module registered tags under `union_name`. Used to
    /// distinguish "this module opted into tag validation and the tag is
    /// wrong" from "no module registered anything, so there's nothing to
    /// validate" — the latter must not reject values that simply don't use
    /// a registered union.
    pub fn has_registrations(&self, union_name: &str) -> bool {
        self.known_tags.contains_key(union_name)
    }
}

/// Decode a JSON value into `T`, used by the per-module `load_state`/
/// `apply_external` closures built in `store.rs`.
pub(crate) fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ReaktivError::SerializationError(e.to_string()))
}
