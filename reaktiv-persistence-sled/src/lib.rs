//! `sled`-backed [`PersistenceBackend`] for reaktiv.
//!
//! Stores the whole encoded snapshot under a single key in a dedicated
//! tree, so a store's entire persisted state is one `sled` value. `sled`'s
//! API is synchronous; every call here runs on `spawn_blocking` so it
//! never stalls the async runtime's worker threads.

use reaktiv_core::{ReaktivError, Result};

const SNAPSHOT_KEY: &[u8] = b"reaktiv/snapshot";

/// A [`PersistenceBackend`](reaktiv_core::PersistenceBackend) backed by a
/// `sled` database opened at a given path.
pub struct SledBackend {
    db: sled::Db,
}

impl SledBackend {
    /// Open (or create) a `sled` database at `path`.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let db = sled::open(path).map_err(backend_error)?;
        Ok(Self { db })
    }

    /// Wrap an already-open `sled::Db`.
    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }
}

fn backend_error(e: sled::Error) -> ReaktivError {
    ReaktivError::PersistenceBackend(e.to_string())
}

#[async_trait::async_trait]
impl reaktiv_core::PersistenceBackend for SledBackend {
    async fn save(&self, bytes: Vec<u8>) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            db.insert(SNAPSHOT_KEY, bytes).map_err(backend_error)?;
            db.flush().map_err(backend_error)?;
            Ok(())
        })
        .await
        .map_err(|e| ReaktivError::PersistenceBackend(e.to_string()))?
    }

    async fn load(&self) -> Result<Option<Vec<u8>>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>> {
            Ok(db
                .get(SNAPSHOT_KEY)
                .map_err(backend_error)?
                .map(|ivec| ivec.to_vec()))
        })
        .await
        .map_err(|e| ReaktivError::PersistenceBackend(e.to_string()))?
    }

    async fn has_persisted_state(&self) -> Result<bool> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.contains_key(SNAPSHOT_KEY).map_err(backend_error))
            .await
            .map_err(|e| ReaktivError::PersistenceBackend(e.to_string()))?
    }
}
