//! Device-local cache of the catalog
//!
//! The whole catalog lives in one JSON document under a fixed key of a
//! key-value store. It is always read and written as a whole.

mod kv;
mod sqlite;

pub use kv::{KeyValueStore, MemoryStore};
pub use sqlite::SqliteStore;

use crate::models::{CacheSnapshot, Provenance};
use crate::Result;

/// Storage key of the catalog document
pub const STORAGE_KEY: &str = "powderfiles_db_v1";

/// What to persist when no usable document exists yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialContents {
    /// Demo resort + trip, used while signed out
    Seeded,
    /// Nothing, used while signed in
    Empty,
}

/// JSON snapshot store on top of a key-value backend
#[derive(Debug)]
pub struct LocalCache<S: KeyValueStore> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> LocalCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, STORAGE_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Load the persisted snapshot, if a usable one exists.
    ///
    /// Backend failures and unparseable documents both count as absent.
    /// Collections that are not arrays are repaired to empty ones.
    pub fn load(&self) -> Option<CacheSnapshot> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!("Failed to read local cache {}: {}", self.key, error);
                return None;
            }
        };

        match CacheSnapshot::from_document(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                tracing::warn!(
                    "Ignoring unreadable local cache document {}: {}",
                    self.key,
                    error
                );
                None
            }
        }
    }

    /// Last persisted snapshot, initializing (and persisting) one when none
    /// exists. Never fails; a failed initial write is logged.
    pub fn read(&self, initial: InitialContents) -> CacheSnapshot {
        if let Some(snapshot) = self.load() {
            return snapshot;
        }

        let snapshot = match initial {
            InitialContents::Seeded => {
                tracing::info!("Seeding local cache with demo content");
                CacheSnapshot::seeded(crate::util::unix_millis_now())
            }
            InitialContents::Empty => CacheSnapshot::empty(Provenance::Local),
        };
        if let Err(error) = self.write(&snapshot) {
            tracing::warn!("Failed to persist initial local cache: {}", error);
        }
        snapshot
    }

    /// Persist the full snapshot, replacing any prior value.
    pub fn write(&self, snapshot: &CacheSnapshot) -> Result<()> {
        let raw = serde_json::to_string(snapshot)?;
        self.store.set(&self.key, &raw)
    }

    /// Clear persisted state.
    pub fn reset(&self) -> Result<()> {
        self.store.remove(&self.key)
    }

    pub const fn store(&self) -> &S {
        &self.store
    }
}
