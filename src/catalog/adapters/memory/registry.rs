//! In-memory registry store.

use crate::catalog::{
    domain::{ServerEntry, ensure_unique_names},
    ports::{RegistryStore, RegistryStoreError, RegistryStoreResult},
};
use async_trait::async_trait;
use std::sync::{
    Arc, RwLock,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Thread-safe in-memory registry that counts saves.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistryStore {
    entries: Arc<RwLock<Option<Vec<ServerEntry>>>>,
    saves: Arc<AtomicUsize>,
    fail_saves: Arc<AtomicBool>,
}

impl InMemoryRegistryStore {
    /// Creates a store with no registry document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `entries`.
    #[must_use]
    pub fn with_entries(entries: Vec<ServerEntry>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Some(entries))),
            ..Self::default()
        }
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Makes every later save fail with a persistence error.
    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    /// Returns the stored entries, if a registry exists.
    #[must_use]
    pub fn snapshot(&self) -> Option<Vec<ServerEntry>> {
        self.entries.read().ok().and_then(|state| state.clone())
    }
}

#[async_trait]
impl RegistryStore for InMemoryRegistryStore {
    async fn load(&self) -> RegistryStoreResult<Vec<ServerEntry>> {
        let state = self.entries.read().map_err(|err| {
            RegistryStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        let entries = state
            .clone()
            .ok_or_else(|| RegistryStoreError::NotFound("in-memory registry".to_owned()))?;
        ensure_unique_names(&entries).map_err(RegistryStoreError::invalid_persisted_data)?;
        Ok(entries)
    }

    async fn save(&self, entries: &[ServerEntry]) -> RegistryStoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RegistryStoreError::persistence(std::io::Error::other(
                "save rejected",
            )));
        }
        let mut state = self.entries.write().map_err(|err| {
            RegistryStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        *state = Some(entries.to_vec());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
