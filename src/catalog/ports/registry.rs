//! Registry persistence port.

use crate::catalog::domain::ServerEntry;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for registry store operations.
pub type RegistryStoreResult<T> = Result<T, RegistryStoreError>;

/// Persistence contract for the server registry.
///
/// Implementations preserve entry order and replace the whole document on
/// every save.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Loads every entry in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryStoreError::NotFound`] when no registry exists,
    /// [`RegistryStoreError::InvalidPersistedData`] when the document cannot
    /// be decoded or violates entry invariants, or
    /// [`RegistryStoreError::Persistence`] for storage failures.
    async fn load(&self) -> RegistryStoreResult<Vec<ServerEntry>>;

    /// Replaces the stored registry with `entries`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryStoreError::Persistence`] when the document cannot
    /// be written.
    async fn save(&self, entries: &[ServerEntry]) -> RegistryStoreResult<()>;
}

/// Errors returned by registry store implementations.
#[derive(Debug, Clone, Error)]
pub enum RegistryStoreError {
    /// No registry document exists.
    #[error("registry not found: {0}")]
    NotFound(String),

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted registry data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Storage-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RegistryStoreError {
    /// Wraps persisted-data decoding or validation failures.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a storage-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
