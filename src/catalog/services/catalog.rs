//! Registry editing and reporting.

use crate::catalog::{
    domain::{CatalogDomainError, CatalogReport, ReportOutcome, ServerEntry, ServerName},
    ports::{RegistryStore, RegistryStoreError},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Service-level errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] CatalogDomainError),
    /// Registry store operation failed.
    #[error(transparent)]
    Store(#[from] RegistryStoreError),
    /// An entry with this name already exists.
    #[error("server '{0}' is already catalogued")]
    DuplicateName(ServerName),
}

/// Result type for catalog service operations.
pub type CatalogServiceResult<T> = Result<T, CatalogServiceError>;

/// Adds entries to the registry and summarizes it.
#[derive(Clone)]
pub struct CatalogService<R>
where
    R: RegistryStore,
{
    store: Arc<R>,
}

impl<R> CatalogService<R>
where
    R: RegistryStore,
{
    /// Creates a catalog service.
    #[must_use]
    pub const fn new(store: Arc<R>) -> Self {
        Self { store }
    }

    /// Appends a pending entry, creating the registry when none exists.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogServiceError::DuplicateName`] when the name is
    /// taken, a domain error for an empty name, or store errors.
    pub async fn add_entry(
        &self,
        name: &str,
        location: Option<String>,
    ) -> CatalogServiceResult<ServerEntry> {
        let server_name = ServerName::new(name)?;
        let mut entries = match self.store.load().await {
            Ok(entries) => entries,
            Err(RegistryStoreError::NotFound(_)) => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        if entries.iter().any(|entry| entry.name() == &server_name) {
            return Err(CatalogServiceError::DuplicateName(server_name));
        }

        let entry = ServerEntry::new(server_name, location);
        entries.push(entry.clone());
        self.store.save(&entries).await?;
        info!(server = %entry.name(), total = entries.len(), "entry added");
        Ok(entry)
    }

    /// Summarizes the registry.
    ///
    /// # Errors
    ///
    /// Returns store errors other than a missing registry.
    pub async fn report(&self) -> CatalogServiceResult<ReportOutcome> {
        let entries = match self.store.load().await {
            Ok(entries) => entries,
            Err(RegistryStoreError::NotFound(_)) => return Ok(ReportOutcome::NoRegistry),
            Err(err) => return Err(err.into()),
        };
        if entries.is_empty() {
            return Ok(ReportOutcome::Empty);
        }
        Ok(ReportOutcome::Populated(CatalogReport::from_entries(
            &entries,
        )))
    }
}
