//! JSON document registry store.

use crate::catalog::{
    domain::{ServerEntry, ensure_unique_names},
    ports::{RegistryStore, RegistryStoreError, RegistryStoreResult},
};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io::ErrorKind;
use tracing::debug;

/// Registry persisted as a pretty-printed JSON array.
///
/// Saves go through a uniquely named sibling temp file that is synced and
/// then renamed over the target, so readers observe either the previous or
/// the new document.
#[derive(Debug, Clone)]
pub struct JsonFileRegistryStore {
    path: Utf8PathBuf,
}

impl JsonFileRegistryStore {
    /// Creates a store for the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the document path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Renders entries as the stored document.
///
/// # Errors
///
/// Returns a serialization error from `serde_json`.
pub fn render_document(entries: &[ServerEntry]) -> Result<String, serde_json::Error> {
    let mut document = serde_json::to_string_pretty(entries)?;
    document.push('\n');
    Ok(document)
}

fn split_path(path: &Utf8Path) -> std::io::Result<(&Utf8Path, &str)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::other("registry path must include a file name"))?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    Ok((parent, file_name))
}

fn load_blocking(path: &Utf8Path) -> RegistryStoreResult<Vec<ServerEntry>> {
    let (parent, file_name) = split_path(path).map_err(RegistryStoreError::persistence)?;
    let not_found = || RegistryStoreError::NotFound(path.to_string());

    let dir = match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(err) => return Err(RegistryStoreError::persistence(err)),
    };
    let contents = match dir.read_to_string(file_name) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(err) => return Err(RegistryStoreError::persistence(err)),
    };

    let entries: Vec<ServerEntry> =
        serde_json::from_str(&contents).map_err(RegistryStoreError::invalid_persisted_data)?;
    ensure_unique_names(&entries).map_err(RegistryStoreError::invalid_persisted_data)?;
    Ok(entries)
}

fn save_blocking(path: &Utf8Path, document: &str) -> RegistryStoreResult<()> {
    let (parent, file_name) = split_path(path).map_err(RegistryStoreError::persistence)?;
    Dir::create_ambient_dir_all(parent, ambient_authority())
        .map_err(RegistryStoreError::persistence)?;
    let dir =
        Dir::open_ambient_dir(parent, ambient_authority()).map_err(RegistryStoreError::persistence)?;

    super::atomic::replace_file(&dir, file_name, document.as_bytes())
        .map_err(RegistryStoreError::persistence)
}

#[async_trait]
impl RegistryStore for JsonFileRegistryStore {
    async fn load(&self) -> RegistryStoreResult<Vec<ServerEntry>> {
        let path = self.path.clone();
        let entries = tokio::task::spawn_blocking(move || load_blocking(&path))
            .await
            .map_err(RegistryStoreError::persistence)??;
        debug!(path = %self.path, entries = entries.len(), "registry loaded");
        Ok(entries)
    }

    async fn save(&self, entries: &[ServerEntry]) -> RegistryStoreResult<()> {
        let document = render_document(entries).map_err(RegistryStoreError::persistence)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || save_blocking(&path, &document))
            .await
            .map_err(RegistryStoreError::persistence)??;
        debug!(path = %self.path, entries = entries.len(), "registry saved");
        Ok(())
    }
}
