//! Adapter generator that writes manifests to disk.

use super::atomic::replace_file;
use crate::catalog::{
    domain::{
        AdapterManifest, GenerationError, GenerationResult, ServerEntry, SynthesisOptions,
        ToolSchema,
    },
    ports::AdapterGenerator,
};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// File name of the manifest inside each adapter directory.
pub const MANIFEST_FILE: &str = "adapter.json";

/// Generator writing `<output>/<slug>/adapter.json` for each server.
///
/// An unchanged manifest is not rewritten. A slug already holding a
/// different server's manifest is reported as a collision. Clones share
/// one write lock, so concurrent generations see each other's manifests.
#[derive(Debug, Clone)]
pub struct FileAdapterGenerator {
    output_dir: Utf8PathBuf,
    options: SynthesisOptions,
    writes: Arc<Mutex<()>>,
}

impl FileAdapterGenerator {
    /// Creates a generator rooted at `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<Utf8PathBuf>, options: SynthesisOptions) -> Self {
        Self {
            output_dir: output_dir.into(),
            options,
            writes: Arc::default(),
        }
    }

    /// Returns the manifest path for `entry`.
    #[must_use]
    pub fn manifest_path(&self, entry: &ServerEntry) -> Utf8PathBuf {
        self.output_dir.join(entry.name().slug()).join(MANIFEST_FILE)
    }

    fn write_manifest(
        &self,
        slug: &str,
        manifest: &AdapterManifest,
    ) -> Result<(), GenerationError> {
        let document = render_manifest(manifest)?;
        // Held until the manifest is in place.
        let _write_guard = self
            .writes
            .lock()
            .map_err(|_| GenerationError::Artifact("adapter write lock poisoned".to_owned()))?;
        let dir = open_adapter_dir(&self.output_dir, slug).map_err(io_error)?;

        match dir.read_to_string(MANIFEST_FILE) {
            Ok(existing) if existing == document => {
                debug!(server = %manifest.server, "adapter unchanged");
                return Ok(());
            }
            Ok(existing) => {
                if let Some(owner) = manifest_owner(&existing)
                    && owner != manifest.server
                {
                    return Err(GenerationError::ArtifactCollision {
                        slug: slug.to_owned(),
                        owner,
                    });
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(io_error(err)),
        }

        replace_file(&dir, MANIFEST_FILE, document.as_bytes()).map_err(io_error)
    }
}

impl AdapterGenerator for FileAdapterGenerator {
    fn generate(&self, entry: &ServerEntry, tools: &[ToolSchema]) -> GenerationResult {
        let slug = entry.name().slug();
        let written = AdapterManifest::synthesize(entry, tools, &self.options)
            .and_then(|manifest| self.write_manifest(&slug, &manifest));
        match written {
            Ok(()) => GenerationResult::success(self.manifest_path(entry).into_string()),
            Err(error) => {
                warn!(server = %entry.name(), %error, "adapter generation failed");
                GenerationResult::failure(error.to_string())
            }
        }
    }

    fn permits_empty_stub(&self) -> bool {
        self.options.allow_empty
    }
}

/// Renders a manifest as its stored document.
///
/// # Errors
///
/// Returns [`GenerationError::Artifact`] when serialization fails.
pub fn render_manifest(manifest: &AdapterManifest) -> Result<String, GenerationError> {
    let mut document = serde_json::to_string_pretty(manifest)
        .map_err(|err| GenerationError::Artifact(err.to_string()))?;
    document.push('\n');
    Ok(document)
}

fn open_adapter_dir(output_dir: &Utf8Path, slug: &str) -> std::io::Result<Dir> {
    Dir::create_ambient_dir_all(output_dir, ambient_authority())?;
    let root = Dir::open_ambient_dir(output_dir, ambient_authority())?;
    root.create_dir_all(slug)?;
    root.open_dir(slug)
}

fn manifest_owner(document: &str) -> Option<String> {
    serde_json::from_str::<AdapterManifest>(document)
        .ok()
        .map(|manifest| manifest.server)
}

fn io_error(err: std::io::Error) -> GenerationError {
    GenerationError::Artifact(err.to_string())
}
