//! In-memory adapter generator.

use crate::catalog::{
    domain::{AdapterManifest, GenerationResult, ServerEntry, SynthesisOptions, ToolSchema},
    ports::AdapterGenerator,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Generator that synthesizes manifests and keeps them in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAdapterGenerator {
    options: SynthesisOptions,
    manifests: Arc<RwLock<HashMap<String, AdapterManifest>>>,
}

impl InMemoryAdapterGenerator {
    /// Creates a generator with the given synthesis options.
    #[must_use]
    pub fn new(options: SynthesisOptions) -> Self {
        Self {
            options,
            manifests: Arc::default(),
        }
    }

    /// Returns the manifest generated for `server`, if any.
    #[must_use]
    pub fn manifest(&self, server: &str) -> Option<AdapterManifest> {
        self.manifests
            .read()
            .ok()
            .and_then(|manifests| manifests.get(server).cloned())
    }

    /// Number of stored manifests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.manifests.read().map_or(0, |manifests| manifests.len())
    }

    /// Whether no manifest has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AdapterGenerator for InMemoryAdapterGenerator {
    fn generate(&self, entry: &ServerEntry, tools: &[ToolSchema]) -> GenerationResult {
        let manifest = match AdapterManifest::synthesize(entry, tools, &self.options) {
            Ok(manifest) => manifest,
            Err(error) => return GenerationResult::failure(error.to_string()),
        };
        let artifact = format!("memory://{}", entry.name().slug());
        match self.manifests.write() {
            Ok(mut manifests) => {
                manifests.insert(manifest.server.clone(), manifest);
                GenerationResult::success(artifact)
            }
            Err(err) => GenerationResult::failure(err.to_string()),
        }
    }

    fn permits_empty_stub(&self) -> bool {
        self.options.allow_empty
    }
}
