//! Pipeline configuration.
//!
//! Settings come from an optional TOML file; every field has a default so
//! an empty document is a valid configuration. Command-line flags are
//! applied on top by the binary before [`PipelineConfig::validate`] runs.

use crate::catalog::{
    domain::{AdapterMode, DEFAULT_MOCK_TEMPLATE, SynthesisOptions},
    services::{RetryPolicy, RunOptions},
};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while reading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting has an unusable value.
    #[error("invalid {name}: {reason}")]
    InvalidSetting {
        /// Setting name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Settings for registry runs and adapter generation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Registry document path.
    pub registry_path: Utf8PathBuf,
    /// Directory receiving generated adapters.
    pub output_dir: Utf8PathBuf,
    /// Number of concurrent workers.
    pub max_in_flight: usize,
    /// Bound on one discovery attempt, in seconds.
    pub probe_timeout_secs: u64,
    /// Total discovery attempts per entry for transport failures.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Reconciliations between registry saves.
    pub save_every: usize,
    /// Invocation mode of generated adapters.
    pub adapter_mode: AdapterMode,
    /// Whether servers with zero tools still get an adapter.
    pub allow_empty_stub: bool,
    /// Template rendered by mock-mode adapters.
    pub mock_response_template: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            registry_path: Utf8PathBuf::from("registry.json"),
            output_dir: Utf8PathBuf::from("generated"),
            max_in_flight: 4,
            probe_timeout_secs: 30,
            max_attempts: 3,
            initial_backoff_ms: 500,
            save_every: 1,
            adapter_mode: AdapterMode::Mock,
            allow_empty_stub: false,
            mock_response_template: DEFAULT_MOCK_TEMPLATE.to_owned(),
        }
    }
}

impl PipelineConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(document)?)
    }

    /// Reads and parses the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it cannot be parsed.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let read_error = |source| ConfigError::Read {
            path: path.to_owned(),
            source,
        };
        let file_name = path
            .file_name()
            .ok_or_else(|| read_error(std::io::Error::other("path has no file name")))?;
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
        let document = dir.read_to_string(file_name).map_err(read_error)?;
        Self::from_toml_str(&document)
    }

    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSetting`] for zero workers, attempts,
    /// timeout, or save interval, and for an empty registry path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name, reason: &str| {
            Err(ConfigError::InvalidSetting {
                name,
                reason: reason.to_owned(),
            })
        };
        if self.registry_path.as_str().trim().is_empty() {
            return invalid("registry_path", "must not be empty");
        }
        if self.max_in_flight == 0 {
            return invalid("max_in_flight", "must be at least 1");
        }
        if self.probe_timeout_secs == 0 {
            return invalid("probe_timeout_secs", "must be at least 1");
        }
        if self.max_attempts == 0 {
            return invalid("max_attempts", "must be at least 1");
        }
        if self.save_every == 0 {
            return invalid("save_every", "must be at least 1");
        }
        Ok(())
    }

    /// Builds run options; `force` selects every entry.
    #[must_use]
    pub const fn run_options(&self, force: bool) -> RunOptions {
        RunOptions {
            force,
            max_in_flight: self.max_in_flight,
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            },
            save_every: self.save_every,
        }
    }

    /// Builds adapter synthesis options.
    #[must_use]
    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            mode: self.adapter_mode,
            mock_template: self.mock_response_template.clone(),
            allow_empty: self.allow_empty_stub,
        }
    }
}
