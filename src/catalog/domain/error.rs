//! Error types for catalog domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing catalog domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogDomainError {
    /// The server name is empty after trimming.
    #[error("server name must not be empty")]
    EmptyServerName,

    /// The location string is empty after trimming.
    #[error("server location must not be empty")]
    EmptyLocation,

    /// The location does not use a supported scheme.
    #[error("server location '{0}' must start with 'http://', 'https://', or 'stdio:'")]
    UnsupportedLocation(String),

    /// The HTTP location could not be parsed as a URL.
    #[error("server location '{location}' is not a valid URL: {reason}")]
    InvalidUrl {
        /// Raw location string.
        location: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The `stdio:` location carries no command.
    #[error("stdio location must name a command")]
    EmptyStdioCommand,

    /// A tool schema name is empty after trimming.
    #[error("tool name must not be empty")]
    EmptyToolName,

    /// A tool input schema is not a JSON object.
    #[error("input schema for tool '{0}' must be a JSON object")]
    NonObjectInputSchema(String),

    /// A pending entry carries attempt data.
    #[error("entry '{0}' is not tested but carries attempt results")]
    PendingEntryHasResults(String),

    /// Two registry entries share a name.
    #[error("duplicate server name in registry: {0}")]
    DuplicateServerName(String),

    /// A run-state change is not permitted.
    #[error("invalid run transition from {from} to {to}")]
    InvalidRunTransition {
        /// Current state.
        from: String,
        /// Requested state.
        to: String,
    },
}

/// Error returned while parsing a step status from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown step status: {0}")]
pub struct ParseStepStatusError(pub String);
