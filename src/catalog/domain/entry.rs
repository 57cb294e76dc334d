//! Server entry aggregate root.

use super::{CatalogDomainError, ServerLocation, ServerName, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One catalogued server and the outcome of its latest test attempt.
///
/// `actually_working` is never accepted from outside: every constructor
/// derives it from `discovery_status` and `tool_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PersistedServerEntry")]
pub struct ServerEntry {
    name: ServerName,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    tested: bool,
    discovery_status: StepStatus,
    generation_status: StepStatus,
    tool_count: usize,
    actually_working: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tested_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing persisted entry state.
///
/// Any `actuallyWorking` value present in the document is read and then
/// discarded in favour of the derived verdict.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedServerEntry {
    /// Persisted server name.
    pub name: ServerName,
    /// Persisted raw location.
    #[serde(default)]
    pub location: Option<String>,
    /// Whether a test attempt has completed.
    #[serde(default)]
    pub tested: bool,
    /// Persisted discovery status.
    #[serde(default)]
    pub discovery_status: StepStatus,
    /// Persisted generation status.
    #[serde(default)]
    pub generation_status: StepStatus,
    /// Persisted tool count.
    #[serde(default)]
    pub tool_count: usize,
    /// Persisted derived flag, ignored on reconstruction.
    #[serde(default)]
    pub actually_working: bool,
    /// Persisted failure reason.
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Persisted attempt timestamp.
    #[serde(default)]
    pub tested_at: Option<DateTime<Utc>>,
}

/// Fields produced by one reconciled attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct AttemptFields {
    pub(super) discovery_status: StepStatus,
    pub(super) generation_status: StepStatus,
    pub(super) tool_count: usize,
    pub(super) failure_reason: Option<String>,
    pub(super) tested_at: DateTime<Utc>,
}

/// Returns the working verdict for a discovery outcome.
#[must_use]
pub const fn is_actually_working(discovery_status: StepStatus, tool_count: usize) -> bool {
    discovery_status.is_success() && tool_count > 0
}

impl ServerEntry {
    /// Creates a pending entry that has never been tested.
    ///
    /// A blank location is stored as absent.
    #[must_use]
    pub fn new(name: ServerName, location: Option<String>) -> Self {
        let location = location
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        Self {
            name,
            location,
            tested: false,
            discovery_status: StepStatus::NotAttempted,
            generation_status: StepStatus::NotAttempted,
            tool_count: 0,
            actually_working: false,
            failure_reason: None,
            tested_at: None,
        }
    }

    /// Reconstructs an entry from persistence.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogDomainError::PendingEntryHasResults`] when an untested
    /// entry carries statuses, a failure reason, a timestamp, or tools.
    pub fn from_persisted(data: PersistedServerEntry) -> Result<Self, CatalogDomainError> {
        let mut entry = Self {
            name: data.name,
            location: data.location,
            tested: data.tested,
            discovery_status: data.discovery_status,
            generation_status: data.generation_status,
            tool_count: data.tool_count,
            actually_working: false,
            failure_reason: data.failure_reason,
            tested_at: data.tested_at,
        };

        if !entry.tested && !entry.is_untouched() {
            return Err(CatalogDomainError::PendingEntryHasResults(
                entry.name.as_str().to_owned(),
            ));
        }

        entry.actually_working = is_actually_working(entry.discovery_status, entry.tool_count);
        if entry.actually_working {
            entry.failure_reason = None;
        }
        Ok(entry)
    }

    pub(super) fn with_attempt(&self, fields: AttemptFields) -> Self {
        let actually_working = is_actually_working(fields.discovery_status, fields.tool_count);
        Self {
            name: self.name.clone(),
            location: self.location.clone(),
            tested: true,
            discovery_status: fields.discovery_status,
            generation_status: fields.generation_status,
            tool_count: fields.tool_count,
            actually_working,
            failure_reason: if actually_working {
                None
            } else {
                fields.failure_reason
            },
            tested_at: Some(fields.tested_at),
        }
    }

    fn is_untouched(&self) -> bool {
        self.discovery_status == StepStatus::NotAttempted
            && self.generation_status == StepStatus::NotAttempted
            && self.tool_count == 0
            && self.failure_reason.is_none()
            && self.tested_at.is_none()
    }

    /// Returns the server name.
    #[must_use]
    pub const fn name(&self) -> &ServerName {
        &self.name
    }

    /// Returns the raw location, if configured.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Parses the configured location.
    ///
    /// Returns `None` when no location is configured.
    #[must_use]
    pub fn parsed_location(&self) -> Option<Result<ServerLocation, CatalogDomainError>> {
        self.location.as_deref().map(ServerLocation::parse)
    }

    /// Returns whether a test attempt has completed.
    #[must_use]
    pub const fn tested(&self) -> bool {
        self.tested
    }

    /// Returns the discovery status.
    #[must_use]
    pub const fn discovery_status(&self) -> StepStatus {
        self.discovery_status
    }

    /// Returns the generation status.
    #[must_use]
    pub const fn generation_status(&self) -> StepStatus {
        self.generation_status
    }

    /// Returns the number of tools enumerated by the latest attempt.
    #[must_use]
    pub const fn tool_count(&self) -> usize {
        self.tool_count
    }

    /// Returns the derived working verdict.
    #[must_use]
    pub const fn actually_working(&self) -> bool {
        self.actually_working
    }

    /// Returns the failure reason for a tested entry that is not working.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Returns the timestamp of the latest attempt.
    #[must_use]
    pub const fn tested_at(&self) -> Option<DateTime<Utc>> {
        self.tested_at
    }
}

impl TryFrom<PersistedServerEntry> for ServerEntry {
    type Error = CatalogDomainError;

    fn try_from(value: PersistedServerEntry) -> Result<Self, Self::Error> {
        Self::from_persisted(value)
    }
}

/// Checks that no two entries share a name.
///
/// # Errors
///
/// Returns [`CatalogDomainError::DuplicateServerName`] for the first
/// repeated name.
pub fn ensure_unique_names(entries: &[ServerEntry]) -> Result<(), CatalogDomainError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.name()) {
            return Err(CatalogDomainError::DuplicateServerName(
                entry.name().as_str().to_owned(),
            ));
        }
    }
    Ok(())
}
