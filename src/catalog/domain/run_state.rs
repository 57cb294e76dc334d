//! Per-entry progress within one run.

use super::CatalogDomainError;
use std::fmt;

/// Stage an entry has reached during a run.
///
/// `Probing` may fall back to `Pending` when the run is cancelled mid-probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EntryRunState {
    /// Selected and waiting for a worker.
    #[default]
    Pending,
    /// Discovery in progress, including retries.
    Probing,
    /// Discovery found tools; an adapter is being produced.
    Generating,
    /// Discovery finished without grounds for generation.
    SkippedGeneration,
    /// Outcome folded into the registry.
    Reconciled,
}

impl EntryRunState {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Probing => "probing",
            Self::Generating => "generating",
            Self::SkippedGeneration => "skipped_generation",
            Self::Reconciled => "reconciled",
        }
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Probing)
                | (
                    Self::Probing,
                    Self::Pending | Self::Generating | Self::SkippedGeneration
                )
                | (Self::Generating | Self::SkippedGeneration, Self::Reconciled)
        )
    }

    /// Moves to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogDomainError::InvalidRunTransition`] when the
    /// transition table forbids the move.
    pub fn advance(self, target: Self) -> Result<Self, CatalogDomainError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(CatalogDomainError::InvalidRunTransition {
                from: self.as_str().to_owned(),
                to: target.as_str().to_owned(),
            })
        }
    }
}

impl fmt::Display for EntryRunState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
