//! Adapter synthesis outcome.

use super::StepStatus;

/// Outcome of one adapter generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    status: StepStatus,
    artifact: Option<String>,
    error: Option<String>,
}

impl GenerationResult {
    /// Creates a successful result naming the generated artifact.
    #[must_use]
    pub fn success(artifact: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Success,
            artifact: Some(artifact.into()),
            error: None,
        }
    }

    /// Creates a failed result with a diagnostic.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Failure,
            artifact: None,
            error: Some(error.into()),
        }
    }

    /// Creates a result for a generation step that was deliberately skipped.
    #[must_use]
    pub const fn skipped() -> Self {
        Self {
            status: StepStatus::Skipped,
            artifact: None,
            error: None,
        }
    }

    /// Returns the generation status.
    #[must_use]
    pub const fn status(&self) -> StepStatus {
        self.status
    }

    /// Returns the artifact identifier for successful generations.
    #[must_use]
    pub fn artifact(&self) -> Option<&str> {
        self.artifact.as_deref()
    }

    /// Returns the failure diagnostic.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
