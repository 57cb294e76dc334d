//! Discovery and generation step status.

use super::ParseStepStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one pipeline step for a server entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step has not run.
    #[default]
    NotAttempted,
    /// The step was deliberately not run.
    Skipped,
    /// The step completed.
    Success,
    /// The step ran and failed.
    Failure,
}

impl StepStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotAttempted => "not_attempted",
            Self::Skipped => "skipped",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    /// Returns whether the step completed.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for StepStatus {
    type Error = ParseStepStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "not_attempted" => Ok(Self::NotAttempted),
            "skipped" => Ok(Self::Skipped),
            "success" => Ok(Self::Success),
            "failure" | "failed" => Ok(Self::Failure),
            _ => Err(ParseStepStatusError(value.to_owned())),
        }
    }
}
