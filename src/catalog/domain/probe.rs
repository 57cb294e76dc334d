//! Discovery attempt outcome.

use super::{StepStatus, ToolSchema};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Classification of a failed or skipped discovery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    /// The location is missing or unusable; no attempt was made.
    Configuration,
    /// The server could not be reached or did not answer in time.
    Transport,
    /// The server answered with something other than a valid tool listing.
    Protocol,
}

impl ProbeErrorKind {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Transport => "transport",
            Self::Protocol => "protocol",
        }
    }
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Diagnostic detail for a failed or skipped probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeError {
    kind: ProbeErrorKind,
    detail: String,
}

impl ProbeError {
    /// Creates a probe error.
    #[must_use]
    pub fn new(kind: ProbeErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into().trim().to_owned(),
        }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::new(ProbeErrorKind::Transport, detail)
    }

    /// Creates a protocol error.
    #[must_use]
    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::new(ProbeErrorKind::Protocol, detail)
    }

    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ProbeErrorKind {
        self.kind
    }

    /// Returns the diagnostic detail.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} error: {}", self.kind, self.detail)
    }
}

/// Name and version reported by a server during initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Reported server name.
    #[serde(default)]
    pub name: Option<String>,
    /// Reported server version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Outcome of one discovery attempt.
///
/// Produced by a prober, folded into an entry by reconciliation, then
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    status: StepStatus,
    tools: Vec<ToolSchema>,
    elapsed: Duration,
    attempts: u32,
    server_info: Option<ServerInfo>,
    error: Option<ProbeError>,
}

impl ProbeResult {
    /// Creates a skipped result for an unconfigured location.
    #[must_use]
    pub fn skipped(detail: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Skipped,
            tools: Vec::new(),
            elapsed: Duration::ZERO,
            attempts: 0,
            server_info: None,
            error: Some(ProbeError::new(ProbeErrorKind::Configuration, detail)),
        }
    }

    /// Creates a successful result; `tools` may be empty.
    #[must_use]
    pub const fn success(tools: Vec<ToolSchema>, elapsed: Duration) -> Self {
        Self {
            status: StepStatus::Success,
            tools,
            elapsed,
            attempts: 1,
            server_info: None,
            error: None,
        }
    }

    /// Creates a failed result. No tools are carried.
    #[must_use]
    pub const fn failure(error: ProbeError, elapsed: Duration) -> Self {
        Self {
            status: StepStatus::Failure,
            tools: Vec::new(),
            elapsed,
            attempts: 1,
            server_info: None,
            error: Some(error),
        }
    }

    /// Attaches the server's reported identity.
    #[must_use]
    pub fn with_server_info(mut self, server_info: ServerInfo) -> Self {
        self.server_info = Some(server_info);
        self
    }

    /// Records how many attempts produced this result.
    #[must_use]
    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Returns the discovery status.
    #[must_use]
    pub const fn status(&self) -> StepStatus {
        self.status
    }

    /// Returns the enumerated tools.
    #[must_use]
    pub fn tools(&self) -> &[ToolSchema] {
        &self.tools
    }

    /// Returns the wall-clock time spent on the attempt.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns the number of attempts made.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the reported server identity, if any.
    #[must_use]
    pub const fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// Returns the error detail for skipped and failed results.
    #[must_use]
    pub const fn error(&self) -> Option<&ProbeError> {
        self.error.as_ref()
    }

    /// Returns whether a further attempt could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.status == StepStatus::Failure
            && self
                .error
                .as_ref()
                .is_some_and(|error| error.kind() == ProbeErrorKind::Transport)
    }
}
