//! Connection address value objects.

use super::CatalogDomainError;
use std::fmt;
use url::Url;

const STDIO_PREFIX: &str = "stdio:";

/// Local process launched and spoken to over STDIO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdioLocation {
    program: String,
    args: Vec<String>,
}

impl StdioLocation {
    /// Parses a whitespace-separated command line.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogDomainError::EmptyStdioCommand`] when the command
    /// line contains no program.
    pub fn parse(command_line: &str) -> Result<Self, CatalogDomainError> {
        let mut words = command_line.split_whitespace().map(str::to_owned);
        let program = words.next().ok_or(CatalogDomainError::EmptyStdioCommand)?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    /// Returns the executable.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the command-line arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Parsed server location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLocation {
    /// Streamable HTTP endpoint.
    Http(Url),
    /// Local process over STDIO.
    Stdio(StdioLocation),
}

impl ServerLocation {
    /// Parses a raw registry location.
    ///
    /// `http://` and `https://` locations are HTTP endpoints; `stdio:`
    /// locations carry a command line. Anything else is rejected, which lets
    /// directory placeholders such as `Unknown - Listed in directories` be
    /// treated as unconfigured.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogDomainError`] when the location is empty, uses an
    /// unsupported scheme, or is not a valid URL or command line.
    pub fn parse(raw: &str) -> Result<Self, CatalogDomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CatalogDomainError::EmptyLocation);
        }

        if let Some(command_line) = trimmed.strip_prefix(STDIO_PREFIX) {
            return Ok(Self::Stdio(StdioLocation::parse(command_line)?));
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let url = Url::parse(trimmed).map_err(|error| CatalogDomainError::InvalidUrl {
                location: trimmed.to_owned(),
                reason: error.to_string(),
            })?;
            return Ok(Self::Http(url));
        }

        Err(CatalogDomainError::UnsupportedLocation(trimmed.to_owned()))
    }

    /// Returns the transport name used in logs.
    #[must_use]
    pub const fn transport(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Stdio(_) => "stdio",
        }
    }
}

impl fmt::Display for ServerLocation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(url) => write!(formatter, "{url}"),
            Self::Stdio(stdio) => {
                write!(formatter, "{STDIO_PREFIX}{}", stdio.program)?;
                for arg in &stdio.args {
                    write!(formatter, " {arg}")?;
                }
                Ok(())
            }
        }
    }
}
