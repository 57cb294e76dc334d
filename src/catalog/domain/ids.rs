//! Validated server name type.

use super::CatalogDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable server label, unique within a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerName(String);

impl ServerName {
    /// Creates a validated server name.
    ///
    /// The input is trimmed; case and inner punctuation are preserved.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogDomainError::EmptyServerName`] when the trimmed value
    /// is empty.
    pub fn new(value: impl Into<String>) -> Result<Self, CatalogDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(CatalogDomainError::EmptyServerName);
        }
        Ok(Self(normalized))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a filesystem-safe form of the name.
    ///
    /// ASCII alphanumerics are lowercased and kept; every run of other
    /// characters becomes a single `-`, and leading or trailing dashes are
    /// removed. A name without any alphanumerics maps to `server`.
    #[must_use]
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.0.len());
        for character in self.0.chars() {
            if character.is_ascii_alphanumeric() {
                slug.push(character.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        if slug.is_empty() {
            return "server".to_owned();
        }
        slug
    }
}

impl TryFrom<String> for ServerName {
    type Error = CatalogDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ServerName> for String {
    fn from(value: ServerName) -> Self {
        value.0
    }
}

impl AsRef<str> for ServerName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
