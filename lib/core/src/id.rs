//! Strongly-typed identifiers for principals and profiles.
//!
//! Identity in cloudledger is keyed by the login identifier the user signs
//! in with (typically an email address), not by an internally generated ID.
//! The identity provider additionally assigns each registered account an
//! opaque subject identifier, which we carry but never interpret.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a login identifier fails validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidHandle {
    /// The reason the value was rejected.
    pub reason: &'static str,
}

impl fmt::Display for InvalidHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid handle: {}", self.reason)
    }
}

impl std::error::Error for InvalidHandle {}

/// A validated login identifier (email address or username).
///
/// Handles are the primary key for both the identity provider and the
/// profile directory. Surrounding whitespace is stripped on construction;
/// the interior is otherwise preserved byte-for-byte, and comparisons are
/// case-sensitive to match the identity provider's behavior.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// Creates a handle from a raw string, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHandle`] if the trimmed value is empty or contains
    /// interior whitespace or control characters.
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidHandle> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidHandle {
                reason: "must not be empty",
            });
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(InvalidHandle {
                reason: "must not contain whitespace or control characters",
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Handle {
    type Err = InvalidHandle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque subject identifier assigned by the identity provider at
/// registration.
///
/// Subject IDs are never parsed or compared against anything other than
/// themselves; they exist so callers can correlate platform records with
/// provider-side records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Creates a subject ID from a provider-supplied string.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Returns the subject ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
