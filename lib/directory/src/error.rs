//! Error types for profile directory operations.

use cloudledger_core::Handle;
use std::fmt;

/// Errors from profile directory operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// No record exists for the handle.
    NotFound { handle: Handle },
    /// A record already exists for the handle.
    AlreadyExists { handle: Handle },
    /// The backing store could not be reached or failed the request.
    Unavailable { reason: String },
    /// A stored record could not be decoded into a `ProfileRecord`.
    Corrupt { reason: String },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { handle } => {
                write!(f, "no profile record for '{handle}'")
            }
            Self::AlreadyExists { handle } => {
                write!(f, "profile record for '{handle}' already exists")
            }
            Self::Unavailable { reason } => {
                write!(f, "profile directory unavailable: {reason}")
            }
            Self::Corrupt { reason } => {
                write!(f, "stored profile record is corrupt: {reason}")
            }
        }
    }
}

impl std::error::Error for DirectoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(s: &str) -> Handle {
        Handle::new(s).expect("valid handle")
    }

    #[test]
    fn not_found_display() {
        let err = DirectoryError::NotFound {
            handle: handle("ana@x.com"),
        };
        assert!(err.to_string().contains("no profile record"));
        assert!(err.to_string().contains("ana@x.com"));
    }

    #[test]
    fn unavailable_display() {
        let err = DirectoryError::Unavailable {
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("unavailable"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn already_exists_display() {
        let err = DirectoryError::AlreadyExists {
            handle: handle("ana@x.com"),
        };
        assert!(err.to_string().contains("already exists"));
    }
}
