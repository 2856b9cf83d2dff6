//! Error types for authentication and session operations.
//!
//! Failures in the primary identity-provider operation always propagate to
//! the caller so the UI can render a specific message per kind. Failures in
//! best-effort directory writes are logged at the session-store boundary
//! and never surface through these types, except in the profile-edit flow
//! where the partial-failure is deliberately reported.

use cloudledger_directory::DirectoryError;
use std::fmt;

/// Errors from identity-provider operations.
///
/// Variants mirror the provider's fault categories so callers can branch
/// on them (wrong credentials vs. unconfirmed account vs. awaiting
/// activation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Wrong handle/secret combination.
    InvalidCredentials,
    /// Sign-up exists but has not been confirmed.
    UnconfirmedAccount,
    /// Account confirmed but awaiting administrative activation.
    PendingApproval,
    /// The provider could not be reached or failed the request; retryable.
    ProviderUnavailable { reason: String },
    /// Any other provider-reported failure, message passed through.
    Other { message: String },
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => {
                write!(f, "invalid credentials")
            }
            Self::UnconfirmedAccount => {
                write!(f, "account has not been confirmed")
            }
            Self::PendingApproval => {
                write!(f, "account is awaiting administrative approval")
            }
            Self::ProviderUnavailable { reason } => {
                write!(f, "identity provider unavailable: {reason}")
            }
            Self::Other { message } => {
                write!(f, "identity provider error: {message}")
            }
        }
    }
}

impl std::error::Error for IdentityError {}

/// Errors from session-store operations that go beyond a plain provider
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// An operation requiring an authenticated principal was invoked while
    /// signed out.
    NoCurrentPrincipal,
    /// The identity-provider half of the operation failed.
    Provider(IdentityError),
    /// The provider write succeeded but the matching directory write
    /// failed, leaving the two stores inconsistent. No rollback or retry is
    /// attempted.
    DirectoryWrite(DirectoryError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCurrentPrincipal => {
                write!(f, "no principal is currently signed in")
            }
            Self::Provider(err) => write!(f, "{err}"),
            Self::DirectoryWrite(err) => {
                write!(f, "profile directory write failed: {err}")
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NoCurrentPrincipal => None,
            Self::Provider(err) => Some(err),
            Self::DirectoryWrite(err) => Some(err),
        }
    }
}

impl From<IdentityError> for SessionError {
    fn from(err: IdentityError) -> Self {
        Self::Provider(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudledger_core::Handle;

    #[test]
    fn invalid_credentials_display() {
        assert_eq!(
            IdentityError::InvalidCredentials.to_string(),
            "invalid credentials"
        );
    }

    #[test]
    fn provider_unavailable_display() {
        let err = IdentityError::ProviderUnavailable {
            reason: "timeout".to_string(),
        };
        assert!(err.to_string().contains("unavailable"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn other_passes_message_through() {
        let err = IdentityError::Other {
            message: "InvalidParameterException: password too short".to_string(),
        };
        assert!(err.to_string().contains("password too short"));
    }

    #[test]
    fn no_current_principal_display() {
        assert!(
            SessionError::NoCurrentPrincipal
                .to_string()
                .contains("signed in")
        );
    }

    #[test]
    fn directory_write_wraps_source() {
        use std::error::Error;

        let err = SessionError::DirectoryWrite(DirectoryError::NotFound {
            handle: Handle::new("ana@x.com").expect("valid handle"),
        });
        assert!(err.to_string().contains("directory write failed"));
        assert!(err.source().is_some());
    }

    #[test]
    fn identity_error_converts_to_session_error() {
        let err: SessionError = IdentityError::InvalidCredentials.into();
        assert!(matches!(
            err,
            SessionError::Provider(IdentityError::InvalidCredentials)
        ));
    }
}
