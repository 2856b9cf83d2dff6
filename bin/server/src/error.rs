//! API error mapping for server routes.
//!
//! Sign-in failures map to specific codes per kind so the console can
//! render matching copy; sign-up and confirmation failures surface the
//! provider's message directly.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cloudledger_access::{IdentityError, SessionError};
use cloudledger_core::InvalidHandle;
use cloudledger_directory::DirectoryError;
use serde::Serialize;

/// Wire shape of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Errors surfaced by API routes.
#[derive(Debug)]
pub enum ApiError {
    /// The request carried an invalid login handle.
    InvalidHandle(InvalidHandle),
    /// The request shape was wrong (missing or conflicting parameters).
    BadRequest { message: String },
    /// An identity-provider operation failed.
    Identity(IdentityError),
    /// A session-store operation failed.
    Session(SessionError),
    /// A directory operation failed.
    Directory(DirectoryError),
}

impl From<InvalidHandle> for ApiError {
    fn from(err: InvalidHandle) -> Self {
        Self::InvalidHandle(err)
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        Self::Identity(err)
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        Self::Directory(err)
    }
}

fn identity_response(err: IdentityError) -> (StatusCode, ErrorBody) {
    match err {
        IdentityError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            ErrorBody {
                error: "invalid_credentials",
                message: "Incorrect handle or password.".to_string(),
            },
        ),
        IdentityError::UnconfirmedAccount => (
            StatusCode::FORBIDDEN,
            ErrorBody {
                error: "unconfirmed_account",
                message: "This account has not been confirmed yet. Enter the code we sent you."
                    .to_string(),
            },
        ),
        IdentityError::PendingApproval => (
            StatusCode::FORBIDDEN,
            ErrorBody {
                error: "pending_approval",
                message: "This account is awaiting administrator approval.".to_string(),
            },
        ),
        IdentityError::ProviderUnavailable { reason } => {
            tracing::error!(%reason, "identity provider unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    error: "provider_unavailable",
                    message: "The sign-in service is temporarily unavailable. Please retry."
                        .to_string(),
                },
            )
        }
        IdentityError::Other { message } => (
            StatusCode::BAD_GATEWAY,
            ErrorBody {
                error: "identity_provider_error",
                message,
            },
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::InvalidHandle(err) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "invalid_handle",
                    message: err.to_string(),
                },
            ),
            Self::BadRequest { message } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "bad_request",
                    message,
                },
            ),
            Self::Identity(err) => identity_response(err),
            Self::Session(SessionError::NoCurrentPrincipal) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error: "no_current_principal",
                    message: "You are not signed in.".to_string(),
                },
            ),
            Self::Session(SessionError::Provider(err)) => identity_response(err),
            Self::Session(SessionError::DirectoryWrite(err)) => {
                tracing::warn!(error = %err, "directory write failed after provider update");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        error: "directory_write_failed",
                        message:
                            "Your identity was updated but the profile directory was not. Retry to bring them back in sync."
                                .to_string(),
                    },
                )
            }
            Self::Directory(DirectoryError::NotFound { handle }) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "profile_not_found",
                    message: format!("No profile record for '{handle}'."),
                },
            ),
            Self::Directory(DirectoryError::AlreadyExists { handle }) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    error: "profile_exists",
                    message: format!("A profile record for '{handle}' already exists."),
                },
            ),
            Self::Directory(err) => {
                tracing::error!(error = %err, "directory operation failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody {
                        error: "directory_unavailable",
                        message: "The profile directory is temporarily unavailable.".to_string(),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
