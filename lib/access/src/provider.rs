//! The identity-provider contract.
//!
//! The provider owns credentials: registration, confirmation, sign-in,
//! attribute updates, and credential invalidation. The session store is its
//! only caller; screens never talk to the provider directly.

use async_trait::async_trait;
use cloudledger_core::{Handle, SubjectId};
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::principal::{Principal, SessionTokens};

/// A named attribute pushed to or pulled from the identity provider.
///
/// Attribute names follow the provider's vocabulary (`email`,
/// `phone_number`, `custom:company`, ...); the platform treats them as
/// opaque pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    /// Creates an attribute pair.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Outcome of a provider sign-in call that did not fail.
///
/// A "new credential required" signal is a successful call, not an error:
/// the caller routes the user into a credential-reset flow rather than
/// showing a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInResponse {
    /// Credentials accepted; tokens issued.
    Tokens(SessionTokens),
    /// The provider requires the user to set a new secret before tokens
    /// can be issued.
    NewCredentialRequired,
}

/// External identity provider contract.
///
/// All methods are suspend points; implementations must be shareable
/// across tasks.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Checks whether a previously-authenticated principal can be resumed
    /// from persisted credential material.
    ///
    /// Returns `Ok(None)` when nothing is resumable. Implementations that
    /// do not persist credentials simply always return `Ok(None)`.
    async fn resume_session(&self) -> Result<Option<Principal>, IdentityError>;

    /// Checks whether the principal's credential material is still valid.
    async fn validate(&self, principal: &Principal) -> Result<bool, IdentityError>;

    /// Authenticates a handle/secret pair.
    async fn sign_in(&self, handle: &Handle, secret: &str)
    -> Result<SignInResponse, IdentityError>;

    /// Registers a new account and returns the provider-assigned subject.
    async fn register(
        &self,
        handle: &Handle,
        secret: &str,
        attributes: &[Attribute],
    ) -> Result<SubjectId, IdentityError>;

    /// Submits a sign-up confirmation code.
    async fn confirm_registration(&self, handle: &Handle, code: &str)
    -> Result<(), IdentityError>;

    /// Requests a fresh confirmation code for an unconfirmed account.
    async fn resend_code(&self, handle: &Handle) -> Result<(), IdentityError>;

    /// Pushes attribute updates for an authenticated principal.
    async fn update_attributes(
        &self,
        principal: &Principal,
        attributes: &[Attribute],
    ) -> Result<(), IdentityError>;

    /// Invalidates the principal's credentials provider-side.
    async fn sign_out(&self, principal: &Principal) -> Result<(), IdentityError>;
}
