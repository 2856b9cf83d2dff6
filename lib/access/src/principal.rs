//! The authenticated principal and its credential material.

use cloudledger_core::Handle;
use serde::{Deserialize, Serialize};

/// Opaque credential material issued by the identity provider.
///
/// Tokens are never inspected by application logic; they are carried so
/// they can be handed back to the provider for validation, attribute
/// updates, and sign-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    /// Token presented on provider API calls for this principal.
    access_token: String,
    /// Identity token, if the provider issued one.
    id_token: Option<String>,
    /// Long-lived token used to mint fresh access tokens, if issued.
    refresh_token: Option<String>,
}

impl SessionTokens {
    /// Creates a token set from provider-issued values.
    #[must_use]
    pub fn new(access_token: String, id_token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            id_token,
            refresh_token,
        }
    }

    /// Returns the access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the identity token, if present.
    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    /// Returns the refresh token, if present.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }
}

/// An authenticated identity as known to the identity provider.
///
/// Created on successful sign-in or session resumption; destroyed on
/// sign-out or credential invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Login identifier the principal authenticated with.
    handle: Handle,
    /// Credential material for provider calls.
    tokens: SessionTokens,
}

impl Principal {
    /// Creates a principal from a handle and its issued tokens.
    #[must_use]
    pub fn new(handle: Handle, tokens: SessionTokens) -> Self {
        Self { handle, tokens }
    }

    /// Returns the login handle.
    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Returns the credential material.
    #[must_use]
    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }
}
