//! User-pool identity provider configuration.
//!
//! Configuration for connecting to an external Cognito-style user pool.
//! The network client itself lives with the server; this crate only owns
//! the configuration shape so it can be embedded in application config.

use serde::{Deserialize, Serialize};

/// Configuration for the user-pool identity provider.
///
/// Fields with defaults can be omitted when loading from environment
/// variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPoolConfig {
    /// Base URL of the user-pool API endpoint
    /// (e.g. "https://cognito-idp.us-east-1.amazonaws.com/").
    endpoint: String,
    /// The app client ID registered with the pool. Public client, no
    /// secret: browser and gateway sign-ins use the same client.
    client_id: String,
    /// Per-request timeout in seconds.
    /// Default: 10
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    10
}

impl UserPoolConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(endpoint: String, client_id: String) -> Self {
        Self {
            endpoint,
            client_id,
            timeout_seconds: default_timeout_seconds(),
        }
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(endpoint: String, client_id: String) -> UserPoolConfigBuilder {
        UserPoolConfigBuilder::new(endpoint, client_id)
    }

    /// Returns the user-pool API endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the app client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the per-request timeout in seconds.
    #[must_use]
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}

/// Builder for `UserPoolConfig`.
#[derive(Debug)]
pub struct UserPoolConfigBuilder {
    endpoint: String,
    client_id: String,
    timeout_seconds: u64,
}

impl UserPoolConfigBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(endpoint: String, client_id: String) -> Self {
        Self {
            endpoint,
            client_id,
            timeout_seconds: default_timeout_seconds(),
        }
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Builds the `UserPoolConfig`.
    #[must_use]
    pub fn build(self) -> UserPoolConfig {
        UserPoolConfig {
            endpoint: self.endpoint,
            client_id: self.client_id,
            timeout_seconds: self.timeout_seconds,
        }
    }
}
