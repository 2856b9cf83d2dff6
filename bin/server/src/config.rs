//! Centralized server configuration.
//!
//! Strongly-typed configuration loaded via the `config` crate from
//! environment variables (`__` separates nesting, e.g.
//! `SESSION__SECURE_COOKIES=false`, `USER_POOL__CLIENT_ID=...`).

use cloudledger_access::UserPoolConfig;
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Run against seeded in-memory provider/directory fixtures instead of
    /// the real backends. No database or user pool required.
    #[serde(default)]
    pub demo: bool,

    /// PostgreSQL connection URL. Required unless `demo` is set.
    pub database_url: Option<String>,

    /// Session registry configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// User-pool identity provider configuration. Required unless `demo`
    /// is set.
    pub user_pool: Option<UserPoolConfig>,
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Minutes of inactivity after which a browser session is evicted.
    #[serde(default = "default_idle_minutes")]
    pub idle_minutes: i64,

    /// Interval between idle-session eviction runs, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP
    /// development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_idle_minutes() -> i64 {
    30
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

fn default_secure_cookies() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_minutes: default_idle_minutes(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
            secure_cookies: default_secure_cookies(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let loaded: Self = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if !loaded.demo {
            if loaded.database_url.is_none() {
                return Err(config::ConfigError::Message(
                    "DATABASE_URL is required unless DEMO=true".to_string(),
                ));
            }
            if loaded.user_pool.is_none() {
                return Err(config::ConfigError::Message(
                    "USER_POOL__ENDPOINT and USER_POOL__CLIENT_ID are required unless DEMO=true"
                        .to_string(),
                ));
            }
        }

        Ok(loaded)
    }
}
