//! Shared application state and the browser-session registry.

use cloudledger_access::{IdentityProvider, SessionStore};
use cloudledger_directory::ProfileDirectory;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::SessionConfig;

/// Shared application state.
pub struct AppState {
    /// Live session stores, one per browser session.
    pub registry: SessionRegistry,
    /// Profile directory, shared with the stores for admin operations.
    pub directory: Arc<dyn ProfileDirectory>,
    /// Session configuration.
    pub session_config: SessionConfig,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn ProfileDirectory>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(provider, directory.clone()),
            directory,
            session_config,
        }
    }
}

struct SessionEntry {
    store: Arc<SessionStore>,
    last_seen: Instant,
}

/// Cookie-keyed map of live session stores.
///
/// Each browser session owns one [`SessionStore`]; the registry creates it
/// on first contact (bootstrapping it before it becomes visible), hands it
/// back on subsequent requests, and evicts it after idling out.
pub struct SessionRegistry {
    provider: Arc<dyn IdentityProvider>,
    directory: Arc<dyn ProfileDirectory>,
    entries: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    /// Creates an empty registry over the given collaborators.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn ProfileDirectory>,
    ) -> Self {
        Self {
            provider,
            directory,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the store for an existing session key, refreshing its idle
    /// clock. `None` if the key is unknown (expired, evicted, or forged).
    pub async fn lookup(&self, key: &str) -> Option<Arc<SessionStore>> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(key)?;
        entry.last_seen = Instant::now();
        Some(entry.store.clone())
    }

    /// Returns the store for `key` if it is live, or creates a fresh,
    /// bootstrapped store under a new key.
    ///
    /// The returned flag is true when a new session was created and the
    /// caller must set the session cookie.
    pub async fn obtain(&self, key: Option<&str>) -> (String, Arc<SessionStore>, bool) {
        if let Some(key) = key {
            if let Some(store) = self.lookup(key).await {
                return (key.to_string(), store, false);
            }
        }

        let store = Arc::new(SessionStore::new(
            self.provider.clone(),
            self.directory.clone(),
        ));
        // Resolve the bootstrap window before anything can observe the
        // store, so guard consumers never see a spurious `Defer`.
        store.resume_session().await;

        let key = ulid::Ulid::new().to_string();
        let mut entries = self.entries.write().await;
        entries.insert(
            key.clone(),
            SessionEntry {
                store: store.clone(),
                last_seen: Instant::now(),
            },
        );
        (key, store, true)
    }

    /// Removes a session (logout or eviction).
    pub async fn remove(&self, key: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(key);
    }

    /// Evicts sessions idle for longer than `idle` and returns how many
    /// were removed.
    pub async fn evict_idle(&self, idle: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, entry| {
            let keep = entry.last_seen.elapsed() < idle;
            if !keep {
                debug!(session = %key, "evicting idle session");
            }
            keep
        });
        before - entries.len()
    }

    /// Returns the number of live sessions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
