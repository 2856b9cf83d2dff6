mod auth;
mod config;
mod directory;
mod error;
mod provider;
mod state;

use axum::Router;
use axum::routing::{delete, get, post, put};
use chrono::Utc;
use cloudledger_access::{
    AccountFixture, EXECUTIVE_ROLE, IdentityProvider, MemoryIdentityProvider, OPERATIONS_ROLE,
    SUPER_ROLE,
};
use cloudledger_core::Handle;
use cloudledger_directory::{
    MemoryDirectory, NewProfile, ProfileChanges, ProfileDirectory, ProfileRecord,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::{admin, routes};
use crate::config::ServerConfig;
use crate::directory::PgProfileDirectory;
use crate::provider::UserPoolClient;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    let (identity_provider, profile_directory) = if config.demo {
        tracing::warn!("Running in demo mode against in-memory fixtures");
        demo_fixtures().await
    } else {
        production_backends(&config).await
    };

    // Create application state
    let app_state = Arc::new(AppState::new(
        identity_provider,
        profile_directory,
        config.session.clone(),
    ));

    // Spawn periodic idle-session eviction task
    let cleanup_state = app_state.clone();
    let cleanup_interval_secs = config.session.cleanup_interval_seconds;
    let idle = std::time::Duration::from_secs(config.session.idle_minutes.unsigned_abs() * 60);
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(cleanup_interval_secs));
        loop {
            interval.tick().await;
            let evicted = cleanup_state.registry.evict_idle(idle).await;
            if evicted > 0 {
                let live = cleanup_state.registry.len().await;
                tracing::debug!(
                    evicted_sessions = evicted,
                    live_sessions = live,
                    "Periodic session cleanup"
                );
            }
        }
    });

    let app = Router::new()
        // Auth routes
        .route(
            "/auth/login",
            get(routes::login_prompt).post(routes::login),
        )
        .route("/auth/signup", post(routes::signup))
        .route("/auth/confirm", post(routes::confirm))
        .route("/auth/resend", post(routes::resend))
        .route("/auth/logout", post(routes::logout))
        .route("/auth/me", get(routes::me))
        .route("/auth/profile", put(routes::update_profile))
        // Operator console routes
        .route("/admin/profiles", get(admin::list_profiles))
        .route("/admin/profiles/{handle}/role", put(admin::update_role))
        .route("/admin/profiles/{handle}", delete(admin::delete_profile))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("server error");
}

/// Connects the real backends: Postgres profile directory (running
/// migrations) and the user-pool identity provider.
async fn production_backends(
    config: &ServerConfig,
) -> (Arc<dyn IdentityProvider>, Arc<dyn ProfileDirectory>) {
    let database_url = config
        .database_url
        .as_ref()
        .expect("DATABASE_URL is required outside demo mode");

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .expect("failed to connect to database");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let user_pool = config
        .user_pool
        .clone()
        .expect("USER_POOL configuration is required outside demo mode");
    let client = UserPoolClient::new(user_pool).expect("failed to create user pool client");
    tracing::info!(
        endpoint = client.config().endpoint(),
        "User pool client ready"
    );

    (
        Arc::new(client),
        Arc::new(PgProfileDirectory::new(db_pool)),
    )
}

/// Seeds the in-memory provider and directory with demo accounts, one per
/// role tier plus one unprivileged analyst.
async fn demo_fixtures() -> (Arc<dyn IdentityProvider>, Arc<dyn ProfileDirectory>) {
    const DEMO_SECRET: &str = "ledger-demo";

    let provider = MemoryIdentityProvider::new();
    let directory = MemoryDirectory::new();

    let accounts: [(&str, Option<&str>, &str); 4] = [
        ("admin@demo.cloudledger.dev", Some(SUPER_ROLE), "Platform"),
        ("ops@demo.cloudledger.dev", Some(OPERATIONS_ROLE), "Operations"),
        ("exec@demo.cloudledger.dev", Some(EXECUTIVE_ROLE), "Leadership"),
        ("analyst@demo.cloudledger.dev", None, "Finance"),
    ];

    for (email, role, department) in accounts {
        let handle = Handle::new(email).expect("demo handle is valid");
        provider
            .seed_account(
                AccountFixture::new(handle.clone(), DEMO_SECRET)
                    .with_attribute("email", email),
            )
            .await;

        let mut record = ProfileRecord::pending(
            NewProfile::new(handle)
                .with_email(Some(email.to_string()))
                .with_company(Some("Cloudledger Demo Co".to_string()))
                .with_department(Some(department.to_string()))
                .with_role(role.map(str::to_string)),
        );
        record.apply(&ProfileChanges::verified(Utc::now()));
        directory.seed(record).await;

        tracing::info!(handle = email, secret = DEMO_SECRET, role = ?role, "Seeded demo account");
    }

    (Arc::new(provider), Arc::new(directory))
}
