//! Authentication extractors for Axum.
//!
//! These translate the pure route-guard decision into HTTP semantics:
//! `Render` admits the request, `Defer` answers with a retryable status,
//! and `RedirectToLogin` becomes a redirect carrying the original target
//! in the `next` query parameter so the login flow can send the user back.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use cloudledger_access::guard::{self, AccessDecision};
use cloudledger_access::{RolePolicy, SessionState, SessionStore};
use std::sync::Arc;

use super::SESSION_COOKIE;
use crate::state::AppState;

/// An admitted request's session context.
pub struct CurrentSession {
    /// The browser session's store, for performing operations.
    pub store: Arc<SessionStore>,
    /// The snapshot the guard admitted.
    pub state: SessionState,
}

impl CurrentSession {
    /// Returns the role policy over the admitted snapshot.
    #[must_use]
    pub fn policy(&self) -> RolePolicy<'_> {
        self.state.policy()
    }
}

fn requested_target(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

async fn admit<S>(parts: &mut Parts, state: &S) -> Result<CurrentSession, AuthRejection>
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    let app = Arc::<AppState>::from_ref(state);
    let jar = CookieJar::from_request_parts(parts, state)
        .await
        .map_err(|_| AuthRejection::Internal)?;
    let target = requested_target(parts);

    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Err(AuthRejection::LoginRequired { target });
    };

    let Some(store) = app.registry.lookup(cookie.value()).await else {
        return Err(AuthRejection::LoginRequired { target });
    };

    let session_state = store.state().await;
    match guard::decide(&session_state, &target) {
        AccessDecision::Render => Ok(CurrentSession {
            store,
            state: session_state,
        }),
        AccessDecision::Defer => Err(AuthRejection::Bootstrapping),
        AccessDecision::RedirectToLogin { target } => Err(AuthRejection::LoginRequired { target }),
    }
}

/// Extractor for requiring an authenticated principal.
///
/// Unauthenticated callers are redirected to the login entry point with
/// their target preserved.
pub struct RequireAuth(pub CurrentSession);

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        admit(parts, state).await.map(RequireAuth)
    }
}

/// Extractor for optionally getting the session context.
///
/// Returns `None` if the caller is not authenticated.
pub struct OptionalAuth(pub Option<CurrentSession>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(admit(parts, state).await.ok()))
    }
}

/// Extractor for operator-only consoles (`admin` or `c3ops`).
pub struct RequireOperator(pub CurrentSession);

impl<S> FromRequestParts<S> for RequireOperator
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = admit(parts, state).await?;
        if !session.policy().is_privileged_operator() {
            return Err(AuthRejection::AccessRestricted);
        }
        Ok(RequireOperator(session))
    }
}

/// Extractor for client-management screens (`admin`, `c3ops`, or
/// `executive`).
pub struct RequireClientManager(pub CurrentSession);

impl<S> FromRequestParts<S> for RequireClientManager
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = admit(parts, state).await?;
        if !session.policy().can_manage_clients() {
            return Err(AuthRejection::AccessRestricted);
        }
        Ok(RequireClientManager(session))
    }
}

/// Rejection type for authentication extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// No authenticated session; redirect to login with the target
    /// preserved.
    LoginRequired { target: String },
    /// The session store is still bootstrapping; the caller should retry.
    Bootstrapping,
    /// Authenticated but the role policy denies this screen. Deliberately
    /// a fixed panel-style response, not an error.
    AccessRestricted,
    /// Extraction infrastructure failed.
    Internal,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::LoginRequired { target } => {
                let location = format!("/auth/login?next={}", urlencoding::encode(&target));
                Redirect::to(&location).into_response()
            }
            Self::Bootstrapping => (
                StatusCode::SERVICE_UNAVAILABLE,
                [("retry-after", "1")],
                "Session is initializing",
            )
                .into_response(),
            Self::AccessRestricted => (
                StatusCode::FORBIDDEN,
                "Access restricted: this console is limited to operations staff",
            )
                .into_response(),
            Self::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
