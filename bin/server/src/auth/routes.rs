//! Authentication routes: login, signup, confirmation, logout, profile.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cloudledger_access::{Attribute, SignIn, SignUpRequest};
use cloudledger_core::Handle;
use cloudledger_directory::ProfileRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::Duration as TimeDuration;

use super::SESSION_COOKIE;
use super::extract::{OptionalAuth, RequireAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    handle: String,
    secret: String,
}

/// Response body for `POST /auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    status: &'static str,
    handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<ProfileRecord>,
}

/// Query parameters for the login entry point.
#[derive(Debug, Deserialize)]
pub struct LoginPromptQuery {
    /// Navigation target preserved by the route guard's redirect.
    next: Option<String>,
}

/// Response body for `GET /auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginPrompt {
    status: &'static str,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<String>,
}

fn session_cookie(app: &AppState, key: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, key))
        .path("/")
        .http_only(true)
        .secure(app.session_config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(app.session_config.idle_minutes))
        .build()
}

/// The login entry point the route guard redirects to.
///
/// The console renders its sign-in form here; the `next` parameter is
/// echoed back so a successful sign-in can return the user to where they
/// were headed. An already-authenticated caller is told so instead of
/// being shown the form again.
pub async fn login_prompt(
    OptionalAuth(session): OptionalAuth,
    Query(query): Query<LoginPromptQuery>,
) -> impl IntoResponse {
    if session.is_some() {
        return (
            StatusCode::OK,
            Json(LoginPrompt {
                status: "already_signed_in",
                message: "You are already signed in.",
                next: query.next,
            }),
        );
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(LoginPrompt {
            status: "authentication_required",
            message: "Sign in to continue.",
            next: query.next,
        }),
    )
}

/// Authenticates a handle/secret pair against the browser session's store.
pub async fn login(
    State(app): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let handle = Handle::new(body.handle)?;

    let cookie_key = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let (key, store, created) = app.registry.obtain(cookie_key.as_deref()).await;

    let outcome = store.sign_in(&handle, &body.secret).await?;

    let jar = if created {
        jar.add(session_cookie(&app, key))
    } else {
        jar
    };

    let response = match outcome {
        SignIn::Completed(principal) => {
            let state = store.state().await;
            LoginResponse {
                status: "signed_in",
                handle: principal.handle().to_string(),
                profile: state.profile().cloned(),
            }
        }
        SignIn::NewCredentialRequired { handle } => LoginResponse {
            status: "new_credential_required",
            handle: handle.to_string(),
            profile: None,
        },
    };

    Ok((jar, Json(response)))
}

/// Request body for `POST /auth/signup`.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    handle: String,
    secret: String,
    email: String,
    company: Option<String>,
    department: Option<String>,
}

/// Response body for `POST /auth/signup`.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    subject_id: String,
}

/// Registers a new account and best-effort creates its profile record.
pub async fn signup(
    State(app): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let handle = Handle::new(body.handle)?;

    let cookie_key = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let (_, store, _) = app.registry.obtain(cookie_key.as_deref()).await;

    let outcome = store
        .sign_up(SignUpRequest {
            handle,
            secret: body.secret,
            email: body.email,
            company: body.company,
            department: body.department,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            subject_id: outcome.subject_id.to_string(),
        }),
    ))
}

/// Request body for `POST /auth/confirm`.
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    handle: String,
    code: String,
}

/// Submits a sign-up confirmation code.
pub async fn confirm(
    State(app): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<ConfirmRequest>,
) -> Result<StatusCode, ApiError> {
    let handle = Handle::new(body.handle)?;

    let cookie_key = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let (_, store, _) = app.registry.obtain(cookie_key.as_deref()).await;

    store.confirm_registration(&handle, &body.code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Request body for `POST /auth/resend`.
#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    handle: String,
}

/// Requests a fresh confirmation code.
pub async fn resend(
    State(app): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<ResendRequest>,
) -> Result<StatusCode, ApiError> {
    let handle = Handle::new(body.handle)?;

    let cookie_key = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let (_, store, _) = app.registry.obtain(cookie_key.as_deref()).await;

    store.resend_confirmation_code(&handle).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Signs out and drops the browser session.
///
/// Unconditionally effective: the cookie and registry entry are removed
/// even if the provider-side invalidation fails.
pub async fn logout(State(app): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let key = cookie.value().to_string();
        if let Some(store) = app.registry.lookup(&key).await {
            store.sign_out().await;
        }
        app.registry.remove(&key).await;
    }

    let remove_session = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(TimeDuration::ZERO);

    (jar.add(remove_session), StatusCode::NO_CONTENT)
}

/// Response body for `GET /auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<ProfileRecord>,
    privileged_operator: bool,
    can_manage_clients: bool,
}

/// Returns the signed-in principal and its role evaluation.
pub async fn me(RequireAuth(session): RequireAuth) -> Result<Json<MeResponse>, ApiError> {
    // Admitted snapshots always carry a principal.
    let Some(principal) = session.state.principal() else {
        return Err(ApiError::Session(
            cloudledger_access::SessionError::NoCurrentPrincipal,
        ));
    };

    let policy = session.policy();
    Ok(Json(MeResponse {
        handle: principal.handle().to_string(),
        profile: session.state.profile().cloned(),
        privileged_operator: policy.is_privileged_operator(),
        can_manage_clients: policy.can_manage_clients(),
    }))
}

/// Request body for `PUT /auth/profile`.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    email: Option<String>,
    phone_number: Option<String>,
    company: Option<String>,
    department: Option<String>,
}

/// Pushes attribute updates for the signed-in principal.
pub async fn update_profile(
    RequireAuth(session): RequireAuth,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<StatusCode, ApiError> {
    let mut attributes = Vec::new();
    if let Some(email) = body.email {
        attributes.push(Attribute::new("email", email));
    }
    if let Some(phone_number) = body.phone_number {
        attributes.push(Attribute::new("phone_number", phone_number));
    }
    if let Some(company) = body.company {
        attributes.push(Attribute::new("custom:company", company));
    }
    if let Some(department) = body.department {
        attributes.push(Attribute::new("custom:department", department));
    }

    if attributes.is_empty() {
        return Err(ApiError::BadRequest {
            message: "no attributes to update".to_string(),
        });
    }

    session.store.update_profile_attributes(&attributes).await?;
    Ok(StatusCode::NO_CONTENT)
}
