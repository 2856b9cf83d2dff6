//! Directory administration routes for operator consoles.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use cloudledger_core::Handle;
use cloudledger_directory::{ProfileChanges, ProfileRecord};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::extract::{RequireClientManager, RequireOperator};
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for `GET /admin/profiles`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    role: Option<String>,
    company: Option<String>,
}

/// Lists profile records by role or by company.
///
/// Exactly one filter must be given; unfiltered dumps of the directory are
/// deliberately unsupported.
pub async fn list_profiles(
    RequireClientManager(_session): RequireClientManager,
    State(app): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProfileRecord>>, ApiError> {
    let records = match (query.role, query.company) {
        (Some(role), None) => app.directory.list_by_role(&role).await?,
        (None, Some(company)) => app.directory.list_by_company(&company).await?,
        _ => {
            return Err(ApiError::BadRequest {
                message: "provide exactly one of 'role' or 'company'".to_string(),
            });
        }
    };
    Ok(Json(records))
}

/// Request body for `PUT /admin/profiles/{handle}/role`.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    role: String,
}

/// Assigns a role to a profile record.
///
/// The new role takes effect for the target user the next time their
/// profile is fetched.
pub async fn update_role(
    RequireOperator(session): RequireOperator,
    State(app): State<Arc<AppState>>,
    Path(handle): Path<String>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<ProfileRecord>, ApiError> {
    let handle = Handle::new(handle)?;

    let updated = app
        .directory
        .update(&handle, ProfileChanges::role(body.role.clone()))
        .await?;

    info!(
        target_handle = %handle,
        role = %body.role,
        operator = %operator_handle(&session),
        "role assigned"
    );
    Ok(Json(updated))
}

/// Deletes a profile record.
///
/// Removes directory metadata only; the identity-provider account is
/// untouched and the user keeps authenticating, just without any role.
pub async fn delete_profile(
    RequireOperator(session): RequireOperator,
    State(app): State<Arc<AppState>>,
    Path(handle): Path<String>,
) -> Result<StatusCode, ApiError> {
    let handle = Handle::new(handle)?;

    app.directory.delete(&handle).await?;

    info!(
        target_handle = %handle,
        operator = %operator_handle(&session),
        "profile record deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

fn operator_handle(session: &super::extract::CurrentSession) -> &str {
    session
        .state
        .principal()
        .map_or("<unknown>", |p| p.handle().as_str())
}
