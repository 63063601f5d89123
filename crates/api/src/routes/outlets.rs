//! Outlet routes: listing, management, and staff assignment.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::common::{
    ApiResult, created, double_option, internal_error, json_error, not_found, ok, require_member,
    require_outlet, require_permission, require_within_limit, validate,
};
use crate::{AppState, middleware::AuthUser};
use restaurantek_db::OutletRepository;
use restaurantek_db::repositories::{OutletError, OutletRemoval, ResourceLimit, UpdateOutletInput};

/// Creates the outlets router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/{org_id}/outlets",
            get(list_outlets).post(create_outlet),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}",
            get(get_outlet).patch(update_outlet).delete(delete_outlet),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/users",
            get(list_outlet_users).post(assign_user),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/users/{user_id}",
            delete(unassign_user),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct CreateOutletRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    name: String,
    address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateOutletRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    address: Option<Option<String>>,
    is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct AssignUserRequest {
    user_id: Uuid,
}

/// Maps outlet errors to responses.
pub(super) fn outlet_error(e: OutletError) -> Response {
    match &e {
        OutletError::NotFound(_) => not_found("Outlet"),
        OutletError::DuplicateName(name) => json_error(
            StatusCode::CONFLICT,
            "duplicate_name",
            format!("An outlet named '{name}' already exists"),
        ),
        OutletError::LastOutlet => json_error(
            StatusCode::BAD_REQUEST,
            "last_outlet",
            "Cannot remove the last active outlet",
        ),
        OutletError::UserNotMember(_) => json_error(
            StatusCode::BAD_REQUEST,
            "not_member",
            "User is not a member of this organization",
        ),
        OutletError::Database(_) => internal_error("Outlet operation failed", &e),
    }
}

/// GET `/organizations/{org_id}/outlets` - Outlets visible to the caller.
async fn list_outlets(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
) -> ApiResult {
    let role = require_member(&state, org_id, auth.user_id()).await?;
    let outlet_repo = OutletRepository::new((*state.db).clone());

    let outlets = outlet_repo
        .list(org_id, auth.user_id(), role)
        .await
        .map_err(|e| internal_error("Failed to list outlets", &e))?;

    ok(outlets)
}

/// POST `/organizations/{org_id}/outlets` - Create an outlet (admin+).
async fn create_outlet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(payload): Json<CreateOutletRequest>,
) -> ApiResult {
    let role = require_member(&state, org_id, auth.user_id()).await?;
    require_permission(
        role.can_manage_members(),
        "You need admin or owner role to create outlets",
    )?;
    validate(&payload)?;
    require_within_limit(&state, org_id, ResourceLimit::Outlets).await?;

    let outlet_repo = OutletRepository::new((*state.db).clone());
    let outlet = outlet_repo
        .create(org_id, &payload.name, payload.address)
        .await
        .map_err(outlet_error)?;

    info!(org_id = %org_id, outlet_id = %outlet.id, "Outlet created");
    created(outlet)
}

/// GET `/organizations/{org_id}/outlets/{outlet_id}`
async fn get_outlet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    let (_, outlet) = require_outlet(&state, org_id, outlet_id, auth.user_id()).await?;
    ok(outlet)
}

/// PATCH `/organizations/{org_id}/outlets/{outlet_id}` - Rename, readdress, or (de)activate.
async fn update_outlet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateOutletRequest>,
) -> ApiResult {
    let (role, outlet) = require_outlet(&state, org_id, outlet_id, auth.user_id()).await?;
    require_permission(
        role.can_manage_members(),
        "You need admin or owner role to update outlets",
    )?;
    validate(&payload)?;
    if payload.is_active == Some(true) && !outlet.is_active {
        require_within_limit(&state, org_id, ResourceLimit::Outlets).await?;
    }

    let outlet_repo = OutletRepository::new((*state.db).clone());
    let outlet = outlet_repo
        .update(
            org_id,
            outlet_id,
            UpdateOutletInput {
                name: payload.name,
                address: payload.address,
                is_active: payload.is_active,
            },
        )
        .await
        .map_err(outlet_error)?;

    info!(org_id = %org_id, outlet_id = %outlet_id, "Outlet updated");
    ok(outlet)
}

/// DELETE `/organizations/{org_id}/outlets/{outlet_id}`
///
/// Outlets holding products or recipes are deactivated rather than deleted.
async fn delete_outlet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    let role = require_member(&state, org_id, auth.user_id()).await?;
    require_permission(
        role.can_manage_members(),
        "You need admin or owner role to delete outlets",
    )?;

    let outlet_repo = OutletRepository::new((*state.db).clone());
    let removal = outlet_repo
        .delete(org_id, outlet_id)
        .await
        .map_err(outlet_error)?;

    info!(org_id = %org_id, outlet_id = %outlet_id, ?removal, "Outlet removed");
    match removal {
        OutletRemoval::Deleted => Ok(StatusCode::NO_CONTENT.into_response()),
        OutletRemoval::Deactivated => ok(json!({
            "id": outlet_id,
            "deactivated": true,
            "message": "Outlet has products or recipes and was deactivated instead"
        })),
    }
}

/// GET `/organizations/{org_id}/outlets/{outlet_id}/users` - Staff assigned to the outlet.
async fn list_outlet_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    require_outlet(&state, org_id, outlet_id, auth.user_id()).await?;
    let outlet_repo = OutletRepository::new((*state.db).clone());

    let users = outlet_repo
        .list_users(outlet_id)
        .await
        .map_err(|e| internal_error("Failed to list outlet users", &e))?;

    ok(users)
}

/// POST `/organizations/{org_id}/outlets/{outlet_id}/users` - Assign a member (admin+).
async fn assign_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AssignUserRequest>,
) -> ApiResult {
    let role = require_member(&state, org_id, auth.user_id()).await?;
    require_permission(
        role.can_manage_members(),
        "You need admin or owner role to assign staff",
    )?;

    let outlet_repo = OutletRepository::new((*state.db).clone());
    outlet_repo
        .assign_user(org_id, outlet_id, payload.user_id)
        .await
        .map_err(outlet_error)?;

    info!(
        org_id = %org_id,
        outlet_id = %outlet_id,
        user_id = %payload.user_id,
        "User assigned to outlet"
    );
    created(json!({ "outlet_id": outlet_id, "user_id": payload.user_id }))
}

/// DELETE `/organizations/{org_id}/outlets/{outlet_id}/users/{user_id}`
async fn unassign_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, user_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult {
    let role = require_member(&state, org_id, auth.user_id()).await?;
    require_permission(
        role.can_manage_members(),
        "You need admin or owner role to unassign staff",
    )?;

    let outlet_repo = OutletRepository::new((*state.db).clone());
    if outlet_repo
        .find_in_org(org_id, outlet_id)
        .await
        .map_err(|e| internal_error("Failed to load outlet", &e))?
        .is_none()
    {
        return Err(not_found("Outlet"));
    }

    let removed = outlet_repo
        .unassign_user(outlet_id, user_id)
        .await
        .map_err(|e| internal_error("Failed to unassign user", &e))?;
    if !removed {
        return Err(not_found("Assignment"));
    }

    info!(
        org_id = %org_id,
        outlet_id = %outlet_id,
        user_id = %user_id,
        "User unassigned from outlet"
    );
    Ok(StatusCode::NO_CONTENT.into_response())
}
