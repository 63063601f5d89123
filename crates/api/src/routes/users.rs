//! Organization membership routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::common::{
    ApiResult, created, internal_error, json_error, not_found, ok, require_member,
    require_permission, require_within_limit, validate,
};
use super::organizations::organization_error;
use crate::{AppState, middleware::AuthUser};
use restaurantek_core::auth::UserRole as Role;
use restaurantek_db::repositories::ResourceLimit;
use restaurantek_db::{OrganizationRepository, UserRepository};
use restaurantek_shared::auth::{AddUserRequest, UpdateMemberRequest};

/// Creates the membership router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/{org_id}/users",
            get(list_users).post(add_user),
        )
        .route(
            "/organizations/{org_id}/users/{user_id}",
            patch(update_member).delete(remove_user),
        )
}

/// A member as listed to other members.
#[derive(Debug, Serialize)]
struct MemberResponse {
    user_id: Uuid,
    email: String,
    full_name: String,
    role: &'static str,
    is_active: bool,
}

fn parse_role(role: &str) -> Result<Role, Response> {
    Role::parse(role).ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_role",
            format!("Unknown role '{role}'"),
        )
    })
}

fn ensure_can_grant(actor: Role, target: Role) -> Result<(), Response> {
    require_permission(
        actor.can_assign_role(target),
        &format!("Your role cannot grant the {target} role"),
    )
}

/// GET `/organizations/{org_id}/users` - Members with their roles.
async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
) -> ApiResult {
    require_member(&state, org_id, auth.user_id()).await?;
    let org_repo = OrganizationRepository::new((*state.db).clone());

    let members = org_repo
        .get_users(org_id)
        .await
        .map_err(|e| internal_error("Failed to list members", &e))?;

    ok(members
        .into_iter()
        .map(|(user, membership)| MemberResponse {
            user_id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: Role::from(membership.role).as_str(),
            is_active: user.is_active,
        })
        .collect::<Vec<_>>())
}

/// POST `/organizations/{org_id}/users` - Add a registered user by email.
///
/// Members below admin are assigned to the given outlets.
async fn add_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(payload): Json<AddUserRequest>,
) -> ApiResult {
    let actor = require_member(&state, org_id, auth.user_id()).await?;
    require_permission(
        actor.can_manage_members(),
        "You need admin or owner role to add users",
    )?;
    validate(&payload)?;
    let role = parse_role(&payload.role)?;
    ensure_can_grant(actor, role)?;
    require_within_limit(&state, org_id, ResourceLimit::Users).await?;

    let user_repo = UserRepository::new((*state.db).clone());
    let org_repo = OrganizationRepository::new((*state.db).clone());

    let user = user_repo
        .find_by_email(&payload.email)
        .await
        .map_err(|e| internal_error("Database error finding user", &e))?
        .ok_or_else(|| {
            json_error(
                StatusCode::NOT_FOUND,
                "user_not_found",
                "No user found with this email",
            )
        })?;

    let outlet_ids = if role.sees_all_outlets() {
        Vec::new()
    } else {
        payload.outlet_ids
    };
    org_repo
        .add_user_with_outlets(org_id, user.id, role.into(), &outlet_ids)
        .await
        .map_err(organization_error)?;

    info!(
        org_id = %org_id,
        user_id = %user.id,
        role = %role,
        outlets = outlet_ids.len(),
        "User added to organization"
    );

    created(MemberResponse {
        user_id: user.id,
        email: user.email,
        full_name: user.full_name,
        role: role.as_str(),
        is_active: user.is_active,
    })
}

/// PATCH `/organizations/{org_id}/users/{user_id}` - Change a member's role.
async fn update_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMemberRequest>,
) -> ApiResult {
    let actor = require_member(&state, org_id, auth.user_id()).await?;
    require_permission(
        actor.can_manage_members(),
        "You need admin or owner role to change roles",
    )?;
    let role = parse_role(&payload.role)?;
    ensure_can_grant(actor, role)?;

    let current = require_member(&state, org_id, user_id)
        .await
        .map_err(|_| not_found("Member"))?;
    ensure_can_grant(actor, current)?;

    let org_repo = OrganizationRepository::new((*state.db).clone());
    let updated = org_repo
        .update_member_role(org_id, user_id, role.into())
        .await
        .map_err(organization_error)?;

    info!(org_id = %org_id, user_id = %user_id, role = %role, "Member role updated");

    ok(serde_json::json!({
        "user_id": updated.user_id,
        "role": Role::from(updated.role).as_str(),
    }))
}

/// DELETE `/organizations/{org_id}/users/{user_id}` - Remove a member.
///
/// Any member may leave; removing others needs admin and may not touch owners
/// unless the caller is an owner.
async fn remove_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    let actor = require_member(&state, org_id, auth.user_id()).await?;
    if user_id != auth.user_id() {
        require_permission(
            actor.can_manage_members(),
            "You need admin or owner role to remove users",
        )?;
        let current = require_member(&state, org_id, user_id)
            .await
            .map_err(|_| not_found("Member"))?;
        ensure_can_grant(actor, current)?;
    }

    let org_repo = OrganizationRepository::new((*state.db).clone());
    org_repo
        .remove_user(org_id, user_id)
        .await
        .map_err(organization_error)?;

    info!(org_id = %org_id, user_id = %user_id, "Member removed");
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("Chef").unwrap(), Role::Chef);
        assert_eq!(
            parse_role("sous_chef").unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_admin_cannot_grant_owner() {
        assert!(ensure_can_grant(Role::Admin, Role::Manager).is_ok());
        assert_eq!(
            ensure_can_grant(Role::Admin, Role::Owner).unwrap_err().status(),
            StatusCode::FORBIDDEN
        );
        assert!(ensure_can_grant(Role::Owner, Role::Owner).is_ok());
    }
}
