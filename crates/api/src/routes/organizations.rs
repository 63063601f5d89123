//! Organization management routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono_tz::Tz;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::common::{
    ApiResult, created, internal_error, json_error, not_found, ok, require_member,
    require_permission, validate,
};
use crate::{AppState, middleware::AuthUser};
use restaurantek_db::repositories::{
    CreateOrganizationInput, OrganizationError, SubscriptionRepository, UpdateOrganizationInput,
};
use restaurantek_db::OrganizationRepository;
use restaurantek_shared::auth::{CreateOrganizationRequest, UpdateOrganizationRequest};

/// Creates the organizations router (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/organizations", post(create_organization))
        .route(
            "/organizations/{org_id}",
            get(get_organization).patch(update_organization),
        )
        .route("/organizations/{org_id}/usage", get(get_usage))
}

fn ensure_timezone(timezone: &str) -> Result<(), axum::response::Response> {
    timezone.parse::<Tz>().map(|_| ()).map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("Unknown timezone '{timezone}'"),
        )
    })
}

/// Maps organization and membership errors to responses.
pub(super) fn organization_error(e: OrganizationError) -> axum::response::Response {
    match &e {
        OrganizationError::NotFound(_) => not_found("Organization"),
        OrganizationError::SlugTaken(_) => json_error(
            StatusCode::CONFLICT,
            "slug_exists",
            "An organization with this slug already exists",
        ),
        OrganizationError::NotMember(_) => not_found("Member"),
        OrganizationError::OutletNotFound(_) => not_found("Outlet"),
        OrganizationError::AlreadyMember(_) => json_error(
            StatusCode::CONFLICT,
            "already_member",
            "User is already a member of this organization",
        ),
        OrganizationError::LastOwner => json_error(
            StatusCode::BAD_REQUEST,
            "last_owner",
            "An organization must keep at least one owner",
        ),
        OrganizationError::Database(_) => internal_error("Organization operation failed", &e),
    }
}

/// POST /organizations - Create an organization owned by the caller, with a `Main` outlet.
async fn create_organization(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateOrganizationRequest>,
) -> ApiResult {
    validate(&payload)?;
    ensure_timezone(&payload.timezone)?;

    let org_repo = OrganizationRepository::new((*state.db).clone());
    let (org, outlet) = org_repo
        .create_with_owner(
            CreateOrganizationInput {
                name: payload.name,
                slug: payload.slug.trim().to_lowercase(),
                currency: payload.currency.to_uppercase(),
                timezone: payload.timezone,
            },
            auth.user_id(),
        )
        .await
        .map_err(organization_error)?;

    info!(
        org_id = %org.id,
        slug = %org.slug,
        owner_id = %auth.user_id(),
        "Organization created"
    );

    created(json!({
        "organization": org,
        "default_outlet": outlet,
    }))
}

/// GET `/organizations/{org_id}` - Organization details with the caller's role.
async fn get_organization(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
) -> ApiResult {
    let role = require_member(&state, org_id, auth.user_id()).await?;
    let org_repo = OrganizationRepository::new((*state.db).clone());

    let org = org_repo
        .find_by_id(org_id)
        .await
        .map_err(|e| internal_error("Failed to load organization", &e))?
        .ok_or_else(|| not_found("Organization"))?;

    ok(json!({
        "organization": org,
        "role": role.as_str(),
    }))
}

/// PATCH `/organizations/{org_id}` - Update name, currency or timezone (admin+).
async fn update_organization(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(payload): Json<UpdateOrganizationRequest>,
) -> ApiResult {
    let role = require_member(&state, org_id, auth.user_id()).await?;
    require_permission(
        role.can_manage_members(),
        "You need admin or owner role to update the organization",
    )?;
    validate(&payload)?;
    if let Some(timezone) = &payload.timezone {
        ensure_timezone(timezone)?;
    }

    let org_repo = OrganizationRepository::new((*state.db).clone());
    let org = org_repo
        .update(
            org_id,
            UpdateOrganizationInput {
                name: payload.name,
                currency: payload.currency,
                timezone: payload.timezone,
            },
        )
        .await
        .map_err(organization_error)?;

    info!(org_id = %org.id, "Organization updated");
    ok(org)
}

/// GET `/organizations/{org_id}/usage` - Plan limits and this month's usage.
async fn get_usage(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
) -> ApiResult {
    require_member(&state, org_id, auth.user_id()).await?;

    let summary = SubscriptionRepository::usage_summary(&state.db, org_id)
        .await
        .map_err(|e| internal_error("Failed to load usage", &e))?
        .ok_or_else(|| not_found("Organization"))?;

    ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timezone_check() {
        assert!(ensure_timezone("America/Chicago").is_ok());
        assert!(ensure_timezone("UTC").is_ok());
        let rejected = ensure_timezone("Mars/Olympus").unwrap_err();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_organization_error_statuses() {
        assert_eq!(
            organization_error(OrganizationError::SlugTaken("bistro".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            organization_error(OrganizationError::LastOwner).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            organization_error(OrganizationError::NotFound(Uuid::nil())).status(),
            StatusCode::NOT_FOUND
        );
    }
}
