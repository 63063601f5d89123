//! Distributor (supplier) routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::common::{
    ApiResult, created, internal_error, json_error, not_found, ok, require_member,
    require_permission, validate,
};
use crate::{AppState, middleware::AuthUser};
use restaurantek_db::DistributorRepository;
use restaurantek_db::repositories::{DistributorContact, DistributorError, UpdateDistributorInput};

/// Creates the distributors router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/{org_id}/distributors",
            get(list_distributors).post(create_distributor),
        )
        .route(
            "/organizations/{org_id}/distributors/{id}",
            patch(update_distributor).delete(delete_distributor),
        )
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
struct ContactBody {
    contact_name: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    contact_email: Option<String>,
    contact_phone: Option<String>,
    account_number: Option<String>,
    notes: Option<String>,
}

impl From<ContactBody> for DistributorContact {
    fn from(body: ContactBody) -> Self {
        Self {
            contact_name: body.contact_name,
            contact_email: body.contact_email,
            contact_phone: body.contact_phone,
            account_number: body.account_number,
            notes: body.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
struct CreateDistributorRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    name: String,
    #[serde(flatten)]
    #[validate(nested)]
    contact: ContactBody,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateDistributorRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    name: Option<String>,
    /// Replaces every contact field when present.
    #[validate(nested)]
    contact: Option<ContactBody>,
    is_active: Option<bool>,
}

fn distributor_error(e: DistributorError) -> Response {
    match &e {
        DistributorError::NotFound(_) => not_found("Distributor"),
        DistributorError::DuplicateName(name) => json_error(
            StatusCode::CONFLICT,
            "duplicate_name",
            format!("A distributor named '{name}' already exists"),
        ),
        DistributorError::InUse(count) => json_error(
            StatusCode::BAD_REQUEST,
            "in_use",
            format!("Distributor still has {count} product(s)"),
        ),
        DistributorError::Database(_) => internal_error("Distributor operation failed", &e),
    }
}

/// GET `/organizations/{org_id}/distributors`
async fn list_distributors(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    require_member(&state, org_id, auth.user_id()).await?;
    let repo = DistributorRepository::new((*state.db).clone());

    let distributors = repo
        .list(org_id, query.active)
        .await
        .map_err(|e| internal_error("Failed to list distributors", &e))?;

    ok(distributors)
}

/// POST `/organizations/{org_id}/distributors` (manager+)
async fn create_distributor(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(payload): Json<CreateDistributorRequest>,
) -> ApiResult {
    let role = require_member(&state, org_id, auth.user_id()).await?;
    require_permission(
        role.can_manage_catalog(),
        "Your role cannot manage distributors",
    )?;
    validate(&payload)?;

    let repo = DistributorRepository::new((*state.db).clone());
    let distributor = repo
        .create(org_id, &payload.name, payload.contact.into())
        .await
        .map_err(distributor_error)?;

    info!(org_id = %org_id, distributor_id = %distributor.id, "Distributor created");
    created(distributor)
}

/// PATCH `/organizations/{org_id}/distributors/{id}` (manager+)
async fn update_distributor(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateDistributorRequest>,
) -> ApiResult {
    let role = require_member(&state, org_id, auth.user_id()).await?;
    require_permission(
        role.can_manage_catalog(),
        "Your role cannot manage distributors",
    )?;
    validate(&payload)?;

    let repo = DistributorRepository::new((*state.db).clone());
    let distributor = repo
        .update(
            org_id,
            id,
            UpdateDistributorInput {
                name: payload.name,
                contact: payload.contact.map(Into::into),
                is_active: payload.is_active,
            },
        )
        .await
        .map_err(distributor_error)?;

    info!(org_id = %org_id, distributor_id = %id, "Distributor updated");
    ok(distributor)
}

/// DELETE `/organizations/{org_id}/distributors/{id}` (manager+)
async fn delete_distributor(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    let role = require_member(&state, org_id, auth.user_id()).await?;
    require_permission(
        role.can_manage_catalog(),
        "Your role cannot manage distributors",
    )?;

    let repo = DistributorRepository::new((*state.db).clone());
    repo.delete(org_id, id).await.map_err(distributor_error)?;

    info!(org_id = %org_id, distributor_id = %id, "Distributor deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_flattens_contact() {
        let req: CreateDistributorRequest = serde_json::from_str(
            r#"{
                "name": "Sysco",
                "contact_email": "orders@sysco.example",
                "account_number": "A-17"
            }"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        let contact: DistributorContact = req.contact.into();
        assert_eq!(contact.account_number.as_deref(), Some("A-17"));
        assert_eq!(contact.contact_name, None);
    }

    #[test]
    fn test_bad_contact_email_rejected() {
        let req: CreateDistributorRequest =
            serde_json::from_str(r#"{"name": "Sysco", "contact_email": "nope"}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
