//! Response helpers and access checks shared by route handlers.
//!
//! Handlers return [`ApiResult`] so that checks can short-circuit with `?`;
//! both arms are ready-to-send responses.

use std::fmt::Display;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use restaurantek_core::auth::UserRole as Role;
use restaurantek_db::entities::{organizations, outlets};
use restaurantek_db::repositories::{
    Feature, OrganizationRepository, OutletRepository, ResourceLimit, SubscriptionRepository,
};
use restaurantek_shared::AppError;
use serde_json::json;
use tracing::error;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;

/// Handler result: success and failure are both responses.
pub type ApiResult = Result<Response, Response>;

/// A JSON error body `{"error": code, "message": message}`.
pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "error": code, "message": message.into() })),
    )
        .into_response()
}

/// Logs a server-side failure and returns a generic 500.
pub fn internal_error(context: &str, e: &impl Display) -> Response {
    error!(error = %e, "{context}");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "An internal error occurred",
    )
}

/// Maps an [`AppError`] to a response, hiding server-side details.
pub fn app_error(e: &AppError) -> Response {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if e.is_client_error() {
        let message = match e {
            AppError::Unauthorized(m)
            | AppError::Forbidden(m)
            | AppError::NotFound(m)
            | AppError::Validation(m)
            | AppError::BusinessRule(m)
            | AppError::Conflict(m)
            | AppError::UsageLimitExceeded(m)
            | AppError::Database(m)
            | AppError::ExternalService(m)
            | AppError::Internal(m) => m.clone(),
        };
        json_error(status, snake_code(e), message)
    } else {
        error!(error = %e, "request failed");
        let message = match e {
            AppError::ExternalService(m) => m.clone(),
            _ => "An internal error occurred".to_string(),
        };
        json_error(status, snake_code(e), message)
    }
}

fn snake_code(e: &AppError) -> &'static str {
    match e {
        AppError::Unauthorized(_) => "unauthorized",
        AppError::Forbidden(_) => "forbidden",
        AppError::NotFound(_) => "not_found",
        AppError::Validation(_) => "validation_error",
        AppError::BusinessRule(_) => "business_rule_violation",
        AppError::Conflict(_) => "conflict",
        AppError::UsageLimitExceeded(_) => "usage_limit_exceeded",
        AppError::Database(_) => "database_error",
        AppError::ExternalService(_) => "external_service_error",
        AppError::Internal(_) => "internal_error",
    }
}

/// 201 with a JSON body.
pub fn created(body: impl serde::Serialize) -> ApiResult {
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// 200 with a JSON body.
pub fn ok(body: impl serde::Serialize) -> ApiResult {
    Ok((StatusCode::OK, Json(body)).into_response())
}

/// Runs `validator` checks on a request payload.
pub fn validate(payload: &impl Validate) -> Result<(), Response> {
    payload
        .validate()
        .map_err(|errors| app_error(&AppError::from(errors)))
}

/// 404 for a missing resource.
pub fn not_found(what: &str) -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
}

/// 403 with a message.
pub fn forbidden(message: impl Into<String>) -> Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", message)
}

/// Returns the caller's role in the organization, or 403.
pub async fn require_member(
    state: &AppState,
    org_id: Uuid,
    user_id: Uuid,
) -> Result<Role, Response> {
    let org_repo = OrganizationRepository::new((*state.db).clone());
    match org_repo.get_user_membership(org_id, user_id).await {
        Ok(Some(membership)) => Ok(membership.role.into()),
        Ok(None) => Err(forbidden("You are not a member of this organization")),
        Err(e) => Err(internal_error("Failed to check membership", &e)),
    }
}

/// Fails with 403 unless `allowed` holds for the caller's role.
pub fn require_permission(allowed: bool, message: &str) -> Result<(), Response> {
    if allowed {
        Ok(())
    } else {
        Err(forbidden(message))
    }
}

/// Checks membership, that the outlet belongs to the organization, and that
/// the caller may see it.
pub async fn require_outlet(
    state: &AppState,
    org_id: Uuid,
    outlet_id: Uuid,
    user_id: Uuid,
) -> Result<(Role, outlets::Model), Response> {
    let role = require_member(state, org_id, user_id).await?;
    let outlet_repo = OutletRepository::new((*state.db).clone());

    let outlet = match outlet_repo.find_in_org(org_id, outlet_id).await {
        Ok(Some(outlet)) => outlet,
        Ok(None) => return Err(not_found("Outlet")),
        Err(e) => return Err(internal_error("Failed to load outlet", &e)),
    };

    match outlet_repo
        .user_has_access(org_id, outlet_id, user_id, role)
        .await
    {
        Ok(true) => Ok((role, outlet)),
        Ok(false) => Err(json_error(
            StatusCode::FORBIDDEN,
            "outlet_forbidden",
            "You do not have access to this outlet",
        )),
        Err(e) => Err(internal_error("Failed to check outlet access", &e)),
    }
}

/// Like [`require_outlet`], and the caller must be allowed to change outlet data.
pub async fn require_outlet_writer(
    state: &AppState,
    org_id: Uuid,
    outlet_id: Uuid,
    user_id: Uuid,
) -> Result<(Role, outlets::Model), Response> {
    let (role, outlet) = require_outlet(state, org_id, outlet_id, user_id).await?;
    require_permission(
        role.can_edit_outlet_data(),
        "Your role cannot change outlet data",
    )?;
    Ok((role, outlet))
}

/// 403 unless the organization's plan includes `feature`.
pub async fn require_feature(
    state: &AppState,
    org_id: Uuid,
    feature: Feature,
) -> Result<(), Response> {
    match SubscriptionRepository::has_feature(&state.db, org_id, feature).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(json_error(
            StatusCode::FORBIDDEN,
            "feature_not_available",
            match feature {
                Feature::AiParser => "Recipe parsing is not available on your plan",
                Feature::PriceImport => "Price import is not available on your plan",
            },
        )),
        Err(e) => Err(internal_error("Failed to check feature", &e)),
    }
}

/// 429 when the organization is at its limit for `resource`.
pub async fn require_within_limit(
    state: &AppState,
    org_id: Uuid,
    resource: ResourceLimit,
) -> Result<(), Response> {
    match SubscriptionRepository::check_limit(&state.db, org_id, resource).await {
        Ok(result) if result.allowed => Ok(()),
        Ok(result) => Err(app_error(&AppError::UsageLimitExceeded(
            result
                .message
                .unwrap_or_else(|| format!("Limit reached for {}", resource.label())),
        ))),
        Err(e) => Err(internal_error("Failed to check limit", &e)),
    }
}

/// Today's date in the organization's timezone; UTC if it is not a known zone.
pub async fn org_today(state: &AppState, org_id: Uuid) -> Result<NaiveDate, Response> {
    let org_repo = OrganizationRepository::new((*state.db).clone());
    match org_repo.find_by_id(org_id).await {
        Ok(Some(org)) => Ok(today_in(&org)),
        Ok(None) => Err(not_found("Organization")),
        Err(e) => Err(internal_error("Failed to load organization", &e)),
    }
}

fn today_in(org: &organizations::Model) -> NaiveDate {
    org.timezone.parse::<Tz>().map_or_else(
        |_| Utc::now().date_naive(),
        |tz| Utc::now().with_timezone(&tz).date_naive(),
    )
}

/// Deserializes a present-but-null JSON field as `Some(None)`.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` so
/// that a missing field stays `None` and `null` clears the value.
#[allow(clippy::option_option)]
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Validation("name is required".into()), StatusCode::BAD_REQUEST)]
    #[case(AppError::Forbidden("no".into()), StatusCode::FORBIDDEN)]
    #[case(AppError::UsageLimitExceeded("limit".into()), StatusCode::TOO_MANY_REQUESTS)]
    #[case(AppError::Database("connection refused".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_app_error_status(#[case] error: AppError, #[case] status: StatusCode) {
        assert_eq!(app_error(&error).status(), status);
    }

    #[test]
    fn test_double_option() {
        #[derive(serde::Deserialize)]
        struct Patch {
            #[serde(default, deserialize_with = "double_option")]
            address: Option<Option<String>>,
        }

        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.address, None);
        let null: Patch = serde_json::from_str(r#"{"address": null}"#).unwrap();
        assert_eq!(null.address, Some(None));
        let set: Patch = serde_json::from_str(r#"{"address": "1 Main St"}"#).unwrap();
        assert_eq!(set.address, Some(Some("1 Main St".to_string())));
    }
}
