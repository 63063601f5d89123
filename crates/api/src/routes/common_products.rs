//! Organization-wide ingredient catalog routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::common::{
    ApiResult, created, double_option, internal_error, json_error, not_found, ok, require_member,
    require_permission, validate,
};
use crate::{AppState, middleware::AuthUser};
use restaurantek_core::units::Unit;
use restaurantek_db::CommonProductRepository;
use restaurantek_db::repositories::{
    CommonProductError, CommonProductFilter, CreateCommonProductInput, UpdateCommonProductInput,
};
use restaurantek_shared::types::{PageRequest, PageResponse};

/// Creates the common products router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/{org_id}/common-products",
            get(list_products).post(create_product),
        )
        .route(
            "/organizations/{org_id}/common-products/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    search: Option<String>,
    category: Option<String>,
    active: Option<bool>,
    page: Option<u32>,
    per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
struct CreateCommonProductRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    name: String,
    category: Option<String>,
    default_unit: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateCommonProductRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    default_unit: Option<Option<String>>,
    is_active: Option<bool>,
}

/// Parses a unit name into its canonical code, or 400.
pub(super) fn canonical_unit(text: &str) -> Result<String, Response> {
    Unit::parse(text)
        .map(|unit| unit.canonical().to_string())
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_unit", e.to_string()))
}

fn common_product_error(e: CommonProductError) -> Response {
    match &e {
        CommonProductError::NotFound(_) => not_found("Common product"),
        CommonProductError::DuplicateName(name) => json_error(
            StatusCode::CONFLICT,
            "duplicate_name",
            format!("A common product named '{name}' already exists"),
        ),
        CommonProductError::InUse(count) => json_error(
            StatusCode::BAD_REQUEST,
            "in_use",
            format!("Product is used by {count} recipe ingredient(s)"),
        ),
        CommonProductError::Database(_) => internal_error("Common product operation failed", &e),
    }
}

/// GET `/organizations/{org_id}/common-products`
async fn list_products(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    require_member(&state, org_id, auth.user_id()).await?;
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }
    .normalized();
    let filter = CommonProductFilter {
        search: query.search,
        category: query.category,
        active: query.active,
    };

    let repo = CommonProductRepository::new((*state.db).clone());
    let (products, total) = repo
        .list(org_id, &filter, &page)
        .await
        .map_err(|e| internal_error("Failed to list common products", &e))?;

    ok(PageResponse::new(products, page.page, page.per_page, total))
}

/// POST `/organizations/{org_id}/common-products` (manager+)
async fn create_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(payload): Json<CreateCommonProductRequest>,
) -> ApiResult {
    let role = require_member(&state, org_id, auth.user_id()).await?;
    require_permission(
        role.can_manage_catalog(),
        "Your role cannot change the product catalog",
    )?;
    validate(&payload)?;
    let default_unit = payload
        .default_unit
        .as_deref()
        .map(canonical_unit)
        .transpose()?;

    let repo = CommonProductRepository::new((*state.db).clone());
    let product = repo
        .create(
            org_id,
            CreateCommonProductInput {
                name: payload.name,
                category: payload.category,
                default_unit,
            },
        )
        .await
        .map_err(common_product_error)?;

    info!(org_id = %org_id, product_id = %product.id, "Common product created");
    created(product)
}

/// GET `/organizations/{org_id}/common-products/{id}` - Product with usage counts.
async fn get_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    require_member(&state, org_id, auth.user_id()).await?;
    let repo = CommonProductRepository::new((*state.db).clone());

    let product = repo
        .find_in_org(org_id, id)
        .await
        .map_err(|e| internal_error("Failed to load common product", &e))?
        .ok_or_else(|| not_found("Common product"))?;
    let usage = repo
        .usage(id)
        .await
        .map_err(|e| internal_error("Failed to count product usage", &e))?;

    ok(json!({
        "product": product,
        "usage": {
            "distributor_products": usage.distributor_products,
            "recipe_ingredients": usage.recipe_ingredients,
        }
    }))
}

/// PATCH `/organizations/{org_id}/common-products/{id}` (manager+)
async fn update_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateCommonProductRequest>,
) -> ApiResult {
    let role = require_member(&state, org_id, auth.user_id()).await?;
    require_permission(
        role.can_manage_catalog(),
        "Your role cannot change the product catalog",
    )?;
    validate(&payload)?;
    let default_unit = match payload.default_unit {
        Some(Some(unit)) => Some(Some(canonical_unit(&unit)?)),
        other => other,
    };

    let repo = CommonProductRepository::new((*state.db).clone());
    let product = repo
        .update(
            org_id,
            id,
            UpdateCommonProductInput {
                name: payload.name,
                category: payload.category,
                default_unit,
                is_active: payload.is_active,
            },
        )
        .await
        .map_err(common_product_error)?;

    info!(org_id = %org_id, product_id = %id, "Common product updated");
    ok(product)
}

/// DELETE `/organizations/{org_id}/common-products/{id}` (manager+)
///
/// Refused while recipes use the product; distributor mappings are cleared.
async fn delete_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    let role = require_member(&state, org_id, auth.user_id()).await?;
    require_permission(
        role.can_manage_catalog(),
        "Your role cannot change the product catalog",
    )?;

    let repo = CommonProductRepository::new((*state.db).clone());
    repo.delete(org_id, id).await.map_err(common_product_error)?;

    info!(org_id = %org_id, product_id = %id, "Common product deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_unit() {
        assert_eq!(canonical_unit("Pounds").unwrap(), "lb");
        assert_eq!(canonical_unit("fl oz").unwrap(), "fl_oz");
        assert_eq!(
            canonical_unit("handful").unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_in_use_is_client_error() {
        let response = common_product_error(CommonProductError::InUse(2));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
