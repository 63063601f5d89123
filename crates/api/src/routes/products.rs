//! Outlet distributor product routes, including catalog mapping.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::common::{
    ApiResult, created, double_option, internal_error, json_error, not_found, ok, org_today,
    require_outlet, require_outlet_writer, validate,
};
use crate::{AppState, middleware::AuthUser};
use restaurantek_core::matching::{DEFAULT_LIMIT, find_matches};
use restaurantek_db::repositories::{
    CreateDistributorProductInput, DistributorProductError, DistributorProductFilter,
    UpdateDistributorProductInput,
};
use restaurantek_db::{CommonProductRepository, DistributorProductRepository, PriceRepository};
use restaurantek_shared::types::{PageRequest, PageResponse};

/// Creates the distributor products router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/products",
            get(list_products).post(create_product),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/products/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/products/{id}/mapping",
            put(set_mapping),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/products/{id}/match-suggestions",
            get(match_suggestions),
        )
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    distributor_id: Option<Uuid>,
    mapped: Option<bool>,
    search: Option<String>,
    active: Option<bool>,
    page: Option<u32>,
    per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
struct CreateProductRequest {
    distributor_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    sku: String,
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    name: String,
    brand: Option<String>,
    /// Pack text such as `6/5 LB`.
    pack_description: Option<String>,
    common_product_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateProductRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    sku: Option<String>,
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    brand: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pack_description: Option<Option<String>>,
    is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct MappingRequest {
    /// `null` removes the mapping.
    common_product_id: Option<Uuid>,
}

/// Maps distributor product errors to responses.
pub(super) fn product_error(e: DistributorProductError) -> Response {
    match &e {
        DistributorProductError::NotFound(_) => not_found("Product"),
        DistributorProductError::DistributorNotFound(_) => not_found("Distributor"),
        DistributorProductError::CommonProductNotFound(_) => not_found("Common product"),
        DistributorProductError::DuplicateSku(sku) => json_error(
            StatusCode::CONFLICT,
            "duplicate_sku",
            format!("SKU '{sku}' already exists for this distributor"),
        ),
        DistributorProductError::InvalidPack(inner) => json_error(
            StatusCode::BAD_REQUEST,
            "invalid_pack",
            inner.to_string(),
        ),
        DistributorProductError::Database(_) => internal_error("Product operation failed", &e),
    }
}

/// GET `.../outlets/{outlet_id}/products` - Products with their current price.
async fn list_products(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    require_outlet(&state, org_id, outlet_id, auth.user_id()).await?;
    let today = org_today(&state, org_id).await?;
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }
    .normalized();
    let filter = DistributorProductFilter {
        distributor_id: query.distributor_id,
        mapped: query.mapped,
        search: query.search,
        active: query.active,
    };

    let repo = DistributorProductRepository::new((*state.db).clone());
    let (products, total) = repo
        .list(outlet_id, &filter, today, &page)
        .await
        .map_err(|e| internal_error("Failed to list products", &e))?;

    ok(PageResponse::new(products, page.page, page.per_page, total))
}

/// POST `.../outlets/{outlet_id}/products`
async fn create_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CreateProductRequest>,
) -> ApiResult {
    require_outlet_writer(&state, org_id, outlet_id, auth.user_id()).await?;
    validate(&payload)?;

    let repo = DistributorProductRepository::new((*state.db).clone());
    let product = repo
        .create(CreateDistributorProductInput {
            organization_id: org_id,
            outlet_id,
            distributor_id: payload.distributor_id,
            sku: payload.sku,
            name: payload.name,
            brand: payload.brand,
            pack_description: payload.pack_description,
            common_product_id: payload.common_product_id,
        })
        .await
        .map_err(product_error)?;

    info!(outlet_id = %outlet_id, product_id = %product.id, sku = %product.sku, "Product created");
    created(product)
}

/// GET `.../outlets/{outlet_id}/products/{id}` - Product with its current price.
async fn get_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult {
    require_outlet(&state, org_id, outlet_id, auth.user_id()).await?;
    let today = org_today(&state, org_id).await?;

    let repo = DistributorProductRepository::new((*state.db).clone());
    let product = repo
        .find_in_outlet(outlet_id, id)
        .await
        .map_err(|e| internal_error("Failed to load product", &e))?
        .ok_or_else(|| not_found("Product"))?;

    let price_repo = PriceRepository::new((*state.db).clone());
    let latest_price = price_repo
        .latest_prices(outlet_id, today, Some(&[id]))
        .await
        .map_err(|e| internal_error("Failed to load latest price", &e))?
        .into_iter()
        .next();

    ok(json!({
        "product": product,
        "latest_price": latest_price,
    }))
}

/// PATCH `.../outlets/{outlet_id}/products/{id}`
async fn update_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, id)): Path<(Uuid, Uuid, Uuid)>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult {
    require_outlet_writer(&state, org_id, outlet_id, auth.user_id()).await?;
    validate(&payload)?;

    let repo = DistributorProductRepository::new((*state.db).clone());
    let product = repo
        .update(
            outlet_id,
            id,
            UpdateDistributorProductInput {
                sku: payload.sku,
                name: payload.name,
                brand: payload.brand,
                pack_description: payload.pack_description,
                is_active: payload.is_active,
            },
        )
        .await
        .map_err(product_error)?;

    info!(outlet_id = %outlet_id, product_id = %id, "Product updated");
    ok(product)
}

/// DELETE `.../outlets/{outlet_id}/products/{id}` - Deletes the product and its price history.
async fn delete_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult {
    require_outlet_writer(&state, org_id, outlet_id, auth.user_id()).await?;

    let repo = DistributorProductRepository::new((*state.db).clone());
    repo.delete(outlet_id, id).await.map_err(product_error)?;

    info!(outlet_id = %outlet_id, product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// PUT `.../products/{id}/mapping` - Link the product to a common product, or unlink it.
async fn set_mapping(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, id)): Path<(Uuid, Uuid, Uuid)>,
    Json(payload): Json<MappingRequest>,
) -> ApiResult {
    require_outlet_writer(&state, org_id, outlet_id, auth.user_id()).await?;

    let repo = DistributorProductRepository::new((*state.db).clone());
    let product = repo
        .set_mapping(org_id, outlet_id, id, payload.common_product_id)
        .await
        .map_err(product_error)?;

    info!(
        outlet_id = %outlet_id,
        product_id = %id,
        common_product_id = ?payload.common_product_id,
        "Product mapping changed"
    );
    ok(product)
}

/// GET `.../products/{id}/match-suggestions` - Closest common products by name.
async fn match_suggestions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult {
    require_outlet(&state, org_id, outlet_id, auth.user_id()).await?;

    let repo = DistributorProductRepository::new((*state.db).clone());
    let product = repo
        .find_in_outlet(outlet_id, id)
        .await
        .map_err(|e| internal_error("Failed to load product", &e))?
        .ok_or_else(|| not_found("Product"))?;

    let catalog = CommonProductRepository::new((*state.db).clone())
        .match_candidates(org_id)
        .await
        .map_err(|e| internal_error("Failed to load catalog", &e))?;

    ok(find_matches(&product.name, &catalog, DEFAULT_LIMIT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use restaurantek_core::pricing::PackSizeError;

    #[test]
    fn test_product_error_statuses() {
        assert_eq!(
            product_error(DistributorProductError::DuplicateSku("1001".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            product_error(DistributorProductError::InvalidPack(PackSizeError::Empty)).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_mapping_request_accepts_null() {
        let unlink: MappingRequest =
            serde_json::from_str(r#"{"common_product_id": null}"#).unwrap();
        assert_eq!(unlink.common_product_id, None);
    }
}
