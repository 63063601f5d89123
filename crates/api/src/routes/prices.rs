//! Price history routes: per-product history, outlet-wide latest prices and
//! movements, and distributor price-list import.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::common::{
    ApiResult, created, internal_error, json_error, not_found, ok, org_today, require_feature,
    require_outlet, require_outlet_writer,
};
use crate::{AppState, middleware::AuthUser};
use restaurantek_db::entities::sea_orm_active_enums::PriceSource;
use restaurantek_db::repositories::{
    Feature, ImportPriceRow, ImportPricesInput, PriceError, RecordPriceInput,
    SubscriptionRepository,
};
use restaurantek_db::{DistributorProductRepository, PriceRepository};

/// Most rows accepted in one import.
const MAX_IMPORT_ROWS: usize = 5000;

/// Default look-back for price changes.
const DEFAULT_CHANGE_WINDOW_DAYS: u64 = 30;

/// Creates the prices router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/products/{id}/prices",
            get(product_history).post(record_price),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/prices/latest",
            get(latest_prices),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/prices/changes",
            get(price_changes),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/prices/import",
            post(import_prices),
        )
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct AsOfQuery {
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct ChangesQuery {
    since: Option<NaiveDate>,
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct RecordPriceRequest {
    price: Decimal,
    /// Defaults to today in the organization's timezone.
    effective_date: Option<NaiveDate>,
}

/// Rows are checked one by one during the import, so a bad row is reported
/// in the summary instead of failing the whole request.
#[derive(Debug, Deserialize)]
struct ImportRowRequest {
    sku: String,
    name: Option<String>,
    pack_description: Option<String>,
    price: Decimal,
    effective_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct ImportRequest {
    distributor_id: Uuid,
    effective_date: Option<NaiveDate>,
    rows: Vec<ImportRowRequest>,
}

fn check_row_count(rows: usize) -> Result<(), Response> {
    if rows == 0 {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "An import needs at least one row",
        ));
    }
    if rows > MAX_IMPORT_ROWS {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("An import may contain at most {MAX_IMPORT_ROWS} rows"),
        ));
    }
    Ok(())
}

fn price_error(e: PriceError) -> Response {
    match &e {
        PriceError::ProductNotFound(_) => not_found("Product"),
        PriceError::DistributorNotFound(_) => not_found("Distributor"),
        PriceError::InvalidPrice(inner) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_price", inner.to_string())
        }
        PriceError::Database(_) => internal_error("Price operation failed", &e),
    }
}

/// GET `.../products/{id}/prices` - Price history, newest first.
async fn product_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, id)): Path<(Uuid, Uuid, Uuid)>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult {
    require_outlet(&state, org_id, outlet_id, auth.user_id()).await?;

    let product_repo = DistributorProductRepository::new((*state.db).clone());
    if product_repo
        .find_in_outlet(outlet_id, id)
        .await
        .map_err(|e| internal_error("Failed to load product", &e))?
        .is_none()
    {
        return Err(not_found("Product"));
    }

    let repo = PriceRepository::new((*state.db).clone());
    let history = repo
        .history(outlet_id, id, query.from, query.to)
        .await
        .map_err(|e| internal_error("Failed to load price history", &e))?;

    ok(history)
}

/// POST `.../products/{id}/prices` - Record a case price; same-day entries are replaced.
async fn record_price(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, id)): Path<(Uuid, Uuid, Uuid)>,
    Json(payload): Json<RecordPriceRequest>,
) -> ApiResult {
    require_outlet_writer(&state, org_id, outlet_id, auth.user_id()).await?;
    let effective_date = match payload.effective_date {
        Some(date) => date,
        None => org_today(&state, org_id).await?,
    };

    let repo = PriceRepository::new((*state.db).clone());
    let record = repo
        .record_price(RecordPriceInput {
            organization_id: org_id,
            outlet_id,
            distributor_product_id: id,
            price: payload.price,
            effective_date,
            source: PriceSource::Manual,
            created_by: Some(auth.user_id()),
        })
        .await
        .map_err(price_error)?;

    info!(
        outlet_id = %outlet_id,
        product_id = %id,
        price = %record.price,
        effective_date = %record.effective_date,
        "Price recorded"
    );
    created(record)
}

/// GET `.../outlets/{outlet_id}/prices/latest` - Current price of every product.
async fn latest_prices(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<AsOfQuery>,
) -> ApiResult {
    require_outlet(&state, org_id, outlet_id, auth.user_id()).await?;
    let as_of = match query.as_of {
        Some(date) => date,
        None => org_today(&state, org_id).await?,
    };

    let repo = PriceRepository::new((*state.db).clone());
    let prices = repo
        .latest_prices(outlet_id, as_of, None)
        .await
        .map_err(|e| internal_error("Failed to load latest prices", &e))?;

    ok(prices)
}

/// GET `.../outlets/{outlet_id}/prices/changes` - Products whose price moved recently.
async fn price_changes(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ChangesQuery>,
) -> ApiResult {
    require_outlet(&state, org_id, outlet_id, auth.user_id()).await?;
    let as_of = match query.as_of {
        Some(date) => date,
        None => org_today(&state, org_id).await?,
    };
    let since = query.since.unwrap_or_else(|| default_since(as_of));
    if since > as_of {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "since must not be after as_of",
        ));
    }

    let repo = PriceRepository::new((*state.db).clone());
    let changes = repo
        .price_changes(outlet_id, since, as_of)
        .await
        .map_err(|e| internal_error("Failed to load price changes", &e))?;

    ok(changes)
}

fn default_since(as_of: NaiveDate) -> NaiveDate {
    as_of
        .checked_sub_days(Days::new(DEFAULT_CHANGE_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN)
}

/// POST `.../outlets/{outlet_id}/prices/import` - Import a distributor price list.
///
/// Needs a plan with price import. Unknown SKUs with a name become new
/// products; bad rows are reported and skipped.
async fn import_prices(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ImportRequest>,
) -> ApiResult {
    require_outlet_writer(&state, org_id, outlet_id, auth.user_id()).await?;
    require_feature(&state, org_id, Feature::PriceImport).await?;
    check_row_count(payload.rows.len())?;
    let effective_date = match payload.effective_date {
        Some(date) => date,
        None => org_today(&state, org_id).await?,
    };

    let repo = PriceRepository::new((*state.db).clone());
    let summary = repo
        .import_prices(ImportPricesInput {
            organization_id: org_id,
            outlet_id,
            distributor_id: payload.distributor_id,
            effective_date,
            created_by: Some(auth.user_id()),
            rows: payload
                .rows
                .into_iter()
                .map(|row| ImportPriceRow {
                    sku: row.sku,
                    name: row.name,
                    pack_description: row.pack_description,
                    price: row.price,
                    effective_date: row.effective_date,
                })
                .collect(),
        })
        .await
        .map_err(price_error)?;

    SubscriptionRepository::increment_price_import_count(&state.db, org_id)
        .await
        .map_err(|e| internal_error("Failed to record price import usage", &e))?;

    info!(
        outlet_id = %outlet_id,
        distributor_id = %payload.distributor_id,
        recorded = summary.recorded,
        created_products = summary.created_products,
        rejected = summary.rejected,
        "Price list imported"
    );
    ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_since_is_thirty_days_back() {
        let as_of = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        assert_eq!(
            default_since(as_of),
            NaiveDate::from_ymd_opt(2025, 2, 13).unwrap()
        );
    }

    #[test]
    fn test_import_request_parses_string_prices() {
        let req: ImportRequest = serde_json::from_str(
            r#"{
                "distributor_id": "0190a1b2-0000-7000-8000-000000000001",
                "rows": [{
                    "sku": "1001",
                    "name": "Onions 50#",
                    "pack_description": "1/50 LB",
                    "price": "32.50"
                }]
            }"#,
        )
        .unwrap();
        assert!(check_row_count(req.rows.len()).is_ok());
        assert_eq!(req.rows[0].price, dec!(32.50));
        assert_eq!(req.effective_date, None);
    }

    #[test]
    fn test_empty_import_rejected() {
        let req: ImportRequest = serde_json::from_str(
            r#"{"distributor_id": "0190a1b2-0000-7000-8000-000000000001", "rows": []}"#,
        )
        .unwrap();
        let err = check_row_count(req.rows.len()).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(check_row_count(MAX_IMPORT_ROWS + 1).is_err());
    }

    #[test]
    fn test_blank_sku_row_does_not_fail_request() {
        let req: ImportRequest = serde_json::from_str(
            r#"{
                "distributor_id": "0190a1b2-0000-7000-8000-000000000001",
                "rows": [
                    {"sku": "", "name": "Leeks", "price": "12"},
                    {"sku": "1001", "price": "32.50"}
                ]
            }"#,
        )
        .unwrap();
        assert!(check_row_count(req.rows.len()).is_ok());
        assert_eq!(req.rows[0].sku, "");
    }
}
