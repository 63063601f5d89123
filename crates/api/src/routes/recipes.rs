//! Recipe routes: CRUD, ingredient lines, costing, and document parsing.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::common::{
    ApiResult, app_error, created, double_option, internal_error, json_error, not_found, ok,
    org_today, require_feature, require_outlet, require_outlet_writer, require_within_limit,
    validate,
};
use crate::{AppState, middleware::AuthUser};
use restaurantek_core::costing::{CostingError, RecipeCost, cost_recipe, cost_recipes};
use restaurantek_core::parser::{ParserError, parse_recipe_document};
use restaurantek_db::entities::recipes;
use restaurantek_db::repositories::{
    CreateRecipeInput, Feature, IngredientInput, RecipeError, RecipeFilter, ResourceLimit,
    SubscriptionRepository, UpdateRecipeInput,
};
use restaurantek_db::{CommonProductRepository, RecipeRepository};
use restaurantek_shared::AppError;
use restaurantek_shared::types::{PageRequest, PageResponse, RecipeId};

/// Creates the recipes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/recipes",
            get(list_recipes).post(create_recipe),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/recipes/parse",
            post(parse_recipe),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/recipes/{id}",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/recipes/{id}/ingredients",
            put(replace_ingredients),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/recipes/{id}/ingredients/order",
            put(reorder_ingredients),
        )
        .route(
            "/organizations/{org_id}/outlets/{outlet_id}/recipes/{id}/cost",
            get(get_cost),
        )
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    search: Option<String>,
    #[serde(default)]
    sub_recipes_only: bool,
    /// Attach the current cost of each listed recipe.
    #[serde(default)]
    include_cost: bool,
    page: Option<u32>,
    per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CostQuery {
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IngredientRequest {
    common_product_id: Option<Uuid>,
    sub_recipe_id: Option<Uuid>,
    free_text: Option<String>,
    quantity: Option<Decimal>,
    unit: Option<String>,
    notes: Option<String>,
}

impl From<IngredientRequest> for IngredientInput {
    fn from(req: IngredientRequest) -> Self {
        Self {
            common_product_id: req.common_product_id,
            sub_recipe_id: req.sub_recipe_id,
            free_text: req.free_text,
            quantity: req.quantity,
            unit: req.unit,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
struct CreateRecipeRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    name: String,
    category: Option<String>,
    yield_quantity: Option<Decimal>,
    yield_unit: Option<String>,
    #[validate(range(min = 1, message = "must be at least 1"))]
    portions: Option<i32>,
    menu_price: Option<Decimal>,
    instructions: Option<String>,
    #[serde(default)]
    is_sub_recipe: bool,
    #[serde(default)]
    ingredients: Vec<IngredientRequest>,
}

#[derive(Debug, Deserialize, Validate)]
#[allow(clippy::option_option)]
struct UpdateRecipeRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    yield_quantity: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    yield_unit: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    portions: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    menu_price: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    instructions: Option<Option<String>>,
    is_sub_recipe: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ReplaceIngredientsRequest {
    ingredients: Vec<IngredientRequest>,
}

#[derive(Debug, Deserialize)]
struct ReorderRequest {
    ingredient_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
struct ParseRequest {
    /// Plain text of the recipe document.
    document: String,
}

/// A recipe row with its cost, when requested.
#[derive(Debug, Serialize)]
struct RecipeListItem {
    #[serde(flatten)]
    recipe: recipes::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    cost: Option<RecipeCost>,
}

fn bad_request(code: &'static str, message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, code, message)
}

/// Rejects non-positive yields, negative menu prices and portion counts below one.
fn check_amounts(
    yield_quantity: Option<Decimal>,
    portions: Option<i32>,
    menu_price: Option<Decimal>,
) -> Result<(), Response> {
    if yield_quantity.is_some_and(|q| q <= Decimal::ZERO) {
        return Err(bad_request("validation_error", "yield_quantity must be positive"));
    }
    if portions.is_some_and(|p| p < 1) {
        return Err(bad_request("validation_error", "portions must be at least 1"));
    }
    if menu_price.is_some_and(|p| p <= Decimal::ZERO) {
        return Err(bad_request("validation_error", "menu_price must be positive"));
    }
    Ok(())
}

fn recipe_error(e: RecipeError) -> Response {
    match &e {
        RecipeError::NotFound(_) => not_found("Recipe"),
        RecipeError::DuplicateName(name) => json_error(
            StatusCode::CONFLICT,
            "duplicate_name",
            format!("A recipe named '{name}' already exists in this outlet"),
        ),
        RecipeError::InUse(_) => bad_request("in_use", e.to_string()),
        RecipeError::InvalidIngredient(_) => bad_request("invalid_ingredient", e.to_string()),
        RecipeError::Cycle(_) => bad_request("recipe_cycle", e.to_string()),
        RecipeError::OrderMismatch => bad_request("order_mismatch", e.to_string()),
        RecipeError::InvalidYieldUnit(_) => bad_request("invalid_unit", e.to_string()),
        RecipeError::Database(_) => internal_error("Recipe operation failed", &e),
    }
}

fn costing_error(e: &CostingError) -> Response {
    match e {
        CostingError::RecipeNotFound(_) => not_found("Recipe"),
        CostingError::Cycle(_) => bad_request("recipe_cycle", e.to_string()),
        CostingError::Overflow => bad_request("cost_overflow", e.to_string()),
    }
}

fn parser_error(e: &ParserError) -> Response {
    if e.is_client_error() {
        bad_request("invalid_document", e.to_string())
    } else {
        warn!(error = %e, "Recipe parser failed");
        app_error(&AppError::ExternalService(e.to_string()))
    }
}

/// GET `.../outlets/{outlet_id}/recipes`
async fn list_recipes(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    require_outlet(&state, org_id, outlet_id, auth.user_id()).await?;
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }
    .normalized();
    let filter = RecipeFilter {
        search: query.search,
        sub_recipes_only: query.sub_recipes_only,
    };

    let repo = RecipeRepository::new((*state.db).clone());
    let (rows, total) = repo
        .list(outlet_id, &filter, &page)
        .await
        .map_err(|e| internal_error("Failed to list recipes", &e))?;

    let mut costs = std::collections::HashMap::new();
    if query.include_cost && !rows.is_empty() {
        let as_of = org_today(&state, org_id).await?;
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let ctx = repo
            .costing_context(outlet_id, &ids, as_of)
            .await
            .map_err(|e| internal_error("Failed to load costing data", &e))?;
        let recipe_ids: Vec<RecipeId> = ids.into_iter().map(RecipeId::from_uuid).collect();
        for (id, result) in cost_recipes(&ctx, &recipe_ids) {
            match result {
                Ok(cost) => {
                    costs.insert(id.into_inner(), cost);
                }
                Err(e) => warn!(recipe_id = %id, error = %e, "Recipe could not be costed"),
            }
        }
    }

    let items: Vec<RecipeListItem> = rows
        .into_iter()
        .map(|recipe| RecipeListItem {
            cost: costs.remove(&recipe.id),
            recipe,
        })
        .collect();

    ok(PageResponse::new(items, page.page, page.per_page, total))
}

/// POST `.../outlets/{outlet_id}/recipes`
async fn create_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CreateRecipeRequest>,
) -> ApiResult {
    require_outlet_writer(&state, org_id, outlet_id, auth.user_id()).await?;
    validate(&payload)?;
    check_amounts(payload.yield_quantity, payload.portions, payload.menu_price)?;
    require_within_limit(&state, org_id, ResourceLimit::Recipes).await?;

    let repo = RecipeRepository::new((*state.db).clone());
    let recipe = repo
        .create(CreateRecipeInput {
            organization_id: org_id,
            outlet_id,
            name: payload.name,
            category: payload.category,
            yield_quantity: payload.yield_quantity,
            yield_unit: payload.yield_unit,
            portions: payload.portions,
            menu_price: payload.menu_price,
            instructions: payload.instructions,
            is_sub_recipe: payload.is_sub_recipe,
            created_by: Some(auth.user_id()),
            ingredients: payload.ingredients.into_iter().map(Into::into).collect(),
        })
        .await
        .map_err(recipe_error)?;

    info!(outlet_id = %outlet_id, recipe_id = %recipe.id, name = %recipe.name, "Recipe created");

    let detail = repo
        .find_detail(outlet_id, recipe.id)
        .await
        .map_err(recipe_error)?;
    created(detail)
}

/// GET `.../recipes/{id}` - Recipe with its ingredient lines.
async fn get_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult {
    require_outlet(&state, org_id, outlet_id, auth.user_id()).await?;

    let repo = RecipeRepository::new((*state.db).clone());
    let detail = repo.find_detail(outlet_id, id).await.map_err(recipe_error)?;
    ok(detail)
}

/// PATCH `.../recipes/{id}`
async fn update_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, id)): Path<(Uuid, Uuid, Uuid)>,
    Json(payload): Json<UpdateRecipeRequest>,
) -> ApiResult {
    require_outlet_writer(&state, org_id, outlet_id, auth.user_id()).await?;
    validate(&payload)?;
    check_amounts(
        payload.yield_quantity.flatten(),
        payload.portions.flatten(),
        payload.menu_price.flatten(),
    )?;

    let repo = RecipeRepository::new((*state.db).clone());
    let recipe = repo
        .update(
            outlet_id,
            id,
            UpdateRecipeInput {
                name: payload.name,
                category: payload.category,
                yield_quantity: payload.yield_quantity,
                yield_unit: payload.yield_unit,
                portions: payload.portions,
                menu_price: payload.menu_price,
                instructions: payload.instructions,
                is_sub_recipe: payload.is_sub_recipe,
            },
        )
        .await
        .map_err(recipe_error)?;

    info!(outlet_id = %outlet_id, recipe_id = %id, "Recipe updated");
    ok(recipe)
}

/// DELETE `.../recipes/{id}` - Refused while another recipe uses it.
async fn delete_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult {
    require_outlet_writer(&state, org_id, outlet_id, auth.user_id()).await?;

    let repo = RecipeRepository::new((*state.db).clone());
    repo.delete(outlet_id, id).await.map_err(recipe_error)?;

    info!(outlet_id = %outlet_id, recipe_id = %id, "Recipe deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// PUT `.../recipes/{id}/ingredients` - Replace every ingredient line.
async fn replace_ingredients(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, id)): Path<(Uuid, Uuid, Uuid)>,
    Json(payload): Json<ReplaceIngredientsRequest>,
) -> ApiResult {
    require_outlet_writer(&state, org_id, outlet_id, auth.user_id()).await?;

    let inputs: Vec<IngredientInput> = payload.ingredients.into_iter().map(Into::into).collect();
    let repo = RecipeRepository::new((*state.db).clone());
    repo.replace_ingredients(org_id, outlet_id, id, &inputs)
        .await
        .map_err(recipe_error)?;

    info!(
        outlet_id = %outlet_id,
        recipe_id = %id,
        lines = inputs.len(),
        "Recipe ingredients replaced"
    );

    let detail = repo.find_detail(outlet_id, id).await.map_err(recipe_error)?;
    ok(detail)
}

/// PUT `.../recipes/{id}/ingredients/order` - New display order of the lines.
async fn reorder_ingredients(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, id)): Path<(Uuid, Uuid, Uuid)>,
    Json(payload): Json<ReorderRequest>,
) -> ApiResult {
    require_outlet_writer(&state, org_id, outlet_id, auth.user_id()).await?;

    let repo = RecipeRepository::new((*state.db).clone());
    let lines = repo
        .reorder_ingredients(outlet_id, id, &payload.ingredient_ids)
        .await
        .map_err(recipe_error)?;

    ok(lines)
}

/// GET `.../recipes/{id}/cost` - Line-by-line cost on a date (default today).
async fn get_cost(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id, id)): Path<(Uuid, Uuid, Uuid)>,
    Query(query): Query<CostQuery>,
) -> ApiResult {
    require_outlet(&state, org_id, outlet_id, auth.user_id()).await?;
    let as_of = match query.as_of {
        Some(date) => date,
        None => org_today(&state, org_id).await?,
    };

    let repo = RecipeRepository::new((*state.db).clone());
    let ctx = repo
        .costing_context(outlet_id, &[id], as_of)
        .await
        .map_err(|e| internal_error("Failed to load costing data", &e))?;
    let cost = cost_recipe(&ctx, RecipeId::from_uuid(id)).map_err(|e| costing_error(&e))?;

    ok(cost)
}

/// POST `.../recipes/parse` - Turn recipe text into a draft with catalog suggestions.
///
/// Needs the AI parser feature and counts against the monthly parse limit.
/// Nothing is saved; the client confirms the draft through the create route.
async fn parse_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, outlet_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ParseRequest>,
) -> ApiResult {
    require_outlet_writer(&state, org_id, outlet_id, auth.user_id()).await?;
    require_feature(&state, org_id, Feature::AiParser).await?;
    require_within_limit(&state, org_id, ResourceLimit::AiParsesPerMonth).await?;

    let Some(extractor) = state.recipe_extractor.as_deref() else {
        return Err(app_error(&AppError::ExternalService(
            "recipe parser is not configured".to_string(),
        )));
    };

    let catalog = CommonProductRepository::new((*state.db).clone())
        .match_candidates(org_id)
        .await
        .map_err(|e| internal_error("Failed to load catalog", &e))?;

    let draft = parse_recipe_document(extractor, &payload.document, &catalog)
        .await
        .map_err(|e| parser_error(&e))?;

    SubscriptionRepository::increment_ai_parse_count(&state.db, org_id)
        .await
        .map_err(|e| internal_error("Failed to record parse usage", &e))?;

    info!(
        org_id = %org_id,
        outlet_id = %outlet_id,
        ingredients = draft.ingredients.len(),
        "Recipe document parsed"
    );
    ok(draft)
}
