//! Recipe repository: recipes, ingredient lines and costing inputs.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use restaurantek_core::costing::{
    CostingContext, IngredientLine, IngredientSource, ProductCost, RecipeDefinition, RecipeGraph,
    reachable, would_create_cycle,
};
use restaurantek_core::pricing::cost_per_base_unit;
use restaurantek_core::units::Unit;
use restaurantek_shared::types::{
    CommonProductId, DistributorProductId, PageRequest, RecipeId, RecipeIngredientId,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, Func},
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::distributor_product::stored_pack;
use super::price::latest_prices;
use super::{is_unique_violation, like_pattern};
use crate::entities::{common_products, distributor_products, recipe_ingredients, recipes};

/// Error types for recipe operations.
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    /// Recipe not found in the outlet.
    #[error("Recipe not found: {0}")]
    NotFound(Uuid),

    /// The outlet already has a recipe with this name.
    #[error("A recipe named '{0}' already exists")]
    DuplicateName(String),

    /// Other recipes use this one as a sub-recipe.
    #[error("Recipe is used as a sub-recipe by {0} ingredient line(s)")]
    InUse(u64),

    /// An ingredient line is malformed or references something unknown.
    #[error("Invalid ingredient: {0}")]
    InvalidIngredient(String),

    /// A sub-recipe would end up containing the recipe itself.
    #[error("Sub-recipe {0} would make the recipe contain itself")]
    Cycle(Uuid),

    /// Reorder ids are not exactly the recipe's ingredient ids.
    #[error("Ingredient order must list every ingredient of the recipe exactly once")]
    OrderMismatch,

    /// Yield unit is not recognized.
    #[error("Unknown yield unit: {0}")]
    InvalidYieldUnit(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// One ingredient line to write. Exactly one source must be set.
#[derive(Debug, Clone, Default)]
pub struct IngredientInput {
    /// Catalog product.
    pub common_product_id: Option<Uuid>,
    /// Recipe of the same outlet.
    pub sub_recipe_id: Option<Uuid>,
    /// Unlinked text.
    pub free_text: Option<String>,
    /// Amount used.
    pub quantity: Option<Decimal>,
    /// Unit text; stored in canonical form.
    pub unit: Option<String>,
    /// Preparation notes.
    pub notes: Option<String>,
}

/// Input for creating a recipe.
#[derive(Debug, Clone)]
pub struct CreateRecipeInput {
    /// Owning organization.
    pub organization_id: Uuid,
    /// Outlet the recipe belongs to.
    pub outlet_id: Uuid,
    /// Recipe name, unique in the outlet.
    pub name: String,
    /// Category such as "Sauces".
    pub category: Option<String>,
    /// Amount one batch yields.
    pub yield_quantity: Option<Decimal>,
    /// Unit of the yield.
    pub yield_unit: Option<String>,
    /// Portions per batch.
    pub portions: Option<i32>,
    /// Selling price per portion.
    pub menu_price: Option<Decimal>,
    /// Method.
    pub instructions: Option<String>,
    /// Whether the recipe is meant to be used inside others.
    pub is_sub_recipe: bool,
    /// Creating user.
    pub created_by: Option<Uuid>,
    /// Ingredient lines in display order.
    pub ingredients: Vec<IngredientInput>,
}

/// Input for updating recipe fields. `None` leaves a field unchanged,
/// `Some(None)` clears an optional one.
#[derive(Debug, Clone, Default)]
#[allow(clippy::option_option)]
pub struct UpdateRecipeInput {
    /// New name.
    pub name: Option<String>,
    /// New category.
    pub category: Option<Option<String>>,
    /// New batch yield.
    pub yield_quantity: Option<Option<Decimal>>,
    /// New yield unit.
    pub yield_unit: Option<Option<String>>,
    /// New portion count.
    pub portions: Option<Option<i32>>,
    /// New menu price.
    pub menu_price: Option<Option<Decimal>>,
    /// New method.
    pub instructions: Option<Option<String>>,
    /// Sub-recipe flag.
    pub is_sub_recipe: Option<bool>,
}

/// Filter for listing recipes.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    /// Only recipes flagged as sub-recipes.
    pub sub_recipes_only: bool,
}

/// An ingredient line with the names of what it references.
#[derive(Debug, Clone, Serialize)]
pub struct IngredientDetail {
    /// The stored line.
    #[serde(flatten)]
    pub ingredient: recipe_ingredients::Model,
    /// Name of the referenced common product.
    pub product_name: Option<String>,
    /// Name of the referenced sub-recipe.
    pub sub_recipe_name: Option<String>,
}

/// A recipe with its ingredient lines in display order.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    /// The recipe row.
    #[serde(flatten)]
    pub recipe: recipes::Model,
    /// Lines in display order.
    pub ingredients: Vec<IngredientDetail>,
}

/// An ingredient line after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValidIngredient {
    source: IngredientSource,
    quantity: Option<Decimal>,
    unit: Option<Unit>,
    notes: Option<String>,
}

/// Recipe repository.
#[derive(Debug, Clone)]
pub struct RecipeRepository {
    db: DatabaseConnection,
}

impl RecipeRepository {
    /// Creates a new recipe repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists an outlet's recipes by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        outlet_id: Uuid,
        filter: &RecipeFilter,
        page: &PageRequest,
    ) -> Result<(Vec<recipes::Model>, u64), DbErr> {
        let mut query = recipes::Entity::find().filter(recipes::Column::OutletId.eq(outlet_id));
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(recipes::Column::Name)))
                    .like(like_pattern(search)),
            );
        }
        if filter.sub_recipes_only {
            query = query.filter(recipes::Column::IsSubRecipe.eq(true));
        }

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_asc(recipes::Column::Name)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok((items, total))
    }

    /// Finds a recipe in an outlet.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_in_outlet(
        &self,
        outlet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<recipes::Model>, DbErr> {
        recipes::Entity::find_by_id(id)
            .filter(recipes::Column::OutletId.eq(outlet_id))
            .one(&self.db)
            .await
    }

    /// Loads a recipe with its ingredient lines.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or a database error.
    pub async fn find_detail(
        &self,
        outlet_id: Uuid,
        id: Uuid,
    ) -> Result<RecipeDetail, RecipeError> {
        let recipe = self
            .find_in_outlet(outlet_id, id)
            .await?
            .ok_or(RecipeError::NotFound(id))?;
        let ingredients = load_ingredients(&self.db, &[id]).await?;

        let product_ids: Vec<Uuid> =
            ingredients.iter().filter_map(|i| i.common_product_id).collect();
        let sub_ids: Vec<Uuid> = ingredients.iter().filter_map(|i| i.sub_recipe_id).collect();

        let product_names: HashMap<Uuid, String> = if product_ids.is_empty() {
            HashMap::new()
        } else {
            common_products::Entity::find()
                .filter(common_products::Column::Id.is_in(product_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|p| (p.id, p.name))
                .collect()
        };
        let sub_names: HashMap<Uuid, String> = if sub_ids.is_empty() {
            HashMap::new()
        } else {
            recipes::Entity::find()
                .filter(recipes::Column::Id.is_in(sub_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|r| (r.id, r.name))
                .collect()
        };

        let ingredients = ingredients
            .into_iter()
            .map(|ingredient| IngredientDetail {
                product_name: ingredient
                    .common_product_id
                    .and_then(|id| product_names.get(&id).cloned()),
                sub_recipe_name: ingredient
                    .sub_recipe_id
                    .and_then(|id| sub_names.get(&id).cloned()),
                ingredient,
            })
            .collect();

        Ok(RecipeDetail { recipe, ingredients })
    }

    /// Creates a recipe and its ingredient lines in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName`, `InvalidIngredient`, `InvalidYieldUnit`, or
    /// a database error.
    pub async fn create(&self, input: CreateRecipeInput) -> Result<recipes::Model, RecipeError> {
        let yield_unit = canonical_unit(input.yield_unit.as_deref())?;
        let lines = input
            .ingredients
            .iter()
            .map(validate_ingredient)
            .collect::<Result<Vec<_>, _>>()?;

        let txn = self.db.begin().await?;
        ensure_references(&txn, input.organization_id, input.outlet_id, &lines).await?;

        let now = chrono::Utc::now().into();
        let name = input.name.trim().to_string();
        let inserted = recipes::ActiveModel {
            id: Set(Uuid::now_v7()),
            organization_id: Set(input.organization_id),
            outlet_id: Set(input.outlet_id),
            name: Set(name.clone()),
            category: Set(input.category),
            yield_quantity: Set(input.yield_quantity),
            yield_unit: Set(yield_unit),
            portions: Set(input.portions),
            menu_price: Set(input.menu_price),
            instructions: Set(input.instructions),
            is_sub_recipe: Set(input.is_sub_recipe),
            created_by: Set(input.created_by),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await;

        let recipe = match inserted {
            Ok(recipe) => recipe,
            Err(e) if is_unique_violation(&e) => return Err(RecipeError::DuplicateName(name)),
            Err(e) => return Err(e.into()),
        };

        insert_lines(&txn, recipe.id, lines).await?;
        txn.commit().await?;

        debug!(recipe_id = %recipe.id, "recipe created");
        Ok(recipe)
    }

    /// Updates recipe fields.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `DuplicateName`, `InvalidYieldUnit`, or a
    /// database error.
    pub async fn update(
        &self,
        outlet_id: Uuid,
        id: Uuid,
        input: UpdateRecipeInput,
    ) -> Result<recipes::Model, RecipeError> {
        let recipe = self
            .find_in_outlet(outlet_id, id)
            .await?
            .ok_or(RecipeError::NotFound(id))?;

        let mut active: recipes::ActiveModel = recipe.into();
        let new_name = input.name.map(|n| n.trim().to_string());
        if let Some(name) = &new_name {
            active.name = Set(name.clone());
        }
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        if let Some(quantity) = input.yield_quantity {
            active.yield_quantity = Set(quantity);
        }
        if let Some(unit) = input.yield_unit {
            active.yield_unit = Set(canonical_unit(unit.as_deref())?);
        }
        if let Some(portions) = input.portions {
            active.portions = Set(portions);
        }
        if let Some(price) = input.menu_price {
            active.menu_price = Set(price);
        }
        if let Some(instructions) = input.instructions {
            active.instructions = Set(instructions);
        }
        if let Some(is_sub_recipe) = input.is_sub_recipe {
            active.is_sub_recipe = Set(is_sub_recipe);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        match active.update(&self.db).await {
            Ok(recipe) => Ok(recipe),
            Err(e) if is_unique_violation(&e) => {
                Err(RecipeError::DuplicateName(new_name.unwrap_or_default()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces all ingredient lines of a recipe.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InvalidIngredient`, `Cycle`, or a database error.
    pub async fn replace_ingredients(
        &self,
        org_id: Uuid,
        outlet_id: Uuid,
        id: Uuid,
        ingredients: &[IngredientInput],
    ) -> Result<Vec<recipe_ingredients::Model>, RecipeError> {
        let lines = ingredients
            .iter()
            .map(validate_ingredient)
            .collect::<Result<Vec<_>, _>>()?;

        let txn = self.db.begin().await?;
        let exists = recipes::Entity::find_by_id(id)
            .filter(recipes::Column::OutletId.eq(outlet_id))
            .one(&txn)
            .await?
            .is_some();
        if !exists {
            return Err(RecipeError::NotFound(id));
        }
        ensure_references(&txn, org_id, outlet_id, &lines).await?;

        let mut graph = dependency_graph(&txn, outlet_id).await?;
        graph.remove(&RecipeId::from_uuid(id));
        for line in &lines {
            if let IngredientSource::SubRecipe(sub) = line.source {
                if would_create_cycle(&graph, RecipeId::from_uuid(id), sub) {
                    return Err(RecipeError::Cycle(sub.into_inner()));
                }
            }
        }

        recipe_ingredients::Entity::delete_many()
            .filter(recipe_ingredients::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;
        let written = insert_lines(&txn, id, lines).await?;
        touch_recipe(&txn, id).await?;
        txn.commit().await?;

        Ok(written)
    }

    /// Sets the display order of a recipe's ingredients.
    ///
    /// `ordered_ids` must contain every ingredient id of the recipe once.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `OrderMismatch`, or a database error.
    pub async fn reorder_ingredients(
        &self,
        outlet_id: Uuid,
        id: Uuid,
        ordered_ids: &[Uuid],
    ) -> Result<Vec<recipe_ingredients::Model>, RecipeError> {
        if self.find_in_outlet(outlet_id, id).await?.is_none() {
            return Err(RecipeError::NotFound(id));
        }

        let txn = self.db.begin().await?;
        let existing = load_ingredients(&txn, &[id]).await?;
        let existing_ids: Vec<Uuid> = existing.iter().map(|i| i.id).collect();
        if !is_permutation(&existing_ids, ordered_ids) {
            return Err(RecipeError::OrderMismatch);
        }

        for (position, ingredient_id) in ordered_ids.iter().enumerate() {
            recipe_ingredients::Entity::update_many()
                .col_expr(recipe_ingredients::Column::SortOrder, Expr::value(sort_order(position)))
                .filter(recipe_ingredients::Column::Id.eq(*ingredient_id))
                .exec(&txn)
                .await?;
        }
        touch_recipe(&txn, id).await?;
        let reordered = load_ingredients(&txn, &[id]).await?;
        txn.commit().await?;

        Ok(reordered)
    }

    /// Deletes a recipe that no other recipe uses.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InUse`, or a database error.
    pub async fn delete(&self, outlet_id: Uuid, id: Uuid) -> Result<(), RecipeError> {
        if self.find_in_outlet(outlet_id, id).await?.is_none() {
            return Err(RecipeError::NotFound(id));
        }

        let users = recipe_ingredients::Entity::find()
            .filter(recipe_ingredients::Column::SubRecipeId.eq(id))
            .count(&self.db)
            .await?;
        if users > 0 {
            return Err(RecipeError::InUse(users));
        }

        recipes::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    /// Number of recipes in the organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_in_org(&self, org_id: Uuid) -> Result<u64, DbErr> {
        recipes::Entity::find()
            .filter(recipes::Column::OrganizationId.eq(org_id))
            .count(&self.db)
            .await
    }

    /// Sub-recipe edges between the outlet's recipes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn dependency_graph(&self, outlet_id: Uuid) -> Result<RecipeGraph, DbErr> {
        dependency_graph(&self.db, outlet_id).await
    }

    /// Loads everything needed to cost `roots` in an outlet on `as_of`.
    ///
    /// Includes every recipe reachable through sub-recipes and, for each
    /// common product they use, the cheapest mapped distributor product
    /// with a price on or before `as_of`.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn costing_context(
        &self,
        outlet_id: Uuid,
        roots: &[Uuid],
        as_of: NaiveDate,
    ) -> Result<CostingContext, DbErr> {
        let graph = dependency_graph(&self.db, outlet_id).await?;
        let root_ids: Vec<RecipeId> = roots.iter().copied().map(RecipeId::from_uuid).collect();
        let wanted: Vec<Uuid> = reachable(&graph, &root_ids)
            .into_iter()
            .map(RecipeId::into_inner)
            .collect();

        let recipe_rows = recipes::Entity::find()
            .filter(recipes::Column::OutletId.eq(outlet_id))
            .filter(recipes::Column::Id.is_in(wanted.clone()))
            .all(&self.db)
            .await?;
        let mut lines_by_recipe: HashMap<Uuid, Vec<recipe_ingredients::Model>> = HashMap::new();
        for line in load_ingredients(&self.db, &wanted).await? {
            lines_by_recipe.entry(line.recipe_id).or_default().push(line);
        }

        let recipes: HashMap<RecipeId, RecipeDefinition> = recipe_rows
            .iter()
            .map(|recipe| {
                let lines = lines_by_recipe.remove(&recipe.id).unwrap_or_default();
                let definition = to_definition(recipe, &lines);
                (definition.id, definition)
            })
            .collect();

        let product_ids: HashSet<Uuid> = recipes
            .values()
            .flat_map(|r| r.ingredients.iter())
            .filter_map(|line| match line.source {
                IngredientSource::Product(id) => Some(id.into_inner()),
                _ => None,
            })
            .collect();
        let products = self
            .product_costs(outlet_id, product_ids.into_iter().collect(), as_of)
            .await?;

        Ok(CostingContext { products, recipes })
    }

    async fn product_costs(
        &self,
        outlet_id: Uuid,
        common_ids: Vec<Uuid>,
        as_of: NaiveDate,
    ) -> Result<HashMap<CommonProductId, ProductCost>, DbErr> {
        if common_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let preferred: HashMap<Uuid, Option<Unit>> = common_products::Entity::find()
            .filter(common_products::Column::Id.is_in(common_ids.clone()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p.default_unit.as_deref().and_then(|u| Unit::parse(u).ok())))
            .collect();

        let offers = distributor_products::Entity::find()
            .filter(distributor_products::Column::OutletId.eq(outlet_id))
            .filter(distributor_products::Column::IsActive.eq(true))
            .filter(distributor_products::Column::CommonProductId.is_in(common_ids))
            .all(&self.db)
            .await?;
        let offer_ids: Vec<Uuid> = offers.iter().map(|o| o.id).collect();
        let prices: HashMap<Uuid, (Decimal, NaiveDate)> =
            latest_prices(&self.db, outlet_id, as_of, Some(&offer_ids))
                .await?
                .into_iter()
                .map(|p| (p.distributor_product_id, (p.price, p.effective_date)))
                .collect();

        let mut by_product: HashMap<Uuid, Vec<ProductCost>> = HashMap::new();
        for offer in &offers {
            let (Some(common_id), Some(pack), Some(&(price, effective_date))) =
                (offer.common_product_id, stored_pack(offer), prices.get(&offer.id))
            else {
                continue;
            };
            let Ok(cost) = cost_per_base_unit(price, &pack) else {
                continue;
            };
            by_product.entry(common_id).or_default().push(ProductCost {
                common_product_id: CommonProductId::from_uuid(common_id),
                cost_per_base_unit: cost,
                kind: pack.kind(),
                distributor_product_id: DistributorProductId::from_uuid(offer.id),
                effective_date,
            });
        }

        Ok(by_product
            .into_iter()
            .filter_map(|(common_id, offers)| {
                let kind = preferred.get(&common_id).copied().flatten().map(Unit::kind);
                ProductCost::cheapest(offers, kind).map(|c| (c.common_product_id, c))
            })
            .collect())
    }
}

/// Sub-recipe edges between recipes of an outlet.
pub(crate) async fn dependency_graph<C: ConnectionTrait>(
    conn: &C,
    outlet_id: Uuid,
) -> Result<RecipeGraph, DbErr> {
    let edges = recipe_ingredients::Entity::find()
        .inner_join(recipes::Entity)
        .filter(recipes::Column::OutletId.eq(outlet_id))
        .filter(recipe_ingredients::Column::SubRecipeId.is_not_null())
        .all(conn)
        .await?;

    let mut graph = RecipeGraph::new();
    for edge in edges {
        if let Some(sub) = edge.sub_recipe_id {
            graph
                .entry(RecipeId::from_uuid(edge.recipe_id))
                .or_default()
                .push(RecipeId::from_uuid(sub));
        }
    }
    Ok(graph)
}

async fn load_ingredients<C: ConnectionTrait>(
    conn: &C,
    recipe_ids: &[Uuid],
) -> Result<Vec<recipe_ingredients::Model>, DbErr> {
    if recipe_ids.is_empty() {
        return Ok(Vec::new());
    }
    recipe_ingredients::Entity::find()
        .filter(recipe_ingredients::Column::RecipeId.is_in(recipe_ids.iter().copied()))
        .order_by_asc(recipe_ingredients::Column::RecipeId)
        .order_by_asc(recipe_ingredients::Column::SortOrder)
        .all(conn)
        .await
}

/// Checks that products belong to the organization and sub-recipes to the outlet.
async fn ensure_references<C: ConnectionTrait>(
    conn: &C,
    org_id: Uuid,
    outlet_id: Uuid,
    lines: &[ValidIngredient],
) -> Result<(), RecipeError> {
    for line in lines {
        match &line.source {
            IngredientSource::Product(id) => {
                let found = common_products::Entity::find_by_id(id.into_inner())
                    .filter(common_products::Column::OrganizationId.eq(org_id))
                    .one(conn)
                    .await?;
                if found.is_none() {
                    return Err(RecipeError::InvalidIngredient(format!(
                        "common product {id} not found"
                    )));
                }
            }
            IngredientSource::SubRecipe(id) => {
                let found = recipes::Entity::find_by_id(id.into_inner())
                    .filter(recipes::Column::OutletId.eq(outlet_id))
                    .one(conn)
                    .await?;
                if found.is_none() {
                    return Err(RecipeError::InvalidIngredient(format!(
                        "sub-recipe {id} not found in this outlet"
                    )));
                }
            }
            IngredientSource::FreeText(_) => {}
        }
    }
    Ok(())
}

async fn insert_lines<C: ConnectionTrait>(
    conn: &C,
    recipe_id: Uuid,
    lines: Vec<ValidIngredient>,
) -> Result<Vec<recipe_ingredients::Model>, DbErr> {
    let now = chrono::Utc::now();
    let mut written = Vec::with_capacity(lines.len());
    for (position, line) in lines.into_iter().enumerate() {
        let (common_product_id, sub_recipe_id, free_text) = match line.source {
            IngredientSource::Product(id) => (Some(id.into_inner()), None, None),
            IngredientSource::SubRecipe(id) => (None, Some(id.into_inner()), None),
            IngredientSource::FreeText(text) => (None, None, Some(text)),
        };
        let model = recipe_ingredients::ActiveModel {
            id: Set(Uuid::now_v7()),
            recipe_id: Set(recipe_id),
            common_product_id: Set(common_product_id),
            sub_recipe_id: Set(sub_recipe_id),
            free_text: Set(free_text),
            quantity: Set(line.quantity),
            unit: Set(line.unit.map(|u| u.canonical().to_string())),
            notes: Set(line.notes),
            sort_order: Set(sort_order(position)),
            created_at: Set(now.into()),
        }
        .insert(conn)
        .await?;
        written.push(model);
    }
    Ok(written)
}

async fn touch_recipe<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<(), DbErr> {
    recipes::Entity::update_many()
        .col_expr(recipes::Column::UpdatedAt, Expr::current_timestamp().into())
        .filter(recipes::Column::Id.eq(id))
        .exec(conn)
        .await?;
    Ok(())
}

fn sort_order(position: usize) -> i32 {
    i32::try_from(position).unwrap_or(i32::MAX)
}

fn canonical_unit(text: Option<&str>) -> Result<Option<String>, RecipeError> {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        None => Ok(None),
        Some(t) => Unit::parse(t)
            .map(|u| Some(u.canonical().to_string()))
            .map_err(|_| RecipeError::InvalidYieldUnit(t.to_string())),
    }
}

fn validate_ingredient(input: &IngredientInput) -> Result<ValidIngredient, RecipeError> {
    let free_text = input
        .free_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let source = match (input.common_product_id, input.sub_recipe_id, free_text) {
        (Some(id), None, None) => IngredientSource::Product(CommonProductId::from_uuid(id)),
        (None, Some(id), None) => IngredientSource::SubRecipe(RecipeId::from_uuid(id)),
        (None, None, Some(text)) => IngredientSource::FreeText(text.to_string()),
        _ => {
            return Err(RecipeError::InvalidIngredient(
                "exactly one of common_product_id, sub_recipe_id or free_text is required"
                    .to_string(),
            ));
        }
    };

    if input.quantity.is_some_and(|q| q <= Decimal::ZERO) {
        return Err(RecipeError::InvalidIngredient(
            "quantity must be positive".to_string(),
        ));
    }

    let unit = match input.unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        None => None,
        Some(text) => Some(
            Unit::parse(text)
                .map_err(|_| RecipeError::InvalidIngredient(format!("unknown unit '{text}'")))?,
        ),
    };

    Ok(ValidIngredient {
        source,
        quantity: input.quantity,
        unit,
        notes: input.notes.clone().filter(|n| !n.trim().is_empty()),
    })
}

fn is_permutation(existing: &[Uuid], ordered: &[Uuid]) -> bool {
    if existing.len() != ordered.len() {
        return false;
    }
    let ordered_set: HashSet<&Uuid> = ordered.iter().collect();
    ordered_set.len() == ordered.len() && existing.iter().all(|id| ordered_set.contains(id))
}

/// Builds the costing view of a stored recipe.
fn to_definition(recipe: &recipes::Model, lines: &[recipe_ingredients::Model]) -> RecipeDefinition {
    let parse = |unit: Option<&str>| unit.and_then(|u| Unit::parse(u).ok());

    RecipeDefinition {
        id: RecipeId::from_uuid(recipe.id),
        name: recipe.name.clone(),
        yield_quantity: recipe.yield_quantity,
        yield_unit: parse(recipe.yield_unit.as_deref()),
        portions: recipe.portions.and_then(|p| u32::try_from(p).ok()),
        menu_price: recipe.menu_price,
        ingredients: lines
            .iter()
            .map(|line| IngredientLine {
                id: RecipeIngredientId::from_uuid(line.id),
                source: match (line.common_product_id, line.sub_recipe_id) {
                    (Some(id), _) => IngredientSource::Product(CommonProductId::from_uuid(id)),
                    (None, Some(id)) => IngredientSource::SubRecipe(RecipeId::from_uuid(id)),
                    (None, None) => {
                        IngredientSource::FreeText(line.free_text.clone().unwrap_or_default())
                    }
                },
                quantity: line.quantity,
                unit: parse(line.unit.as_deref()),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product_line(quantity: Option<Decimal>, unit: Option<&str>) -> IngredientInput {
        IngredientInput {
            common_product_id: Some(Uuid::now_v7()),
            quantity,
            unit: unit.map(str::to_string),
            ..IngredientInput::default()
        }
    }

    #[test]
    fn test_validate_requires_exactly_one_source() {
        let none = IngredientInput::default();
        assert!(matches!(validate_ingredient(&none), Err(RecipeError::InvalidIngredient(_))));

        let two = IngredientInput {
            common_product_id: Some(Uuid::now_v7()),
            free_text: Some("salt".to_string()),
            ..IngredientInput::default()
        };
        assert!(matches!(validate_ingredient(&two), Err(RecipeError::InvalidIngredient(_))));

        let blank_text = IngredientInput {
            free_text: Some("   ".to_string()),
            ..IngredientInput::default()
        };
        assert!(validate_ingredient(&blank_text).is_err());
    }

    #[test]
    fn test_validate_normalizes_unit_and_quantity() {
        let line = validate_ingredient(&product_line(Some(dec!(2)), Some(" Lbs "))).unwrap();
        assert_eq!(line.unit, Some(Unit::Pound));

        assert!(validate_ingredient(&product_line(Some(dec!(0)), None)).is_err());
        assert!(validate_ingredient(&product_line(Some(dec!(1)), Some("handful"))).is_err());
    }

    #[test]
    fn test_is_permutation() {
        let (a, b, c) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        assert!(is_permutation(&[a, b, c], &[c, a, b]));
        assert!(!is_permutation(&[a, b, c], &[a, b]));
        assert!(!is_permutation(&[a, b], &[a, a]));
        assert!(!is_permutation(&[a, b], &[a, c]));
        assert!(is_permutation(&[], &[]));
    }

    #[test]
    fn test_canonical_unit() {
        assert_eq!(canonical_unit(Some("Quarts")).unwrap().as_deref(), Some("quart"));
        assert_eq!(canonical_unit(Some("  ")).unwrap(), None);
        assert!(matches!(
            canonical_unit(Some("bucket")),
            Err(RecipeError::InvalidYieldUnit(_))
        ));
    }

    #[test]
    fn test_to_definition_maps_sources() {
        let now = chrono::Utc::now().into();
        let recipe = recipes::Model {
            id: Uuid::now_v7(),
            organization_id: Uuid::nil(),
            outlet_id: Uuid::nil(),
            name: "Soup".to_string(),
            category: None,
            yield_quantity: Some(dec!(4)),
            yield_unit: Some("quart".to_string()),
            portions: Some(-1),
            menu_price: None,
            instructions: None,
            is_sub_recipe: false,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        let sub = Uuid::now_v7();
        let line = |common: Option<Uuid>, sub: Option<Uuid>, text: Option<&str>| {
            recipe_ingredients::Model {
                id: Uuid::now_v7(),
                recipe_id: recipe.id,
                common_product_id: common,
                sub_recipe_id: sub,
                free_text: text.map(str::to_string),
                quantity: Some(dec!(1)),
                unit: Some("cup".to_string()),
                notes: None,
                sort_order: 0,
                created_at: now,
            }
        };
        let lines = vec![line(None, Some(sub), None), line(None, None, Some("pepper"))];

        let definition = to_definition(&recipe, &lines);
        assert_eq!(definition.yield_unit, Some(Unit::Quart));
        assert_eq!(definition.portions, None);
        assert_eq!(
            definition.ingredients[0].source,
            IngredientSource::SubRecipe(RecipeId::from_uuid(sub))
        );
        assert_eq!(
            definition.ingredients[1].source,
            IngredientSource::FreeText("pepper".to_string())
        );
        assert_eq!(definition.ingredients[1].unit, Some(Unit::Cup));
    }
}
