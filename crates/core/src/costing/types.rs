//! Inputs and outputs of recipe costing.

use std::collections::HashMap;

use chrono::NaiveDate;
use restaurantek_shared::types::{
    CommonProductId, DistributorProductId, RecipeId, RecipeIngredientId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::units::{Unit, UnitKind};

/// The price chosen for a common product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCost {
    /// Product being priced.
    pub common_product_id: CommonProductId,
    /// Cost of one gram, milliliter or each.
    pub cost_per_base_unit: Decimal,
    /// What the base unit measures.
    pub kind: UnitKind,
    /// Distributor product the price comes from.
    pub distributor_product_id: DistributorProductId,
    /// Date of the price used.
    pub effective_date: NaiveDate,
}

impl ProductCost {
    /// Picks the cheapest offer among the distributor products mapped to one
    /// common product.
    ///
    /// Offers measured in `preferred` win over others so that a product
    /// stocked by weight is not priced from a per-each listing. Equal costs go
    /// to the most recent price.
    #[must_use]
    pub fn cheapest(
        offers: impl IntoIterator<Item = Self>,
        preferred: Option<UnitKind>,
    ) -> Option<Self> {
        let offers: Vec<Self> = offers.into_iter().collect();
        let preferred_available =
            preferred.is_some_and(|kind| offers.iter().any(|o| o.kind == kind));

        offers
            .into_iter()
            .filter(|o| !preferred_available || Some(o.kind) == preferred)
            .min_by(|a, b| {
                a.cost_per_base_unit
                    .cmp(&b.cost_per_base_unit)
                    .then_with(|| b.effective_date.cmp(&a.effective_date))
            })
    }
}

/// Where an ingredient line gets its cost from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum IngredientSource {
    /// A common product from the catalog.
    Product(CommonProductId),
    /// Another recipe used as an ingredient.
    SubRecipe(RecipeId),
    /// Text that is not linked to anything yet.
    FreeText(String),
}

/// One ingredient line of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientLine {
    /// Ingredient row id.
    pub id: RecipeIngredientId,
    /// What the line refers to.
    pub source: IngredientSource,
    /// Amount used.
    pub quantity: Option<Decimal>,
    /// Unit of `quantity`.
    pub unit: Option<Unit>,
}

/// A recipe as needed for costing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDefinition {
    /// Recipe id.
    pub id: RecipeId,
    /// Recipe name.
    pub name: String,
    /// Amount one batch produces.
    pub yield_quantity: Option<Decimal>,
    /// Unit of `yield_quantity`.
    pub yield_unit: Option<Unit>,
    /// Portions one batch serves.
    pub portions: Option<u32>,
    /// Selling price of one portion.
    pub menu_price: Option<Decimal>,
    /// Ingredient lines in display order.
    pub ingredients: Vec<IngredientLine>,
}

impl RecipeDefinition {
    /// Yield in base units, if a positive yield is set.
    #[must_use]
    pub fn yield_in_base_units(&self) -> Option<(Decimal, UnitKind)> {
        let quantity = self.yield_quantity.filter(|q| *q > Decimal::ZERO)?;
        let unit = self.yield_unit?;
        let base = unit.to_base(quantity).ok()?;
        Some((base, unit.kind()))
    }

    /// Ids of the recipes this one uses directly.
    pub fn sub_recipe_ids(&self) -> impl Iterator<Item = RecipeId> + '_ {
        self.ingredients.iter().filter_map(|line| match line.source {
            IngredientSource::SubRecipe(id) => Some(id),
            _ => None,
        })
    }
}

/// Everything needed to cost recipes in one outlet on one date.
#[derive(Debug, Clone, Default)]
pub struct CostingContext {
    /// Chosen price per common product.
    pub products: HashMap<CommonProductId, ProductCost>,
    /// Recipes reachable from the ones being costed.
    pub recipes: HashMap<RecipeId, RecipeDefinition>,
}

/// Outcome of costing one ingredient line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    /// The line has a cost.
    Costed,
    /// The product has no current price.
    NoPrice,
    /// The line is not linked to a product or recipe.
    FreeText,
    /// Quantity or unit is missing.
    MissingQuantity,
    /// The line's unit measures something else than the priced product.
    UnitMismatch,
    /// The sub-recipe has no usable yield.
    MissingYield,
}

/// Cost of one ingredient line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCost {
    /// Ingredient row id.
    pub ingredient_id: RecipeIngredientId,
    /// What the line refers to.
    pub source: IngredientSource,
    /// Quantity in base units, when it could be computed.
    pub base_quantity: Option<Decimal>,
    /// Cost of one base unit of the ingredient.
    pub cost_per_base_unit: Option<Decimal>,
    /// Line cost, 4 dp. Set only when `status` is [`LineStatus::Costed`].
    pub cost: Option<Decimal>,
    /// Costing outcome.
    pub status: LineStatus,
    /// Distributor product whose price was used.
    pub distributor_product_id: Option<DistributorProductId>,
    /// True when a costed sub-recipe line itself has uncosted lines.
    pub incomplete_sub_recipe: bool,
}

/// Cost breakdown of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeCost {
    /// Recipe id.
    pub recipe_id: RecipeId,
    /// Recipe name.
    pub name: String,
    /// Sum of costed lines, 4 dp.
    pub total_cost: Decimal,
    /// `total_cost / portions`, 4 dp.
    pub cost_per_portion: Option<Decimal>,
    /// `cost_per_portion / menu_price * 100`, 2 dp.
    pub food_cost_percent: Option<Decimal>,
    /// True when every line, including those inside sub-recipes, is costed.
    pub fully_costed: bool,
    /// Per-line breakdown in recipe order.
    pub lines: Vec<LineCost>,
}
