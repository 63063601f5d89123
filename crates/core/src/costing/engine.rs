//! Recipe cost calculation.

use std::collections::HashMap;

use restaurantek_shared::types::{CommonProductId, RecipeId};
use rust_decimal::{Decimal, RoundingStrategy};

use super::error::CostingError;
use super::types::{
    CostingContext, IngredientLine, IngredientSource, LineCost, LineStatus, RecipeCost,
    RecipeDefinition,
};

/// Decimal places of money amounts in a cost breakdown.
pub const COST_SCALE: u32 = 4;

/// Decimal places of the food cost percentage.
pub const PERCENT_SCALE: u32 = 2;

fn round_cost(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(COST_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Costs a recipe and, recursively, the sub-recipes it uses.
///
/// Each sub-recipe is costed once per call no matter how often it appears.
pub fn cost_recipe(ctx: &CostingContext, recipe_id: RecipeId) -> Result<RecipeCost, CostingError> {
    RecipeCoster::new(ctx).cost(recipe_id)
}

/// Costs several recipes sharing one memo, e.g. for a recipe list.
pub fn cost_recipes(
    ctx: &CostingContext,
    recipe_ids: &[RecipeId],
) -> Vec<(RecipeId, Result<RecipeCost, CostingError>)> {
    let mut coster = RecipeCoster::new(ctx);
    recipe_ids
        .iter()
        .map(|id| (*id, coster.cost(*id)))
        .collect()
}

enum LineTarget {
    Product(CommonProductId),
    SubRecipe(RecipeId, RecipeCost),
}

struct RecipeCoster<'a> {
    ctx: &'a CostingContext,
    memo: HashMap<RecipeId, RecipeCost>,
    stack: Vec<RecipeId>,
}

impl<'a> RecipeCoster<'a> {
    fn new(ctx: &'a CostingContext) -> Self {
        Self {
            ctx,
            memo: HashMap::new(),
            stack: Vec::new(),
        }
    }

    fn cost(&mut self, recipe_id: RecipeId) -> Result<RecipeCost, CostingError> {
        if let Some(done) = self.memo.get(&recipe_id) {
            return Ok(done.clone());
        }
        if let Some(start) = self.stack.iter().position(|id| *id == recipe_id) {
            let mut path = self.stack[start..].to_vec();
            path.push(recipe_id);
            return Err(CostingError::Cycle(path));
        }

        let ctx = self.ctx;
        let recipe = ctx
            .recipes
            .get(&recipe_id)
            .ok_or(CostingError::RecipeNotFound(recipe_id))?;

        self.stack.push(recipe_id);
        let lines = recipe
            .ingredients
            .iter()
            .map(|line| self.cost_line(line))
            .collect::<Result<Vec<_>, _>>();
        self.stack.pop();
        let lines = lines?;

        let result = summarize(recipe, lines)?;
        self.memo.insert(recipe_id, result.clone());
        Ok(result)
    }

    fn cost_line(&mut self, line: &IngredientLine) -> Result<LineCost, CostingError> {
        let mut out = LineCost {
            ingredient_id: line.id,
            source: line.source.clone(),
            base_quantity: None,
            cost_per_base_unit: None,
            cost: None,
            status: LineStatus::Costed,
            distributor_product_id: None,
            incomplete_sub_recipe: false,
        };

        // Sub-recipes are costed even when this line lacks a quantity so that
        // cycles surface regardless of how the line is filled in.
        let target = match &line.source {
            IngredientSource::FreeText(_) => {
                out.status = LineStatus::FreeText;
                return Ok(out);
            }
            IngredientSource::SubRecipe(sub_id) => {
                LineTarget::SubRecipe(*sub_id, self.cost(*sub_id)?)
            }
            IngredientSource::Product(product_id) => LineTarget::Product(*product_id),
        };

        let quantity = line.quantity.filter(|q| *q > Decimal::ZERO);
        let (Some(quantity), Some(unit)) = (quantity, line.unit) else {
            out.status = LineStatus::MissingQuantity;
            return Ok(out);
        };
        let base_quantity = unit.to_base(quantity).map_err(|_| CostingError::Overflow)?;
        out.base_quantity = Some(base_quantity);

        let per_base = match target {
            LineTarget::Product(product_id) => {
                let Some(price) = self.ctx.products.get(&product_id) else {
                    out.status = LineStatus::NoPrice;
                    return Ok(out);
                };
                if price.kind != unit.kind() {
                    out.status = LineStatus::UnitMismatch;
                    return Ok(out);
                }
                out.distributor_product_id = Some(price.distributor_product_id);
                price.cost_per_base_unit
            }
            LineTarget::SubRecipe(sub_id, sub_cost) => {
                let sub = self
                    .ctx
                    .recipes
                    .get(&sub_id)
                    .ok_or(CostingError::RecipeNotFound(sub_id))?;
                let Some((yield_base, yield_kind)) = sub.yield_in_base_units() else {
                    out.status = LineStatus::MissingYield;
                    return Ok(out);
                };
                if yield_kind != unit.kind() {
                    out.status = LineStatus::UnitMismatch;
                    return Ok(out);
                }
                out.incomplete_sub_recipe = !sub_cost.fully_costed;
                sub_cost
                    .total_cost
                    .checked_div(yield_base)
                    .ok_or(CostingError::Overflow)?
            }
        };

        let cost = base_quantity
            .checked_mul(per_base)
            .ok_or(CostingError::Overflow)?;
        out.cost_per_base_unit = Some(per_base);
        out.cost = Some(round_cost(cost));
        Ok(out)
    }
}

fn summarize(recipe: &RecipeDefinition, lines: Vec<LineCost>) -> Result<RecipeCost, CostingError> {
    let total_cost = lines
        .iter()
        .filter_map(|l| l.cost)
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .ok_or(CostingError::Overflow)?;

    let fully_costed = lines
        .iter()
        .all(|l| l.status == LineStatus::Costed && !l.incomplete_sub_recipe);

    let portions = recipe.portions.filter(|p| *p > 0).map(Decimal::from);
    let unrounded_per_portion = portions.and_then(|p| total_cost.checked_div(p));

    let food_cost_percent = match (unrounded_per_portion, recipe.menu_price) {
        (Some(per_portion), Some(price)) if price > Decimal::ZERO => per_portion
            .checked_div(price)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(|pct| {
                pct.round_dp_with_strategy(PERCENT_SCALE, RoundingStrategy::MidpointNearestEven)
            }),
        _ => None,
    };

    Ok(RecipeCost {
        recipe_id: recipe.id,
        name: recipe.name.clone(),
        total_cost: round_cost(total_cost),
        cost_per_portion: unrounded_per_portion.map(round_cost),
        food_cost_percent,
        fully_costed,
        lines,
    })
}
