//! Property-based tests for recipe costing.

use chrono::NaiveDate;
use proptest::prelude::*;
use restaurantek_shared::types::{
    CommonProductId, DistributorProductId, RecipeId, RecipeIngredientId,
};
use rust_decimal::Decimal;

use super::*;
use crate::units::{Unit, UnitKind};

/// Cost per gram between 0.000001 and 0.1.
fn per_gram() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|v| Decimal::new(v, 6))
}

/// Quantity in grams, 0.1 to 10,000.0.
fn grams() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|v| Decimal::new(v, 1))
}

/// (cost per gram, quantity, priced?) for each line.
fn lines() -> impl Strategy<Value = Vec<(Decimal, Decimal, bool)>> {
    prop::collection::vec((per_gram(), grams(), prop::bool::weighted(0.8)), 1..12)
}

fn build(shape: &[(Decimal, Decimal, bool)], scale: Decimal) -> (CostingContext, RecipeId) {
    let recipe_id = RecipeId::new();
    let mut ctx = CostingContext::default();
    let mut ingredients = Vec::new();

    for (per_base, qty, priced) in shape {
        let product = CommonProductId::new();
        if *priced {
            ctx.products.insert(
                product,
                ProductCost {
                    common_product_id: product,
                    cost_per_base_unit: *per_base,
                    kind: UnitKind::Weight,
                    distributor_product_id: DistributorProductId::new(),
                    effective_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                },
            );
        }
        ingredients.push(IngredientLine {
            id: RecipeIngredientId::new(),
            source: IngredientSource::Product(product),
            quantity: Some(*qty * scale),
            unit: Some(Unit::Gram),
        });
    }

    ctx.recipes.insert(
        recipe_id,
        RecipeDefinition {
            id: recipe_id,
            name: "prop".to_string(),
            yield_quantity: None,
            yield_unit: None,
            portions: Some(4),
            menu_price: Some(Decimal::TEN),
            ingredients,
        },
    );
    (ctx, recipe_id)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The total is exactly the sum of the costed lines.
    #[test]
    fn prop_total_is_sum_of_costed_lines(shape in lines()) {
        let (ctx, id) = build(&shape, Decimal::ONE);
        let cost = cost_recipe(&ctx, id).unwrap();

        let sum: Decimal = cost.lines.iter().filter_map(|l| l.cost).sum();
        prop_assert_eq!(cost.total_cost, sum);
        prop_assert!(cost.total_cost >= Decimal::ZERO);
    }

    /// A recipe is fully costed exactly when every product has a price.
    #[test]
    fn prop_fully_costed_iff_all_priced(shape in lines()) {
        let (ctx, id) = build(&shape, Decimal::ONE);
        let cost = cost_recipe(&ctx, id).unwrap();

        let all_priced = shape.iter().all(|(_, _, priced)| *priced);
        prop_assert_eq!(cost.fully_costed, all_priced);
        for (line, (_, _, priced)) in cost.lines.iter().zip(&shape) {
            let expected = if *priced { LineStatus::Costed } else { LineStatus::NoPrice };
            prop_assert_eq!(line.status, expected);
        }
    }

    /// Doubling every quantity doubles the cost, up to per-line rounding.
    #[test]
    fn prop_cost_scales_with_quantity(shape in lines()) {
        let (ctx, id) = build(&shape, Decimal::ONE);
        let (ctx2, id2) = build(&shape, Decimal::TWO);
        let single = cost_recipe(&ctx, id).unwrap().total_cost;
        let double = cost_recipe(&ctx2, id2).unwrap().total_cost;

        let tolerance = Decimal::new(3, 4) * Decimal::from(shape.len());
        prop_assert!((double - single * Decimal::TWO).abs() <= tolerance);
    }

    /// In a chain r0 -> r1 -> ... -> rn, using ri inside rj loops iff i <= j.
    #[test]
    fn prop_chain_cycle_detection(len in 2usize..10, i in 0usize..10, j in 0usize..10) {
        prop_assume!(i < len && j < len);
        let ids: Vec<RecipeId> = (0..len).map(|_| RecipeId::new()).collect();
        let graph: RecipeGraph = ids
            .windows(2)
            .map(|pair| (pair[0], vec![pair[1]]))
            .collect();

        prop_assert_eq!(would_create_cycle(&graph, ids[j], ids[i]), i <= j);
    }
}
