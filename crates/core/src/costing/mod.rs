//! Recipe costing.
//!
//! This module implements:
//! - Cheapest-offer selection per common product
//! - Line and recipe costs from per-base-unit prices
//! - Sub-recipe costing through the sub-recipe's yield
//! - Cycle detection for sub-recipe references

pub mod engine;
pub mod error;
pub mod graph;
pub mod types;

#[cfg(test)]
mod props;

pub use engine::{COST_SCALE, PERCENT_SCALE, cost_recipe, cost_recipes};
pub use error::CostingError;
pub use graph::{RecipeGraph, reachable, would_create_cycle};
pub use types::{
    CostingContext, IngredientLine, IngredientSource, LineCost, LineStatus, ProductCost,
    RecipeCost, RecipeDefinition,
};
