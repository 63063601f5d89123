//! Recipe costing errors.

use restaurantek_shared::types::RecipeId;
use thiserror::Error;

/// Errors that stop a recipe from being costed at all.
///
/// Problems with a single ingredient line (missing price, unit mismatch)
/// are reported through the line's status instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CostingError {
    /// The requested recipe, or a referenced sub-recipe, is not loaded.
    #[error("recipe not found: {0}")]
    RecipeNotFound(RecipeId),

    /// Sub-recipes reference each other in a loop.
    #[error("sub-recipe cycle: {}", format_path(.0))]
    Cycle(Vec<RecipeId>),

    /// An intermediate amount does not fit in a decimal.
    #[error("cost calculation overflowed")]
    Overflow,
}

fn format_path(path: &[RecipeId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
