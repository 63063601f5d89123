//! Sub-recipe dependency checks.

use std::collections::{HashMap, HashSet};

use restaurantek_shared::types::RecipeId;

/// Direct sub-recipe edges: recipe -> recipes it uses as ingredients.
pub type RecipeGraph = HashMap<RecipeId, Vec<RecipeId>>;

/// Returns true if adding `candidate_sub` as an ingredient of `recipe`
/// would make a recipe contain itself, directly or through other recipes.
///
/// ```
/// use std::collections::HashMap;
/// use restaurantek_core::costing::would_create_cycle;
/// use restaurantek_shared::types::RecipeId;
///
/// let (sauce, base) = (RecipeId::new(), RecipeId::new());
/// let graph = HashMap::from([(sauce, vec![base])]);
///
/// assert!(would_create_cycle(&graph, base, sauce));
/// assert!(!would_create_cycle(&graph, sauce, base));
/// ```
#[must_use]
pub fn would_create_cycle(graph: &RecipeGraph, recipe: RecipeId, candidate_sub: RecipeId) -> bool {
    if recipe == candidate_sub {
        return true;
    }

    let mut seen = HashSet::new();
    let mut pending = vec![candidate_sub];
    while let Some(current) = pending.pop() {
        if current == recipe {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        if let Some(children) = graph.get(&current) {
            pending.extend(children.iter().copied());
        }
    }
    false
}

/// Returns every recipe reachable from `roots`, the roots included.
#[must_use]
pub fn reachable(graph: &RecipeGraph, roots: &[RecipeId]) -> HashSet<RecipeId> {
    let mut seen = HashSet::new();
    let mut pending = roots.to_vec();
    while let Some(current) = pending.pop() {
        if seen.insert(current) {
            if let Some(children) = graph.get(&current) {
                pending.extend(children.iter().copied());
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_reference_is_cycle() {
        let id = RecipeId::new();
        assert!(would_create_cycle(&RecipeGraph::new(), id, id));
    }

    #[test]
    fn test_transitive_cycle() {
        let (a, b, c) = (RecipeId::new(), RecipeId::new(), RecipeId::new());
        // a uses b, b uses c
        let graph = RecipeGraph::from([(a, vec![b]), (b, vec![c])]);

        assert!(would_create_cycle(&graph, c, a));
        assert!(would_create_cycle(&graph, b, a));
        assert!(!would_create_cycle(&graph, a, c));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let (top, left, right, bottom) =
            (RecipeId::new(), RecipeId::new(), RecipeId::new(), RecipeId::new());
        let graph = RecipeGraph::from([
            (top, vec![left, right]),
            (left, vec![bottom]),
            (right, vec![bottom]),
        ]);

        assert!(!would_create_cycle(&graph, top, bottom));
        assert_eq!(reachable(&graph, &[top]).len(), 4);
        assert_eq!(reachable(&graph, &[left]).len(), 2);
    }
}
