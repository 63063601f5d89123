//! From document text to a reviewed recipe draft.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::client::RecipeExtractor;
use super::error::ParserError;
use super::prompt::validate_document;
use super::response::ParsedRecipe;
use crate::matching::{DEFAULT_LIMIT, MatchCandidate, MatchSuggestion, find_matches};
use crate::units::Unit;

/// A parsed ingredient with its unit normalized and catalog suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewedIngredient {
    /// Name as extracted.
    pub name: String,
    /// Amount, if stated.
    pub quantity: Option<Decimal>,
    /// Unit as extracted.
    pub unit_text: Option<String>,
    /// Recognized unit, if the text names one.
    pub unit: Option<Unit>,
    /// Preparation notes.
    pub notes: Option<String>,
    /// Best catalog matches, best first.
    pub suggestions: Vec<MatchSuggestion>,
}

/// A recipe draft ready for the user to confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDraft {
    /// Recipe name.
    pub name: String,
    /// Batch yield.
    pub yield_quantity: Option<Decimal>,
    /// Recognized yield unit.
    pub yield_unit: Option<Unit>,
    /// Portions per batch.
    pub portions: Option<u32>,
    /// Ingredients in document order.
    pub ingredients: Vec<ReviewedIngredient>,
    /// Method steps.
    pub instructions: Vec<String>,
}

/// Normalizes units and attaches catalog suggestions to a parsed recipe.
#[must_use]
pub fn review(parsed: ParsedRecipe, catalog: &[MatchCandidate]) -> RecipeDraft {
    let parse_unit = |text: &Option<String>| text.as_deref().and_then(|u| Unit::parse(u).ok());

    RecipeDraft {
        yield_unit: parse_unit(&parsed.yield_unit),
        name: parsed.name,
        yield_quantity: parsed.yield_quantity,
        portions: parsed.portions,
        instructions: parsed.instructions,
        ingredients: parsed
            .ingredients
            .into_iter()
            .map(|ingredient| ReviewedIngredient {
                unit: parse_unit(&ingredient.unit),
                suggestions: find_matches(&ingredient.name, catalog, DEFAULT_LIMIT),
                name: ingredient.name,
                quantity: ingredient.quantity,
                unit_text: ingredient.unit,
                notes: ingredient.notes,
            })
            .collect(),
    }
}

/// Validates a document, extracts a recipe from it and reviews the result.
pub async fn parse_recipe_document(
    extractor: &dyn RecipeExtractor,
    document: &str,
    catalog: &[MatchCandidate],
) -> Result<RecipeDraft, ParserError> {
    let document = validate_document(document)?;
    let parsed = extractor.extract(document).await?;
    Ok(review(parsed, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchConfidence;
    use crate::parser::client::MockRecipeExtractor;
    use crate::parser::response::ParsedIngredient;
    use restaurantek_shared::types::CommonProductId;
    use rust_decimal_macros::dec;

    fn catalog() -> Vec<MatchCandidate> {
        ["Yellow Onion", "Garlic", "Olive Oil", "Kosher Salt"]
            .into_iter()
            .map(|name| MatchCandidate {
                id: CommonProductId::new(),
                name: name.to_string(),
            })
            .collect()
    }

    fn parsed_soup() -> ParsedRecipe {
        ParsedRecipe {
            name: "Onion Soup".to_string(),
            yield_quantity: Some(dec!(4)),
            yield_unit: Some("Quarts".to_string()),
            portions: Some(12),
            ingredients: vec![
                ParsedIngredient {
                    name: "yellow onions".to_string(),
                    quantity: Some(dec!(5)),
                    unit: Some("lbs".to_string()),
                    notes: Some("sliced".to_string()),
                },
                ParsedIngredient {
                    name: "garlic".to_string(),
                    quantity: Some(dec!(6)),
                    unit: Some("cloves".to_string()),
                    notes: None,
                },
            ],
            instructions: vec!["Caramelize onions.".to_string()],
        }
    }

    #[test]
    fn test_review_normalizes_units_and_suggests() {
        let draft = review(parsed_soup(), &catalog());

        assert_eq!(draft.yield_unit, Some(Unit::Quart));
        let onions = &draft.ingredients[0];
        assert_eq!(onions.unit, Some(Unit::Pound));
        assert_eq!(onions.suggestions[0].name, "Yellow Onion");

        let garlic = &draft.ingredients[1];
        assert_eq!(garlic.unit, None);
        assert_eq!(garlic.unit_text.as_deref(), Some("cloves"));
        assert_eq!(garlic.suggestions[0].confidence, MatchConfidence::High);
        assert!(garlic.suggestions.len() <= DEFAULT_LIMIT);
    }

    #[tokio::test]
    async fn test_parse_document_calls_extractor_with_trimmed_text() {
        let mut extractor = MockRecipeExtractor::new();
        extractor
            .expect_extract()
            .withf(|doc: &str| doc == "Onion Soup\n5 lb onions")
            .times(1)
            .returning(|_| Ok(parsed_soup()));

        let draft = parse_recipe_document(&extractor, "\n Onion Soup\n5 lb onions \n", &catalog())
            .await
            .unwrap();
        assert_eq!(draft.name, "Onion Soup");
        assert_eq!(draft.ingredients.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_document_never_reaches_extractor() {
        let mut extractor = MockRecipeExtractor::new();
        extractor.expect_extract().times(0);

        let err = parse_recipe_document(&extractor, "   ", &catalog())
            .await
            .unwrap_err();
        assert_eq!(err, ParserError::EmptyDocument);
    }

    #[tokio::test]
    async fn test_extractor_errors_propagate() {
        let mut extractor = MockRecipeExtractor::new();
        extractor
            .expect_extract()
            .returning(|_| Err(ParserError::RateLimited));

        let err = parse_recipe_document(&extractor, "Soup", &catalog())
            .await
            .unwrap_err();
        assert_eq!(err, ParserError::RateLimited);
    }
}
