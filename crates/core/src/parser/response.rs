//! Reading the model's JSON answer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ParserError;
use super::quantity::{deserialize_quantity, quantity_from_json};

/// A recipe as extracted from a document, before any catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRecipe {
    /// Recipe name.
    pub name: String,
    /// Batch yield.
    pub yield_quantity: Option<Decimal>,
    /// Unit of the yield, as written.
    pub yield_unit: Option<String>,
    /// Portions per batch.
    pub portions: Option<u32>,
    /// Ingredients in document order.
    pub ingredients: Vec<ParsedIngredient>,
    /// Method steps.
    pub instructions: Vec<String>,
}

/// One extracted ingredient line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedIngredient {
    /// Ingredient name.
    pub name: String,
    /// Amount, if stated.
    pub quantity: Option<Decimal>,
    /// Unit as written.
    pub unit: Option<String>,
    /// Preparation notes.
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRecipe {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_quantity")]
    yield_quantity: Option<Decimal>,
    #[serde(default)]
    yield_unit: Option<String>,
    #[serde(default)]
    portions: Value,
    #[serde(default)]
    ingredients: Vec<RawIngredient>,
    #[serde(default)]
    instructions: RawInstructions,
}

#[derive(Debug, Deserialize)]
struct RawIngredient {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_quantity")]
    quantity: Option<Decimal>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum RawInstructions {
    Steps(Vec<String>),
    Text(String),
    #[default]
    Missing,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Returns the JSON object inside a reply that may be wrapped in prose or
/// markdown code fences.
fn extract_json(text: &str) -> Option<&str> {
    let text = text.trim();
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Parses the model's reply into a recipe.
///
/// Ingredients without a name are dropped. A reply without a recipe name or
/// without any ingredients is rejected.
pub fn parse_response(raw: &str) -> Result<ParsedRecipe, ParserError> {
    let json = extract_json(raw)
        .ok_or_else(|| ParserError::InvalidResponse("no JSON object in response".to_string()))?;
    let recipe: RawRecipe =
        serde_json::from_str(json).map_err(|e| ParserError::InvalidResponse(e.to_string()))?;

    let name = non_blank(recipe.name)
        .ok_or_else(|| ParserError::InvalidResponse("recipe has no name".to_string()))?;

    let ingredients: Vec<ParsedIngredient> = recipe
        .ingredients
        .into_iter()
        .filter_map(|raw| {
            Some(ParsedIngredient {
                name: non_blank(raw.name)?,
                quantity: raw.quantity,
                unit: non_blank(raw.unit),
                notes: non_blank(raw.notes),
            })
        })
        .collect();
    if ingredients.is_empty() {
        return Err(ParserError::InvalidResponse(
            "recipe has no ingredients".to_string(),
        ));
    }

    let portions = quantity_from_json(&recipe.portions)
        .map(|p| p.round())
        .and_then(|p| u32::try_from(p).ok())
        .filter(|p| *p > 0);

    let instructions = match recipe.instructions {
        RawInstructions::Steps(steps) => steps
            .into_iter()
            .filter_map(|s| non_blank(Some(s)))
            .collect(),
        RawInstructions::Text(text) => text
            .lines()
            .filter_map(|s| non_blank(Some(s.to_string())))
            .collect(),
        RawInstructions::Missing => Vec::new(),
    };

    Ok(ParsedRecipe {
        name,
        yield_quantity: recipe.yield_quantity.filter(|q| *q > Decimal::ZERO),
        yield_unit: non_blank(recipe.yield_unit),
        portions,
        ingredients,
        instructions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const FENCED: &str = r#"Here is the recipe:
```json
{
  "name": "  Marinara ",
  "yield_quantity": "1 1/2",
  "yield_unit": "qt",
  "portions": 6,
  "ingredients": [
    {"name": "San Marzano tomatoes", "quantity": 28, "unit": "oz", "notes": "crushed"},
    {"name": "garlic", "quantity": "3", "unit": "each", "notes": null},
    {"name": "  ", "quantity": 1, "unit": "tsp"},
    {"name": "salt", "quantity": null, "unit": null, "notes": "to taste"}
  ],
  "instructions": ["Sweat garlic.", "", "Add tomatoes and simmer."]
}
```"#;

    #[test]
    fn test_parse_fenced_response() {
        let recipe = parse_response(FENCED).unwrap();

        assert_eq!(recipe.name, "Marinara");
        assert_eq!(recipe.yield_quantity, Some(dec!(1.5)));
        assert_eq!(recipe.yield_unit.as_deref(), Some("qt"));
        assert_eq!(recipe.portions, Some(6));
        assert_eq!(recipe.ingredients.len(), 3);
        assert_eq!(recipe.ingredients[0].quantity, Some(dec!(28)));
        assert_eq!(recipe.ingredients[1].quantity, Some(dec!(3)));
        assert_eq!(recipe.ingredients[2].quantity, None);
        assert_eq!(recipe.ingredients[2].notes.as_deref(), Some("to taste"));
        assert_eq!(
            recipe.instructions,
            vec!["Sweat garlic.", "Add tomatoes and simmer."]
        );
    }

    #[test]
    fn test_instructions_as_text() {
        let raw = r#"{"name": "Toast", "ingredients": [{"name": "bread"}],
            "instructions": "Slice.\n\nToast."}"#;
        let recipe = parse_response(raw).unwrap();
        assert_eq!(recipe.instructions, vec!["Slice.", "Toast."]);
        assert_eq!(recipe.portions, None);
    }

    #[test]
    fn test_portions_read_leniently() {
        let raw = r#"{"name": "Rolls", "portions": "12", "ingredients": [{"name": "flour"}]}"#;
        assert_eq!(parse_response(raw).unwrap().portions, Some(12));

        let raw = r#"{"name": "Rolls", "portions": 0, "ingredients": [{"name": "flour"}]}"#;
        assert_eq!(parse_response(raw).unwrap().portions, None);
    }

    #[test]
    fn test_rejects_unusable_responses() {
        assert!(matches!(
            parse_response("I could not find a recipe."),
            Err(ParserError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_response(r#"{"name": "", "ingredients": [{"name": "x"}]}"#),
            Err(ParserError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_response(r#"{"name": "Water", "ingredients": [{"name": " "}]}"#),
            Err(ParserError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_response(r#"{"name": "Broken", "ingredients": 5}"#),
            Err(ParserError::InvalidResponse(_))
        ));
    }
}
