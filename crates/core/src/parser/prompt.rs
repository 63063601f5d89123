//! Document validation and the extraction prompt.

use super::error::ParserError;

/// Largest document accepted, in characters.
pub const MAX_DOCUMENT_CHARS: usize = 50_000;

const INSTRUCTIONS: &str = r#"You are a kitchen assistant that converts recipe documents into
structured data.

Read the recipe below and reply with a single JSON object and nothing else,
using exactly this shape:

{
  "name": "Recipe name",
  "yield_quantity": 2,
  "yield_unit": "qt",
  "portions": 8,
  "ingredients": [
    {"name": "yellow onion", "quantity": 1.5, "unit": "lb", "notes": "diced"}
  ],
  "instructions": ["First step", "Second step"]
}

Rules:
- Use null for anything the document does not state.
- Quantities are numbers; write fractions such as 1/2 as 0.5.
- Units are short codes such as g, kg, oz, lb, ml, l, tsp, tbsp, fl oz, cup,
  pint, quart, gallon, each, dozen.
- Put preparation details (diced, melted, to taste) in notes, not in the name.
- Keep ingredients in the order they appear.

Recipe document:
"#;

/// Checks that a document can be sent for parsing and returns it trimmed.
pub fn validate_document(text: &str) -> Result<&str, ParserError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParserError::EmptyDocument);
    }
    let len = trimmed.chars().count();
    if len > MAX_DOCUMENT_CHARS {
        return Err(ParserError::DocumentTooLong {
            len,
            max: MAX_DOCUMENT_CHARS,
        });
    }
    Ok(trimmed)
}

/// Builds the extraction prompt for a validated document.
#[must_use]
pub fn build_prompt(document: &str) -> String {
    let mut prompt = String::with_capacity(INSTRUCTIONS.len() + document.len() + 1);
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str(document);
    prompt.push('\n');
    prompt
}
