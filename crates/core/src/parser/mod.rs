//! Recipe document parsing with a language model.
//!
//! Text goes through [`validate_document`], is wrapped in a fixed prompt and
//! sent to a [`RecipeExtractor`]. The model's JSON reply is read leniently
//! ([`parse_response`]) and [`review`] then normalizes units and suggests
//! catalog products for each ingredient.

pub mod client;
pub mod error;
pub mod prompt;
pub mod quantity;
pub mod response;
pub mod service;

pub use client::{LlmRecipeExtractor, RecipeExtractor};
pub use error::ParserError;
pub use prompt::{MAX_DOCUMENT_CHARS, build_prompt, validate_document};
pub use quantity::parse_quantity;
pub use response::{ParsedIngredient, ParsedRecipe, parse_response};
pub use service::{RecipeDraft, ReviewedIngredient, parse_recipe_document, review};
