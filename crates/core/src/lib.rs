//! Core business logic for RestauranTek.
//!
//! This crate contains pure business logic with no web or database dependencies.
//! The only I/O is the HTTP client behind the recipe parser.
//!
//! # Modules
//!
//! - `auth` - Password hashing and organization roles
//! - `units` - Unit parsing and exact conversion to base units
//! - `pricing` - Pack sizes, per-unit costs and price movements
//! - `costing` - Recipe and sub-recipe costing
//! - `matching` - Fuzzy matching of product names
//! - `parser` - Recipe extraction from documents

pub mod auth;
pub mod costing;
pub mod matching;
pub mod parser;
pub mod pricing;
pub mod units;
