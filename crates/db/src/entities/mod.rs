//! `SeaORM` entity definitions.
//!
//! One module per table. Postgres enum types live in [`sea_orm_active_enums`].

pub mod common_products;
pub mod distributor_products;
pub mod distributors;
pub mod organization_usage;
pub mod organization_users;
pub mod organizations;
pub mod outlets;
pub mod price_history;
pub mod recipe_ingredients;
pub mod recipes;
pub mod sea_orm_active_enums;
pub mod tier_limits;
pub mod user_outlets;
pub mod users;
