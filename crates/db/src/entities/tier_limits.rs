//! `SeaORM` Entity for tier_limits table.
//!
//! `None` in a `max_*` column means unlimited.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::SubscriptionTier;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tier_limits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tier: SubscriptionTier,
    pub display_name: String,
    pub max_outlets: Option<i32>,
    pub max_users: Option<i32>,
    pub max_recipes: Option<i32>,
    pub max_ai_parses_per_month: Option<i32>,
    pub has_ai_parser: bool,
    pub has_price_import: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
