//! `SeaORM` Entity for recipe_ingredients table.
//!
//! Exactly one of `common_product_id`, `sub_recipe_id` and `free_text` is set;
//! a check constraint enforces it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe_ingredients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub common_product_id: Option<Uuid>,
    pub sub_recipe_id: Option<Uuid>,
    pub free_text: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))", nullable)]
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::recipes::Entity",
        from = "Column::RecipeId",
        to = "super::recipes::Column::Id",
        on_delete = "Cascade"
    )]
    Recipes,
    #[sea_orm(
        belongs_to = "super::recipes::Entity",
        from = "Column::SubRecipeId",
        to = "super::recipes::Column::Id",
        on_delete = "NoAction"
    )]
    SubRecipes,
    #[sea_orm(
        belongs_to = "super::common_products::Entity",
        from = "Column::CommonProductId",
        to = "super::common_products::Column::Id",
        on_delete = "NoAction"
    )]
    CommonProducts,
}

impl Related<super::recipes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipes.def()
    }
}

impl Related<super::common_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CommonProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
