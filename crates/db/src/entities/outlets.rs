//! `SeaORM` Entity for outlets table.
//!
//! An outlet is one physical location of an organization. Distributor
//! products, prices and recipes are scoped to an outlet.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "outlets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id",
        on_delete = "Cascade"
    )]
    Organizations,
    #[sea_orm(has_many = "super::user_outlets::Entity")]
    UserOutlets,
    #[sea_orm(has_many = "super::distributor_products::Entity")]
    DistributorProducts,
    #[sea_orm(has_many = "super::recipes::Entity")]
    Recipes,
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizations.def()
    }
}

impl Related<super::user_outlets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserOutlets.def()
    }
}

impl Related<super::distributor_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DistributorProducts.def()
    }
}

impl Related<super::recipes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
