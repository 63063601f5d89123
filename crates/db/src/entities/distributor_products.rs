//! `SeaORM` Entity for distributor_products table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "distributor_products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub outlet_id: Uuid,
    pub distributor_id: Uuid,
    pub sku: String,
    pub name: String,
    pub brand: Option<String>,
    /// Pack text as printed on the invoice, e.g. `6/5 LB`.
    pub pack_description: Option<String>,
    pub pack_count: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((19, 6)))", nullable)]
    pub unit_quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub common_product_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::outlets::Entity",
        from = "Column::OutletId",
        to = "super::outlets::Column::Id",
        on_delete = "Cascade"
    )]
    Outlets,
    #[sea_orm(
        belongs_to = "super::distributors::Entity",
        from = "Column::DistributorId",
        to = "super::distributors::Column::Id",
        on_delete = "NoAction"
    )]
    Distributors,
    #[sea_orm(
        belongs_to = "super::common_products::Entity",
        from = "Column::CommonProductId",
        to = "super::common_products::Column::Id",
        on_delete = "SetNull"
    )]
    CommonProducts,
    #[sea_orm(has_many = "super::price_history::Entity")]
    PriceHistory,
}

impl Related<super::outlets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Outlets.def()
    }
}

impl Related<super::distributors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Distributors.def()
    }
}

impl Related<super::common_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CommonProducts.def()
    }
}

impl Related<super::price_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
