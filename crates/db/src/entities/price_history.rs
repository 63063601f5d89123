//! `SeaORM` Entity for price_history table.
//!
//! One row per (distributor product, outlet, effective date).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::PriceSource;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "price_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub outlet_id: Uuid,
    pub distributor_product_id: Uuid,
    /// Case price.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    pub effective_date: Date,
    pub source: PriceSource,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::distributor_products::Entity",
        from = "Column::DistributorProductId",
        to = "super::distributor_products::Column::Id",
        on_delete = "Cascade"
    )]
    DistributorProducts,
    #[sea_orm(
        belongs_to = "super::outlets::Entity",
        from = "Column::OutletId",
        to = "super::outlets::Column::Id",
        on_delete = "Cascade"
    )]
    Outlets,
}

impl Related<super::distributor_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DistributorProducts.def()
    }
}

impl Related<super::outlets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Outlets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
