//! Distributor product repository: what an outlet buys, from whom, in
//! which pack.

use std::collections::HashMap;

use chrono::NaiveDate;
use restaurantek_core::pricing::{PackSize, PackSizeError};
use restaurantek_shared::types::PageRequest;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, Func},
};
use serde::Serialize;
use uuid::Uuid;

use super::price::{LatestPrice, latest_prices};
use super::{is_unique_violation, like_pattern};
use crate::entities::{common_products, distributor_products, distributors};

/// Error types for distributor product operations.
#[derive(Debug, thiserror::Error)]
pub enum DistributorProductError {
    /// Product not found in the outlet.
    #[error("Distributor product not found: {0}")]
    NotFound(Uuid),

    /// Distributor not found in the organization.
    #[error("Distributor not found: {0}")]
    DistributorNotFound(Uuid),

    /// Common product not found in the organization.
    #[error("Common product not found: {0}")]
    CommonProductNotFound(Uuid),

    /// The outlet already has this SKU from this distributor.
    #[error("SKU '{0}' already exists for this distributor")]
    DuplicateSku(String),

    /// Pack description could not be read.
    #[error("Invalid pack size: {0}")]
    InvalidPack(#[from] PackSizeError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Filter for listing distributor products.
#[derive(Debug, Clone, Default)]
pub struct DistributorProductFilter {
    /// Only products of this distributor.
    pub distributor_id: Option<Uuid>,
    /// `Some(true)` for mapped products, `Some(false)` for unmapped ones.
    pub mapped: Option<bool>,
    /// Case-insensitive substring of the name or SKU.
    pub search: Option<String>,
    /// Active flag; `None` lists both.
    pub active: Option<bool>,
}

/// Input for creating a distributor product.
#[derive(Debug, Clone)]
pub struct CreateDistributorProductInput {
    /// Owning organization.
    pub organization_id: Uuid,
    /// Outlet that buys the product.
    pub outlet_id: Uuid,
    /// Distributor selling it.
    pub distributor_id: Uuid,
    /// Distributor SKU.
    pub sku: String,
    /// Name on the invoice.
    pub name: String,
    /// Brand.
    pub brand: Option<String>,
    /// Pack text such as `6/5 LB`.
    pub pack_description: Option<String>,
    /// Common product to map to.
    pub common_product_id: Option<Uuid>,
}

/// Input for updating a distributor product. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateDistributorProductInput {
    /// New SKU.
    pub sku: Option<String>,
    /// New name.
    pub name: Option<String>,
    /// New brand; `Some(None)` clears it.
    pub brand: Option<Option<String>>,
    /// New pack text; `Some(None)` clears the pack.
    pub pack_description: Option<Option<String>>,
    /// Activate or deactivate.
    pub is_active: Option<bool>,
}

/// A distributor product with its current price.
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithPrice {
    /// The product.
    #[serde(flatten)]
    pub product: distributor_products::Model,
    /// Current price, if any was recorded.
    pub latest_price: Option<LatestPrice>,
}

/// Row written by [`insert_product`].
#[derive(Debug, Clone)]
pub(crate) struct NewDistributorProduct {
    pub organization_id: Uuid,
    pub outlet_id: Uuid,
    pub distributor_id: Uuid,
    pub sku: String,
    pub name: String,
    pub brand: Option<String>,
    pub pack_description: Option<String>,
    pub pack: Option<PackSize>,
    pub common_product_id: Option<Uuid>,
}

/// Distributor product repository.
#[derive(Debug, Clone)]
pub struct DistributorProductRepository {
    db: DatabaseConnection,
}

impl DistributorProductRepository {
    /// Creates a new distributor product repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists an outlet's products with their price as of `as_of`, ordered by name.
    ///
    /// Returns the page and the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        outlet_id: Uuid,
        filter: &DistributorProductFilter,
        as_of: NaiveDate,
        page: &PageRequest,
    ) -> Result<(Vec<ProductWithPrice>, u64), DbErr> {
        let mut query = distributor_products::Entity::find()
            .filter(distributor_products::Column::OutletId.eq(outlet_id));

        if let Some(distributor_id) = filter.distributor_id {
            query = query.filter(distributor_products::Column::DistributorId.eq(distributor_id));
        }
        match filter.mapped {
            Some(true) => {
                query = query.filter(distributor_products::Column::CommonProductId.is_not_null());
            }
            Some(false) => {
                query = query.filter(distributor_products::Column::CommonProductId.is_null());
            }
            None => {}
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(distributor_products::Column::Name)))
                            .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(distributor_products::Column::Sku)))
                            .like(pattern),
                    ),
            );
        }
        if let Some(active) = filter.active {
            query = query.filter(distributor_products::Column::IsActive.eq(active));
        }

        let total = query.clone().count(&self.db).await?;
        let products = query
            .order_by_asc(distributor_products::Column::Name)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let mut prices: HashMap<Uuid, LatestPrice> =
            latest_prices(&self.db, outlet_id, as_of, Some(&ids))
                .await?
                .into_iter()
                .map(|p| (p.distributor_product_id, p))
                .collect();

        let items = products
            .into_iter()
            .map(|product| ProductWithPrice {
                latest_price: prices.remove(&product.id),
                product,
            })
            .collect();

        Ok((items, total))
    }

    /// Finds a product in an outlet.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_in_outlet(
        &self,
        outlet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<distributor_products::Model>, DbErr> {
        distributor_products::Entity::find_by_id(id)
            .filter(distributor_products::Column::OutletId.eq(outlet_id))
            .one(&self.db)
            .await
    }

    /// Finds a product by distributor SKU in an outlet.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_sku(
        &self,
        outlet_id: Uuid,
        distributor_id: Uuid,
        sku: &str,
    ) -> Result<Option<distributor_products::Model>, DbErr> {
        distributor_products::Entity::find()
            .filter(distributor_products::Column::OutletId.eq(outlet_id))
            .filter(distributor_products::Column::DistributorId.eq(distributor_id))
            .filter(distributor_products::Column::Sku.eq(sku.trim()))
            .one(&self.db)
            .await
    }

    /// Creates a product, parsing its pack description.
    ///
    /// # Errors
    ///
    /// Returns `DistributorNotFound`, `CommonProductNotFound`, `InvalidPack`,
    /// `DuplicateSku`, or a database error.
    pub async fn create(
        &self,
        input: CreateDistributorProductInput,
    ) -> Result<distributor_products::Model, DistributorProductError> {
        let distributor = distributors::Entity::find_by_id(input.distributor_id)
            .filter(distributors::Column::OrganizationId.eq(input.organization_id))
            .one(&self.db)
            .await?;
        if distributor.is_none() {
            return Err(DistributorProductError::DistributorNotFound(
                input.distributor_id,
            ));
        }
        if let Some(common_id) = input.common_product_id {
            self.ensure_common_product(input.organization_id, common_id)
                .await?;
        }

        let pack = input
            .pack_description
            .as_deref()
            .map(PackSize::parse)
            .transpose()?;
        let sku = input.sku.trim().to_string();

        let result = insert_product(
            &self.db,
            NewDistributorProduct {
                organization_id: input.organization_id,
                outlet_id: input.outlet_id,
                distributor_id: input.distributor_id,
                sku: sku.clone(),
                name: input.name,
                brand: input.brand,
                pack_description: input.pack_description,
                pack,
                common_product_id: input.common_product_id,
            },
        )
        .await;

        match result {
            Ok(product) => Ok(product),
            Err(e) if is_unique_violation(&e) => Err(DistributorProductError::DuplicateSku(sku)),
            Err(e) => Err(e.into()),
        }
    }

    /// Updates a product. A new pack description replaces the parsed pack.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InvalidPack`, `DuplicateSku`, or a database error.
    pub async fn update(
        &self,
        outlet_id: Uuid,
        id: Uuid,
        input: UpdateDistributorProductInput,
    ) -> Result<distributor_products::Model, DistributorProductError> {
        let product = self
            .find_in_outlet(outlet_id, id)
            .await?
            .ok_or(DistributorProductError::NotFound(id))?;

        let mut active: distributor_products::ActiveModel = product.into();
        let new_sku = input.sku.map(|s| s.trim().to_string());
        if let Some(sku) = &new_sku {
            active.sku = Set(sku.clone());
        }
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(brand) = input.brand {
            active.brand = Set(brand);
        }
        if let Some(description) = input.pack_description {
            let pack = description.as_deref().map(PackSize::parse).transpose()?;
            let (count, quantity, unit) = pack_columns(pack.as_ref());
            active.pack_description = Set(description);
            active.pack_count = Set(count);
            active.unit_quantity = Set(quantity);
            active.unit = Set(unit);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        match active.update(&self.db).await {
            Ok(product) => Ok(product),
            Err(e) if is_unique_violation(&e) => Err(DistributorProductError::DuplicateSku(
                new_sku.unwrap_or_default(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Maps a product to a common product, or clears the mapping with `None`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `CommonProductNotFound`, or a database error.
    pub async fn set_mapping(
        &self,
        org_id: Uuid,
        outlet_id: Uuid,
        id: Uuid,
        common_product_id: Option<Uuid>,
    ) -> Result<distributor_products::Model, DistributorProductError> {
        let product = self
            .find_in_outlet(outlet_id, id)
            .await?
            .ok_or(DistributorProductError::NotFound(id))?;
        if let Some(common_id) = common_product_id {
            self.ensure_common_product(org_id, common_id).await?;
        }

        let mut active: distributor_products::ActiveModel = product.into();
        active.common_product_id = Set(common_product_id);
        active.updated_at = Set(chrono::Utc::now().into());
        Ok(active.update(&self.db).await?)
    }

    /// Deletes a product and its price history.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or a database error.
    pub async fn delete(&self, outlet_id: Uuid, id: Uuid) -> Result<(), DistributorProductError> {
        let result = distributor_products::Entity::delete_many()
            .filter(distributor_products::Column::Id.eq(id))
            .filter(distributor_products::Column::OutletId.eq(outlet_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(DistributorProductError::NotFound(id));
        }
        Ok(())
    }

    async fn ensure_common_product(
        &self,
        org_id: Uuid,
        common_id: Uuid,
    ) -> Result<(), DistributorProductError> {
        let exists = common_products::Entity::find_by_id(common_id)
            .filter(common_products::Column::OrganizationId.eq(org_id))
            .one(&self.db)
            .await?
            .is_some();
        if exists {
            Ok(())
        } else {
            Err(DistributorProductError::CommonProductNotFound(common_id))
        }
    }
}

/// Column values for a parsed pack.
fn pack_columns(pack: Option<&PackSize>) -> (Option<i32>, Option<Decimal>, Option<String>) {
    pack.map_or((None, None, None), |pack| {
        (
            i32::try_from(pack.pack_count).ok(),
            Some(pack.unit_quantity),
            Some(pack.unit.canonical().to_string()),
        )
    })
}

/// Reads the pack stored on a product row.
#[must_use]
pub fn stored_pack(product: &distributor_products::Model) -> Option<PackSize> {
    let count = u32::try_from(product.pack_count?).ok()?;
    let unit = product.unit.as_deref()?.parse().ok()?;
    PackSize::new(count, product.unit_quantity?, unit).ok()
}

pub(crate) async fn insert_product<C: ConnectionTrait>(
    conn: &C,
    new: NewDistributorProduct,
) -> Result<distributor_products::Model, DbErr> {
    let now = chrono::Utc::now().into();
    let (pack_count, unit_quantity, unit) = pack_columns(new.pack.as_ref());

    distributor_products::ActiveModel {
        id: Set(Uuid::now_v7()),
        organization_id: Set(new.organization_id),
        outlet_id: Set(new.outlet_id),
        distributor_id: Set(new.distributor_id),
        sku: Set(new.sku),
        name: Set(new.name.trim().to_string()),
        brand: Set(new.brand),
        pack_description: Set(new.pack_description),
        pack_count: Set(pack_count),
        unit_quantity: Set(unit_quantity),
        unit: Set(unit),
        common_product_id: Set(new.common_product_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use restaurantek_core::units::Unit;
    use rust_decimal_macros::dec;

    fn product_row(
        count: Option<i32>,
        quantity: Option<Decimal>,
        unit: Option<&str>,
    ) -> distributor_products::Model {
        let now = chrono::Utc::now().into();
        distributor_products::Model {
            id: Uuid::nil(),
            organization_id: Uuid::nil(),
            outlet_id: Uuid::nil(),
            distributor_id: Uuid::nil(),
            sku: "100".to_string(),
            name: "Onions".to_string(),
            brand: None,
            pack_description: None,
            pack_count: count,
            unit_quantity: quantity,
            unit: unit.map(str::to_string),
            common_product_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_pack_columns_round_trip_through_row() {
        let pack = PackSize::parse("6/5 LB").unwrap();
        let (count, quantity, unit) = pack_columns(Some(&pack));
        assert_eq!(count, Some(6));
        assert_eq!(quantity, Some(dec!(5)));
        assert_eq!(unit.as_deref(), Some("lb"));

        let row = product_row(count, quantity, unit.as_deref());
        assert_eq!(stored_pack(&row), Some(pack));
    }

    #[test]
    fn test_stored_pack_requires_all_columns() {
        assert_eq!(stored_pack(&product_row(Some(1), None, Some("kg"))), None);
        assert_eq!(stored_pack(&product_row(None, Some(dec!(1)), Some("kg"))), None);
        assert_eq!(stored_pack(&product_row(Some(1), Some(dec!(1)), Some("bushel"))), None);
        assert_eq!(
            stored_pack(&product_row(Some(1), Some(dec!(10)), Some("kg"))).map(|p| p.unit),
            Some(Unit::Kilogram)
        );
    }
}
