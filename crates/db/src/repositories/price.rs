//! Price history repository.
//!
//! Prices are case prices per distributor product and outlet, one per
//! effective date. The "current" price of a product is the row with the
//! latest effective date on or before the day asked about.

use chrono::NaiveDate;
use restaurantek_core::pricing::{self, PackSize, PriceChange};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, Set, Statement, TransactionTrait, Value,
    sea_query::OnConflict,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::distributor_product::{NewDistributorProduct, insert_product};
use crate::entities::{
    distributor_products, distributors, price_history, sea_orm_active_enums::PriceSource,
};

/// Error types for price operations.
#[derive(Debug, thiserror::Error)]
pub enum PriceError {
    /// Distributor product not found in the outlet.
    #[error("Distributor product not found: {0}")]
    ProductNotFound(Uuid),

    /// Distributor not found in the organization.
    #[error("Distributor not found: {0}")]
    DistributorNotFound(Uuid),

    /// Price is not recordable.
    #[error(transparent)]
    InvalidPrice(#[from] pricing::PriceError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// A price to record.
#[derive(Debug, Clone)]
pub struct RecordPriceInput {
    /// Owning organization.
    pub organization_id: Uuid,
    /// Outlet the price applies to.
    pub outlet_id: Uuid,
    /// Product being priced.
    pub distributor_product_id: Uuid,
    /// Case price.
    pub price: Decimal,
    /// Day the price takes effect.
    pub effective_date: NaiveDate,
    /// Manual entry or import.
    pub source: PriceSource,
    /// Recording user.
    pub created_by: Option<Uuid>,
}

/// The current price of one distributor product.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct LatestPrice {
    /// Product.
    pub distributor_product_id: Uuid,
    /// Case price.
    pub price: Decimal,
    /// Day the price took effect.
    pub effective_date: NaiveDate,
}

#[derive(Debug, FromQueryResult)]
struct PriceChangeRow {
    distributor_product_id: Uuid,
    sku: String,
    name: String,
    current_price: Decimal,
    current_effective_date: NaiveDate,
    previous_price: Decimal,
    previous_effective_date: NaiveDate,
}

/// A product whose two most recent prices differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductPriceChange {
    /// Product.
    pub distributor_product_id: Uuid,
    /// Distributor SKU.
    pub sku: String,
    /// Product name.
    pub name: String,
    /// Date of the latest price.
    pub current_date: NaiveDate,
    /// Date of the price before it.
    pub previous_date: NaiveDate,
    /// Movement between the two.
    #[serde(flatten)]
    pub change: PriceChange,
}

/// One line of a price import.
#[derive(Debug, Clone)]
pub struct ImportPriceRow {
    /// Distributor SKU.
    pub sku: String,
    /// Product name, required when the SKU is new to the outlet.
    pub name: Option<String>,
    /// Pack text for new products, e.g. `6/5 LB`.
    pub pack_description: Option<String>,
    /// Case price.
    pub price: Decimal,
    /// Overrides the import's effective date.
    pub effective_date: Option<NaiveDate>,
}

/// A price import for one distributor and outlet.
#[derive(Debug, Clone)]
pub struct ImportPricesInput {
    /// Owning organization.
    pub organization_id: Uuid,
    /// Outlet the prices apply to.
    pub outlet_id: Uuid,
    /// Distributor the price list comes from.
    pub distributor_id: Uuid,
    /// Default effective date of the rows.
    pub effective_date: NaiveDate,
    /// Importing user.
    pub created_by: Option<Uuid>,
    /// Rows in file order.
    pub rows: Vec<ImportPriceRow>,
}

/// Outcome of one import row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportRowOutcome {
    /// Price recorded.
    Recorded {
        /// Product the price was recorded for.
        distributor_product_id: Uuid,
        /// Whether the product was created by this row.
        created_product: bool,
    },
    /// Row skipped.
    Rejected {
        /// Why.
        reason: String,
    },
}

/// Per-row result of an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRowResult {
    /// 1-based row number.
    pub row: usize,
    /// SKU as given.
    pub sku: String,
    /// What happened.
    #[serde(flatten)]
    pub outcome: ImportRowOutcome,
}

/// Summary of an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Rows that recorded a price.
    pub recorded: usize,
    /// Products created along the way.
    pub created_products: usize,
    /// Rows skipped.
    pub rejected: usize,
    /// Per-row detail.
    pub rows: Vec<ImportRowResult>,
}

/// Price repository.
#[derive(Debug, Clone)]
pub struct PriceRepository {
    db: DatabaseConnection,
}

impl PriceRepository {
    /// Creates a new price repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a price, replacing any price of the same product, outlet and day.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPrice`, `ProductNotFound`, or a database error.
    pub async fn record_price(
        &self,
        input: RecordPriceInput,
    ) -> Result<price_history::Model, PriceError> {
        pricing::ensure_valid_price(input.price)?;

        let product = distributor_products::Entity::find_by_id(input.distributor_product_id)
            .filter(distributor_products::Column::OutletId.eq(input.outlet_id))
            .one(&self.db)
            .await?;
        if product.is_none() {
            return Err(PriceError::ProductNotFound(input.distributor_product_id));
        }

        Ok(upsert_price(&self.db, &input).await?)
    }

    /// Price history of a product in an outlet, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn history(
        &self,
        outlet_id: Uuid,
        distributor_product_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<price_history::Model>, DbErr> {
        let mut query = price_history::Entity::find()
            .filter(price_history::Column::OutletId.eq(outlet_id))
            .filter(price_history::Column::DistributorProductId.eq(distributor_product_id));
        if let Some(from) = from {
            query = query.filter(price_history::Column::EffectiveDate.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(price_history::Column::EffectiveDate.lte(to));
        }
        query
            .order_by_desc(price_history::Column::EffectiveDate)
            .all(&self.db)
            .await
    }

    /// Current price of every product in an outlet as of a day.
    ///
    /// With `product_ids`, only those products are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn latest_prices(
        &self,
        outlet_id: Uuid,
        as_of: NaiveDate,
        product_ids: Option<&[Uuid]>,
    ) -> Result<Vec<LatestPrice>, DbErr> {
        latest_prices(&self.db, outlet_id, as_of, product_ids).await
    }

    /// Products whose latest price, effective on or after `since`, differs
    /// from the price before it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn price_changes(
        &self,
        outlet_id: Uuid,
        since: NaiveDate,
        as_of: NaiveDate,
    ) -> Result<Vec<ProductPriceChange>, DbErr> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            PRICE_CHANGES_SQL,
            [outlet_id.into(), since.into(), as_of.into()],
        );
        let rows = PriceChangeRow::find_by_statement(stmt).all(&self.db).await?;

        Ok(rows
            .into_iter()
            .map(|row| ProductPriceChange {
                distributor_product_id: row.distributor_product_id,
                sku: row.sku,
                name: row.name,
                current_date: row.current_effective_date,
                previous_date: row.previous_effective_date,
                change: PriceChange::between(row.previous_price, row.current_price),
            })
            .collect())
    }

    /// Imports a distributor price list into an outlet.
    ///
    /// Runs in one transaction. Unknown SKUs create distributor products
    /// when the row carries a name. Rows with an invalid price, pack or
    /// missing name are rejected individually; a database failure rolls
    /// back the whole import.
    ///
    /// # Errors
    ///
    /// Returns `DistributorNotFound`, or a database error.
    pub async fn import_prices(
        &self,
        input: ImportPricesInput,
    ) -> Result<ImportSummary, PriceError> {
        let txn = self.db.begin().await?;

        let distributor = distributors::Entity::find_by_id(input.distributor_id)
            .filter(distributors::Column::OrganizationId.eq(input.organization_id))
            .one(&txn)
            .await?;
        if distributor.is_none() {
            return Err(PriceError::DistributorNotFound(input.distributor_id));
        }

        let mut results = Vec::with_capacity(input.rows.len());
        for (index, row) in input.rows.iter().enumerate() {
            let sku = row.sku.trim().to_string();
            let outcome = import_row(&txn, &input, &sku, row).await?;
            results.push(ImportRowResult {
                row: index + 1,
                sku,
                outcome,
            });
        }

        txn.commit().await?;

        let summary = summarize(results);
        debug!(
            outlet_id = %input.outlet_id,
            recorded = summary.recorded,
            rejected = summary.rejected,
            "price import finished"
        );
        Ok(summary)
    }
}

// Column widths of `distributor_products`.
const MAX_SKU_CHARS: usize = 100;
const MAX_NAME_CHARS: usize = 255;
const MAX_PACK_CHARS: usize = 100;

async fn import_row<C: ConnectionTrait>(
    conn: &C,
    input: &ImportPricesInput,
    sku: &str,
    row: &ImportPriceRow,
) -> Result<ImportRowOutcome, DbErr> {
    let reject = |reason: String| Ok(ImportRowOutcome::Rejected { reason });

    if sku.is_empty() {
        return reject("SKU is empty".to_string());
    }
    if sku.chars().count() > MAX_SKU_CHARS {
        return reject(format!("SKU is longer than {MAX_SKU_CHARS} characters"));
    }
    if let Err(e) = pricing::ensure_valid_price(row.price) {
        return reject(e.to_string());
    }

    let existing = distributor_products::Entity::find()
        .filter(distributor_products::Column::OutletId.eq(input.outlet_id))
        .filter(distributor_products::Column::DistributorId.eq(input.distributor_id))
        .filter(distributor_products::Column::Sku.eq(sku))
        .one(conn)
        .await?;

    let (product_id, created_product) = if let Some(product) = existing {
        (product.id, false)
    } else {
        let Some(name) = row.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
            return reject("unknown SKU and no product name given".to_string());
        };
        if name.chars().count() > MAX_NAME_CHARS {
            return reject(format!("name is longer than {MAX_NAME_CHARS} characters"));
        }
        if row.pack_description.as_deref().is_some_and(|p| p.chars().count() > MAX_PACK_CHARS) {
            return reject(format!("pack description is longer than {MAX_PACK_CHARS} characters"));
        }
        let pack = match row.pack_description.as_deref().map(PackSize::parse).transpose() {
            Ok(pack) => pack,
            Err(e) => return reject(e.to_string()),
        };

        let product = insert_product(
            conn,
            NewDistributorProduct {
                organization_id: input.organization_id,
                outlet_id: input.outlet_id,
                distributor_id: input.distributor_id,
                sku: sku.to_string(),
                name: name.to_string(),
                brand: None,
                pack_description: row.pack_description.clone(),
                pack,
                common_product_id: None,
            },
        )
        .await?;
        (product.id, true)
    };

    upsert_price(
        conn,
        &RecordPriceInput {
            organization_id: input.organization_id,
            outlet_id: input.outlet_id,
            distributor_product_id: product_id,
            price: row.price,
            effective_date: row.effective_date.unwrap_or(input.effective_date),
            source: PriceSource::Import,
            created_by: input.created_by,
        },
    )
    .await?;

    Ok(ImportRowOutcome::Recorded {
        distributor_product_id: product_id,
        created_product,
    })
}

fn summarize(rows: Vec<ImportRowResult>) -> ImportSummary {
    let mut summary = ImportSummary {
        recorded: 0,
        created_products: 0,
        rejected: 0,
        rows: Vec::new(),
    };
    for row in &rows {
        match row.outcome {
            ImportRowOutcome::Recorded {
                created_product, ..
            } => {
                summary.recorded += 1;
                if created_product {
                    summary.created_products += 1;
                }
            }
            ImportRowOutcome::Rejected { .. } => summary.rejected += 1,
        }
    }
    summary.rows = rows;
    summary
}

/// Inserts a price or overwrites the one already recorded for the same
/// product, outlet and effective date.
pub(crate) async fn upsert_price<C: ConnectionTrait>(
    conn: &C,
    input: &RecordPriceInput,
) -> Result<price_history::Model, DbErr> {
    let record = price_history::ActiveModel {
        id: Set(Uuid::now_v7()),
        organization_id: Set(input.organization_id),
        outlet_id: Set(input.outlet_id),
        distributor_product_id: Set(input.distributor_product_id),
        price: Set(input.price),
        effective_date: Set(input.effective_date),
        source: Set(input.source),
        created_by: Set(input.created_by),
        created_at: Set(chrono::Utc::now().into()),
    };

    price_history::Entity::insert(record)
        .on_conflict(
            OnConflict::columns([
                price_history::Column::DistributorProductId,
                price_history::Column::OutletId,
                price_history::Column::EffectiveDate,
            ])
            .update_columns([
                price_history::Column::Price,
                price_history::Column::Source,
                price_history::Column::CreatedBy,
            ])
            .to_owned(),
        )
        .exec_with_returning(conn)
        .await
}

/// Latest price per product in an outlet as of a day.
pub(crate) async fn latest_prices<C: ConnectionTrait>(
    conn: &C,
    outlet_id: Uuid,
    as_of: NaiveDate,
    product_ids: Option<&[Uuid]>,
) -> Result<Vec<LatestPrice>, DbErr> {
    let mut values: Vec<Value> = vec![outlet_id.into(), as_of.into()];
    let product_filter = match product_ids {
        Some([]) => return Ok(Vec::new()),
        Some(ids) => {
            let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("${}", i + 3)).collect();
            values.extend(ids.iter().map(|id| Value::from(*id)));
            format!("AND ph.distributor_product_id IN ({})", placeholders.join(", "))
        }
        None => String::new(),
    };

    let sql = format!(
        r"
SELECT distributor_product_id, price, effective_date
FROM (
    SELECT ph.distributor_product_id, ph.price, ph.effective_date,
           ROW_NUMBER() OVER (
               PARTITION BY ph.distributor_product_id, ph.outlet_id
               ORDER BY ph.effective_date DESC
           ) AS rn
    FROM price_history ph
    WHERE ph.outlet_id = $1 AND ph.effective_date <= $2 {product_filter}
) ranked
WHERE rn = 1
"
    );

    let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);
    LatestPrice::find_by_statement(stmt).all(conn).await
}

const PRICE_CHANGES_SQL: &str = r"
WITH ranked AS (
    SELECT ph.distributor_product_id, ph.price, ph.effective_date,
           ROW_NUMBER() OVER (
               PARTITION BY ph.distributor_product_id, ph.outlet_id
               ORDER BY ph.effective_date DESC
           ) AS rn
    FROM price_history ph
    WHERE ph.outlet_id = $1 AND ph.effective_date <= $3
)
SELECT cur.distributor_product_id,
       dp.sku,
       dp.name,
       cur.price AS current_price,
       cur.effective_date AS current_effective_date,
       prev.price AS previous_price,
       prev.effective_date AS previous_effective_date
FROM ranked cur
JOIN ranked prev
  ON prev.distributor_product_id = cur.distributor_product_id AND prev.rn = 2
JOIN distributor_products dp ON dp.id = cur.distributor_product_id
WHERE cur.rn = 1
  AND cur.effective_date >= $2
  AND cur.price <> prev.price
ORDER BY dp.name
";
