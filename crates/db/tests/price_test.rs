//! Integration tests for price history, latest prices and imports.

mod common;

use chrono::NaiveDate;
use restaurantek_db::entities::{distributor_products, sea_orm_active_enums::PriceSource};
use restaurantek_db::repositories::{
    CreateDistributorProductInput, DistributorContact, DistributorProductRepository,
    DistributorRepository, ImportPriceRow, ImportPricesInput, ImportRowOutcome, PriceError,
    PriceRepository, RecordPriceInput,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use common::{Fixture, cleanup, connect, setup};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

async fn create_product(
    db: &DatabaseConnection,
    fixture: &Fixture,
    sku: &str,
) -> (Uuid, distributor_products::Model) {
    let distributor = DistributorRepository::new(db.clone())
        .create(fixture.org.id, &format!("Sysco {sku}"), DistributorContact::default())
        .await
        .unwrap();
    let product = DistributorProductRepository::new(db.clone())
        .create(CreateDistributorProductInput {
            organization_id: fixture.org.id,
            outlet_id: fixture.outlet.id,
            distributor_id: distributor.id,
            sku: sku.to_string(),
            name: "Yellow Onions".to_string(),
            brand: None,
            pack_description: Some("50 LB".to_string()),
            common_product_id: None,
        })
        .await
        .unwrap();
    (distributor.id, product)
}

fn price_input(
    fixture: &Fixture,
    product: Uuid,
    price: Decimal,
    date: NaiveDate,
) -> RecordPriceInput {
    RecordPriceInput {
        organization_id: fixture.org.id,
        outlet_id: fixture.outlet.id,
        distributor_product_id: product,
        price,
        effective_date: date,
        source: PriceSource::Manual,
        created_by: Some(fixture.owner.id),
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_same_day_price_is_replaced() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let (_, product) = create_product(&db, &fixture, "1001").await;
    let prices = PriceRepository::new(db.clone());

    prices.record_price(price_input(&fixture, product.id, dec!(30), day(1))).await.unwrap();
    prices.record_price(price_input(&fixture, product.id, dec!(32.50), day(1))).await.unwrap();

    let history = prices.history(fixture.outlet.id, product.id, None, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].price, dec!(32.50));

    let err = prices
        .record_price(price_input(&fixture, product.id, dec!(0), day(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, PriceError::InvalidPrice(_)));

    cleanup(&db, &fixture).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_latest_price_respects_as_of_date() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let (_, product) = create_product(&db, &fixture, "1002").await;
    let prices = PriceRepository::new(db.clone());

    prices.record_price(price_input(&fixture, product.id, dec!(30), day(1))).await.unwrap();
    prices.record_price(price_input(&fixture, product.id, dec!(34), day(10))).await.unwrap();

    let early = prices.latest_prices(fixture.outlet.id, day(5), None).await.unwrap();
    assert_eq!(early.len(), 1);
    assert_eq!(early[0].price, dec!(30));

    let late = prices
        .latest_prices(fixture.outlet.id, day(20), Some(&[product.id]))
        .await
        .unwrap();
    assert_eq!(late[0].price, dec!(34));
    assert_eq!(late[0].effective_date, day(10));

    let none = prices.latest_prices(fixture.outlet.id, day(20), Some(&[])).await.unwrap();
    assert!(none.is_empty());

    let changes = prices.price_changes(fixture.outlet.id, day(5), day(20)).await.unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].change.previous, dec!(30));
    assert_eq!(changes[0].change.current, dec!(34));

    cleanup(&db, &fixture).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_import_creates_products_and_rejects_bad_rows() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let (distributor_id, existing) = create_product(&db, &fixture, "2001").await;

    let row = |sku: &str, name: Option<&str>, price: Decimal| ImportPriceRow {
        sku: sku.to_string(),
        name: name.map(str::to_string),
        pack_description: Some("6/5 LB".to_string()),
        price,
        effective_date: None,
    };
    let summary = PriceRepository::new(db.clone())
        .import_prices(ImportPricesInput {
            organization_id: fixture.org.id,
            outlet_id: fixture.outlet.id,
            distributor_id,
            effective_date: day(3),
            created_by: Some(fixture.owner.id),
            rows: vec![
                row("2001", None, dec!(31)),
                row("2002", Some("Carrots"), dec!(18.75)),
                row("2003", None, dec!(10)),
                row("2004", Some("Celery"), dec!(-1)),
                row("  ", Some("Leeks"), dec!(12)),
                row(&"9".repeat(101), Some("Shallots"), dec!(14)),
            ],
        })
        .await
        .unwrap();

    assert_eq!(summary.recorded, 2);
    assert_eq!(summary.created_products, 1);
    assert_eq!(summary.rejected, 4);
    assert_eq!(
        summary.rows[4].outcome,
        ImportRowOutcome::Rejected {
            reason: "SKU is empty".to_string(),
        }
    );
    assert!(matches!(summary.rows[5].outcome, ImportRowOutcome::Rejected { .. }));
    assert_eq!(
        summary.rows[0].outcome,
        ImportRowOutcome::Recorded {
            distributor_product_id: existing.id,
            created_product: false,
        }
    );

    let carrots = DistributorProductRepository::new(db.clone())
        .find_by_sku(fixture.outlet.id, distributor_id, "2002")
        .await
        .unwrap()
        .expect("imported product");
    assert_eq!(carrots.pack_count, Some(6));
    assert_eq!(carrots.unit.as_deref(), Some("lb"));

    cleanup(&db, &fixture).await;
}
