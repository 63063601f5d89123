//! Database seeder for RestauranTek development.
//!
//! Creates a demo bistro: an owner account, two outlets, two distributors,
//! a small catalog, priced distributor products, and a soup built on a
//! stock sub-recipe. Running it again leaves an existing demo untouched.
//!
//! Usage: cargo run --bin seeder

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use restaurantek_core::auth::hash_password;
use restaurantek_db::entities::sea_orm_active_enums::PriceSource;
use restaurantek_db::repositories::{
    CreateCommonProductInput, CreateDistributorProductInput, CreateOrganizationInput,
    CreateRecipeInput, DistributorContact, IngredientInput, RecordPriceInput,
};
use restaurantek_db::{
    CommonProductRepository, DistributorProductRepository, DistributorRepository,
    OrganizationRepository, OutletRepository, PriceRepository, RecipeRepository, UserRepository,
};
use sea_orm::DatabaseConnection;

const DEMO_EMAIL: &str = "owner@demo.restaurantek.dev";
const DEMO_PASSWORD: &str = "demo-password";
const DEMO_SLUG: &str = "demo-bistro";

/// (name, category, default unit)
const CATALOG: [(&str, &str, &str); 5] = [
    ("Yellow Onion", "Produce", "lb"),
    ("Unsalted Butter", "Dairy", "lb"),
    ("Chicken Bones", "Protein", "lb"),
    ("Gruyere Cheese", "Dairy", "lb"),
    ("Kosher Salt", "Dry Goods", "lb"),
];

/// (distributor, sku, name, pack, common product, price a month ago, price today)
const PRODUCTS: [(&str, &str, &str, &str, &str, &str, &str); 6] = [
    ("Sysco", "1001", "ONION YELLOW JUMBO", "1/50 LB", "Yellow Onion", "32.50", "35.00"),
    ("Sysco", "2040", "BUTTER SOLID UNSALTED", "36/1 LB", "Unsalted Butter", "98.00", "98.00"),
    ("Sysco", "3310", "CHICKEN BONES FRESH", "1/40 LB", "Chicken Bones", "38.00", "36.40"),
    ("Sysco", "4122", "CHEESE GRUYERE WHEEL", "2/6 LB", "Gruyere Cheese", "118.00", "124.50"),
    ("US Foods", "77-310", "ONION YELLOW MEDIUM", "1/25 LB", "Yellow Onion", "18.75", "18.75"),
    ("US Foods", "88-002", "SALT KOSHER DIAMOND", "12/3 LB", "Kosher Salt", "41.00", "41.00"),
];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("RESTAURANTEK__DATABASE__URL"))
        .context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = restaurantek_db::connect(&database_url, 5, 1)
        .await
        .context("Failed to connect to database")?;

    if OrganizationRepository::new(db.clone())
        .slug_exists(DEMO_SLUG)
        .await?
    {
        println!("Demo organization '{DEMO_SLUG}' already exists, nothing to do.");
        return Ok(());
    }

    println!("Seeding owner account...");
    let owner_id = seed_owner(&db).await?;

    println!("Seeding organization and outlets...");
    let (org_id, outlet_id) = seed_organization(&db, owner_id).await?;

    println!("Seeding catalog...");
    let catalog = seed_catalog(&db, org_id).await?;

    println!("Seeding distributors, products and prices...");
    seed_products(&db, org_id, outlet_id, owner_id, &catalog).await?;

    println!("Seeding recipes...");
    seed_recipes(&db, org_id, outlet_id, owner_id, &catalog).await?;

    println!("Seeding complete! Log in as {DEMO_EMAIL} / {DEMO_PASSWORD}");
    Ok(())
}

async fn seed_owner(db: &DatabaseConnection) -> Result<Uuid> {
    let users = UserRepository::new(db.clone());
    if let Some(user) = users.find_by_email(DEMO_EMAIL).await? {
        println!("  Owner account already exists");
        return Ok(user.id);
    }

    let hash = hash_password(DEMO_PASSWORD)?;
    let user = users.create(DEMO_EMAIL, &hash, "Demo Owner").await?;
    println!("  Created {DEMO_EMAIL}");
    Ok(user.id)
}

/// Returns the organization and its `Main` outlet; also adds a second outlet.
async fn seed_organization(db: &DatabaseConnection, owner_id: Uuid) -> Result<(Uuid, Uuid)> {
    let (org, main) = OrganizationRepository::new(db.clone())
        .create_with_owner(
            CreateOrganizationInput {
                name: "Demo Bistro".to_string(),
                slug: DEMO_SLUG.to_string(),
                currency: "USD".to_string(),
                timezone: "America/Chicago".to_string(),
            },
            owner_id,
        )
        .await?;

    let patio = OutletRepository::new(db.clone())
        .create(org.id, "Riverside Patio", Some("12 River St".to_string()))
        .await?;
    println!("  Created {} with outlets {} and {}", org.name, main.name, patio.name);

    Ok((org.id, main.id))
}

async fn seed_catalog(
    db: &DatabaseConnection,
    org_id: Uuid,
) -> Result<HashMap<&'static str, Uuid>> {
    let repo = CommonProductRepository::new(db.clone());
    let mut ids = HashMap::new();
    for (name, category, unit) in CATALOG {
        let product = repo
            .create(
                org_id,
                CreateCommonProductInput {
                    name: name.to_string(),
                    category: Some(category.to_string()),
                    default_unit: Some(unit.to_string()),
                },
            )
            .await?;
        ids.insert(name, product.id);
    }
    println!("  Created {} common products", ids.len());
    Ok(ids)
}

async fn seed_products(
    db: &DatabaseConnection,
    org_id: Uuid,
    outlet_id: Uuid,
    owner_id: Uuid,
    catalog: &HashMap<&'static str, Uuid>,
) -> Result<()> {
    let distributors = DistributorRepository::new(db.clone());
    let products = DistributorProductRepository::new(db.clone());
    let prices = PriceRepository::new(db.clone());

    let today = Utc::now().date_naive();
    let month_ago = today
        .checked_sub_days(Days::new(30))
        .context("date out of range")?;

    let mut distributor_ids: HashMap<&str, Uuid> = HashMap::new();
    for name in ["Sysco", "US Foods"] {
        let distributor = distributors
            .create(
                org_id,
                name,
                DistributorContact {
                    contact_email: Some(format!(
                        "orders@{}.example",
                        name.to_lowercase().replace(' ', "")
                    )),
                    ..DistributorContact::default()
                },
            )
            .await?;
        distributor_ids.insert(name, distributor.id);
    }

    for (distributor, sku, name, pack, common, old_price, new_price) in PRODUCTS {
        let Some(&distributor_id) = distributor_ids.get(distributor) else {
            bail!("unknown distributor {distributor}");
        };
        let product = products
            .create(CreateDistributorProductInput {
                organization_id: org_id,
                outlet_id,
                distributor_id,
                sku: sku.to_string(),
                name: name.to_string(),
                brand: None,
                pack_description: Some(pack.to_string()),
                common_product_id: catalog.get(common).copied(),
            })
            .await?;

        for (date, price) in [(month_ago, old_price), (today, new_price)] {
            record(&prices, org_id, outlet_id, product.id, date, price, owner_id).await?;
        }
    }
    println!("  Created {} priced products", PRODUCTS.len());
    Ok(())
}

async fn record(
    prices: &PriceRepository,
    org_id: Uuid,
    outlet_id: Uuid,
    product_id: Uuid,
    effective_date: NaiveDate,
    price: &str,
    owner_id: Uuid,
) -> Result<()> {
    prices
        .record_price(RecordPriceInput {
            organization_id: org_id,
            outlet_id,
            distributor_product_id: product_id,
            price: price.parse::<Decimal>()?,
            effective_date,
            source: PriceSource::Manual,
            created_by: Some(owner_id),
        })
        .await?;
    Ok(())
}

fn product_line(
    catalog: &HashMap<&'static str, Uuid>,
    name: &str,
    qty: &str,
    unit: &str,
) -> Result<IngredientInput> {
    Ok(IngredientInput {
        common_product_id: Some(*catalog.get(name).context("missing catalog product")?),
        quantity: Some(qty.parse()?),
        unit: Some(unit.to_string()),
        ..IngredientInput::default()
    })
}

async fn seed_recipes(
    db: &DatabaseConnection,
    org_id: Uuid,
    outlet_id: Uuid,
    owner_id: Uuid,
    catalog: &HashMap<&'static str, Uuid>,
) -> Result<()> {
    let repo = RecipeRepository::new(db.clone());

    let stock = repo
        .create(CreateRecipeInput {
            organization_id: org_id,
            outlet_id,
            name: "Chicken Stock".to_string(),
            category: Some("Stocks".to_string()),
            yield_quantity: Some(Decimal::from(4)),
            yield_unit: Some("qt".to_string()),
            portions: None,
            menu_price: None,
            instructions: Some(
                "Roast bones, cover with cold water, simmer 6 hours, strain.".to_string(),
            ),
            is_sub_recipe: true,
            created_by: Some(owner_id),
            ingredients: vec![
                product_line(catalog, "Chicken Bones", "5", "lb")?,
                product_line(catalog, "Yellow Onion", "1", "lb")?,
                IngredientInput {
                    free_text: Some("Cold water".to_string()),
                    quantity: Some(Decimal::from(6)),
                    unit: Some("qt".to_string()),
                    ..IngredientInput::default()
                },
            ],
        })
        .await?;

    let soup = repo
        .create(CreateRecipeInput {
            organization_id: org_id,
            outlet_id,
            name: "French Onion Soup".to_string(),
            category: Some("Soups".to_string()),
            yield_quantity: Some(Decimal::from(2)),
            yield_unit: Some("qt".to_string()),
            portions: Some(8),
            menu_price: Some("9.50".parse()?),
            instructions: Some(
                "Caramelize onions in butter, add stock, top with cheese and broil.".to_string(),
            ),
            is_sub_recipe: false,
            created_by: Some(owner_id),
            ingredients: vec![
                product_line(catalog, "Yellow Onion", "3", "lb")?,
                product_line(catalog, "Unsalted Butter", "4", "oz")?,
                IngredientInput {
                    sub_recipe_id: Some(stock.id),
                    quantity: Some(Decimal::from(2)),
                    unit: Some("qt".to_string()),
                    ..IngredientInput::default()
                },
                product_line(catalog, "Gruyere Cheese", "8", "oz")?,
                product_line(catalog, "Kosher Salt", "1", "oz")?,
            ],
        })
        .await?;

    println!("  Created {} using {}", soup.name, stock.name);
    Ok(())
}
