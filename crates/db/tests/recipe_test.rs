//! Integration tests for recipes, sub-recipes and costing.

mod common;

use chrono::NaiveDate;
use restaurantek_core::costing::{LineStatus, cost_recipe};
use restaurantek_db::entities::sea_orm_active_enums::PriceSource;
use restaurantek_db::repositories::{
    CommonProductRepository, CreateCommonProductInput, CreateDistributorProductInput,
    CreateRecipeInput, DistributorContact, DistributorProductRepository, DistributorRepository,
    IngredientInput, PriceRepository, RecipeError, RecipeRepository, RecordPriceInput,
};
use restaurantek_shared::types::RecipeId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::{Fixture, cleanup, connect, setup};

fn recipe_input(
    fixture: &Fixture,
    name: &str,
    yield_quantity: Option<Decimal>,
    yield_unit: Option<&str>,
    ingredients: Vec<IngredientInput>,
) -> CreateRecipeInput {
    CreateRecipeInput {
        organization_id: fixture.org.id,
        outlet_id: fixture.outlet.id,
        name: name.to_string(),
        category: None,
        yield_quantity,
        yield_unit: yield_unit.map(str::to_string),
        portions: Some(4),
        menu_price: Some(dec!(5)),
        instructions: None,
        is_sub_recipe: yield_quantity.is_some(),
        created_by: Some(fixture.owner.id),
        ingredients,
    }
}

fn sub_recipe_line(id: Uuid, quantity: Decimal, unit: &str) -> IngredientInput {
    IngredientInput {
        sub_recipe_id: Some(id),
        quantity: Some(quantity),
        unit: Some(unit.to_string()),
        ..IngredientInput::default()
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_recipe_costing_through_sub_recipe() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

    let onion = CommonProductRepository::new(db.clone())
        .create(
            fixture.org.id,
            CreateCommonProductInput {
                name: "Yellow Onion".to_string(),
                category: Some("Produce".to_string()),
                default_unit: Some("lb".to_string()),
            },
        )
        .await
        .unwrap();
    let distributor = DistributorRepository::new(db.clone())
        .create(fixture.org.id, "Sysco", DistributorContact::default())
        .await
        .unwrap();
    let product = DistributorProductRepository::new(db.clone())
        .create(CreateDistributorProductInput {
            organization_id: fixture.org.id,
            outlet_id: fixture.outlet.id,
            distributor_id: distributor.id,
            sku: "ON50".to_string(),
            name: "Onions Jumbo".to_string(),
            brand: None,
            pack_description: Some("50 LB".to_string()),
            common_product_id: Some(onion.id),
        })
        .await
        .unwrap();
    PriceRepository::new(db.clone())
        .record_price(RecordPriceInput {
            organization_id: fixture.org.id,
            outlet_id: fixture.outlet.id,
            distributor_product_id: product.id,
            price: dec!(25),
            effective_date: today,
            source: PriceSource::Manual,
            created_by: None,
        })
        .await
        .unwrap();

    let recipes = RecipeRepository::new(db.clone());
    let base = recipes
        .create(recipe_input(
            &fixture,
            "Onion Base",
            Some(dec!(1)),
            Some("kg"),
            vec![IngredientInput {
                common_product_id: Some(onion.id),
                quantity: Some(dec!(2)),
                unit: Some("lbs".to_string()),
                ..IngredientInput::default()
            }],
        ))
        .await
        .unwrap();
    let soup = recipes
        .create(recipe_input(
            &fixture,
            "Onion Soup",
            None,
            None,
            vec![
                sub_recipe_line(base.id, dec!(500), "g"),
                IngredientInput {
                    free_text: Some("salt to taste".to_string()),
                    ..IngredientInput::default()
                },
            ],
        ))
        .await
        .unwrap();

    let ctx = recipes
        .costing_context(fixture.outlet.id, &[soup.id], today)
        .await
        .unwrap();
    assert_eq!(ctx.recipes.len(), 2);
    assert_eq!(ctx.products.len(), 1);

    let cost = cost_recipe(&ctx, RecipeId::from_uuid(soup.id)).unwrap();
    assert_eq!(cost.total_cost, dec!(0.5));
    assert!(!cost.fully_costed);
    assert_eq!(cost.lines[0].status, LineStatus::Costed);
    assert_eq!(cost.lines[1].status, LineStatus::FreeText);

    // Before any price exists the product line has nothing to use.
    let early = recipes
        .costing_context(fixture.outlet.id, &[base.id], today.pred_opt().unwrap())
        .await
        .unwrap();
    let base_cost = cost_recipe(&early, RecipeId::from_uuid(base.id)).unwrap();
    assert_eq!(base_cost.lines[0].status, LineStatus::NoPrice);

    let err = recipes
        .replace_ingredients(
            fixture.org.id,
            fixture.outlet.id,
            base.id,
            &[sub_recipe_line(soup.id, dec!(1), "cup")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RecipeError::Cycle(_)));

    let err = recipes.delete(fixture.outlet.id, base.id).await.unwrap_err();
    assert!(matches!(err, RecipeError::InUse(1)));

    cleanup(&db, &fixture).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_reorder_requires_every_ingredient() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let recipes = RecipeRepository::new(db.clone());

    let text = |t: &str| IngredientInput {
        free_text: Some(t.to_string()),
        ..IngredientInput::default()
    };
    let recipe = recipes
        .create(recipe_input(
            &fixture,
            "Vinaigrette",
            None,
            None,
            vec![text("oil"), text("vinegar")],
        ))
        .await
        .unwrap();
    let detail = recipes.find_detail(fixture.outlet.id, recipe.id).await.unwrap();
    let ids: Vec<Uuid> = detail.ingredients.iter().map(|i| i.ingredient.id).collect();

    let err = recipes
        .reorder_ingredients(fixture.outlet.id, recipe.id, &ids[..1])
        .await
        .unwrap_err();
    assert!(matches!(err, RecipeError::OrderMismatch));

    let reordered = recipes
        .reorder_ingredients(fixture.outlet.id, recipe.id, &[ids[1], ids[0]])
        .await
        .unwrap();
    assert_eq!(reordered[0].free_text.as_deref(), Some("vinegar"));
    assert_eq!(reordered[0].sort_order, 0);

    let err = recipes
        .create(recipe_input(&fixture, "Vinaigrette", None, None, vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, RecipeError::DuplicateName(_)));

    cleanup(&db, &fixture).await;
}
