//! Concurrent removals against the last-owner and last-outlet guards.
//!
//! Each test fires two removals at once that would each be allowed alone but
//! together would leave the organization without an owner or an active
//! outlet. Exactly one of them must win.

mod common;

use restaurantek_db::entities::{organization_users, sea_orm_active_enums::UserRole};
use restaurantek_db::repositories::{
    OrganizationError, OrganizationRepository, OutletError, OutletRepository, UpdateOutletInput,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use common::{cleanup, connect, create_user, setup};

async fn count_owners(db: &DatabaseConnection, org_id: Uuid) -> u64 {
    organization_users::Entity::find()
        .filter(organization_users::Column::OrganizationId.eq(org_id))
        .filter(organization_users::Column::Role.eq(UserRole::Owner))
        .count(db)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_owner_demotions_leave_one_owner() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let repo = OrganizationRepository::new(db.clone());
    let second = create_user(&db, "co-owner").await;
    repo.add_user(fixture.org.id, second.id, UserRole::Owner).await.unwrap();

    let first_repo = OrganizationRepository::new(db.clone());
    let second_repo = OrganizationRepository::new(db.clone());
    let (a, b) = tokio::join!(
        first_repo.update_member_role(fixture.org.id, fixture.owner.id, UserRole::Admin),
        second_repo.update_member_role(fixture.org.id, second.id, UserRole::Admin),
    );

    assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
    let err = a.err().or(b.err()).unwrap();
    assert!(matches!(err, OrganizationError::LastOwner));
    assert_eq!(count_owners(&db, fixture.org.id).await, 1);

    cleanup(&db, &fixture).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_owner_removals_leave_one_owner() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let repo = OrganizationRepository::new(db.clone());
    let second = create_user(&db, "co-owner").await;
    repo.add_user(fixture.org.id, second.id, UserRole::Owner).await.unwrap();

    let first_repo = OrganizationRepository::new(db.clone());
    let second_repo = OrganizationRepository::new(db.clone());
    let (a, b) = tokio::join!(
        first_repo.remove_user(fixture.org.id, fixture.owner.id),
        second_repo.remove_user(fixture.org.id, second.id),
    );

    assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
    let err = a.err().or(b.err()).unwrap();
    assert!(matches!(err, OrganizationError::LastOwner));
    assert_eq!(count_owners(&db, fixture.org.id).await, 1);

    cleanup(&db, &fixture).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_outlet_deletes_keep_one_active() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let repo = OutletRepository::new(db.clone());
    let downtown = repo.create(fixture.org.id, "Downtown", None).await.unwrap();

    let first_repo = OutletRepository::new(db.clone());
    let second_repo = OutletRepository::new(db.clone());
    let (a, b) = tokio::join!(
        first_repo.delete(fixture.org.id, fixture.outlet.id),
        second_repo.delete(fixture.org.id, downtown.id),
    );

    assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
    let err = a.err().or(b.err()).unwrap();
    assert!(matches!(err, OutletError::LastOutlet));
    assert_eq!(repo.count_active(fixture.org.id).await.unwrap(), 1);

    cleanup(&db, &fixture).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_outlet_deactivations_keep_one_active() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let repo = OutletRepository::new(db.clone());
    let downtown = repo.create(fixture.org.id, "Downtown", None).await.unwrap();
    let deactivate = || UpdateOutletInput {
        is_active: Some(false),
        ..UpdateOutletInput::default()
    };

    let first_repo = OutletRepository::new(db.clone());
    let second_repo = OutletRepository::new(db.clone());
    let (a, b) = tokio::join!(
        first_repo.update(fixture.org.id, fixture.outlet.id, deactivate()),
        second_repo.update(fixture.org.id, downtown.id, deactivate()),
    );

    assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
    let err = a.err().or(b.err()).unwrap();
    assert!(matches!(err, OutletError::LastOutlet));
    assert_eq!(repo.count_active(fixture.org.id).await.unwrap(), 1);

    cleanup(&db, &fixture).await;
}
