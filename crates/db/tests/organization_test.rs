//! Integration tests for organizations, membership and outlets.

mod common;

use restaurantek_core::auth::UserRole as Role;
use restaurantek_db::entities::sea_orm_active_enums::{
    SubscriptionStatus, SubscriptionTier, UserRole,
};
use restaurantek_db::repositories::{
    CreateOrganizationInput, OrganizationError, OrganizationRepository, OutletError,
    OutletRemoval, OutletRepository, UpdateOutletInput,
};

use common::{cleanup, connect, create_user, setup};

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_create_with_owner_creates_main_outlet() {
    let db = connect().await;
    let fixture = setup(&db).await;

    assert_eq!(fixture.outlet.name, "Main");
    assert_eq!(fixture.org.subscription_tier, SubscriptionTier::Free);
    assert_eq!(fixture.org.subscription_status, SubscriptionStatus::Trialing);
    assert!(fixture.org.trial_ends_at.is_some());

    let repo = OrganizationRepository::new(db.clone());
    let membership = repo
        .get_user_membership(fixture.org.id, fixture.owner.id)
        .await
        .unwrap()
        .expect("owner membership");
    assert_eq!(membership.role, UserRole::Owner);
    assert!(repo.has_role(fixture.org.id, fixture.owner.id, Role::Admin).await.unwrap());

    cleanup(&db, &fixture).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_duplicate_slug_is_rejected() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let other = create_user(&db, "other").await;

    let err = OrganizationRepository::new(db.clone())
        .create_with_owner(
            CreateOrganizationInput {
                name: "Copy".to_string(),
                slug: fixture.org.slug.clone(),
                currency: "USD".to_string(),
                timezone: "UTC".to_string(),
            },
            other.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrganizationError::SlugTaken(_)));

    cleanup(&db, &fixture).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_last_owner_cannot_leave_or_be_demoted() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let repo = OrganizationRepository::new(db.clone());

    let err = repo
        .update_member_role(fixture.org.id, fixture.owner.id, UserRole::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, OrganizationError::LastOwner));

    let err = repo.remove_user(fixture.org.id, fixture.owner.id).await.unwrap_err();
    assert!(matches!(err, OrganizationError::LastOwner));

    let second = create_user(&db, "second-owner").await;
    repo.add_user(fixture.org.id, second.id, UserRole::Owner).await.unwrap();
    repo.update_member_role(fixture.org.id, fixture.owner.id, UserRole::Admin)
        .await
        .expect("demotion allowed with another owner");

    cleanup(&db, &fixture).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_chef_sees_only_assigned_outlets() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let orgs = OrganizationRepository::new(db.clone());
    let outlets = OutletRepository::new(db.clone());

    let downtown = outlets
        .create(fixture.org.id, "Downtown", None)
        .await
        .unwrap();
    let chef = create_user(&db, "chef").await;
    orgs.add_user(fixture.org.id, chef.id, UserRole::Chef).await.unwrap();
    outlets
        .assign_user(fixture.org.id, downtown.id, chef.id)
        .await
        .unwrap();

    let visible = outlets.list(fixture.org.id, chef.id, Role::Chef).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, downtown.id);

    assert!(outlets
        .user_has_access(fixture.org.id, downtown.id, chef.id, Role::Chef)
        .await
        .unwrap());
    assert!(!outlets
        .user_has_access(fixture.org.id, fixture.outlet.id, chef.id, Role::Chef)
        .await
        .unwrap());

    let all = outlets
        .list(fixture.org.id, fixture.owner.id, Role::Owner)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    cleanup(&db, &fixture).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_add_user_with_foreign_outlet_leaves_no_membership() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let other = setup(&db).await;
    let orgs = OrganizationRepository::new(db.clone());
    let outlets = OutletRepository::new(db.clone());
    let chef = create_user(&db, "chef").await;

    let err = orgs
        .add_user_with_outlets(
            fixture.org.id,
            chef.id,
            UserRole::Chef,
            &[fixture.outlet.id, other.outlet.id],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrganizationError::OutletNotFound(id) if id == other.outlet.id));
    assert!(!orgs.is_member(fixture.org.id, chef.id).await.unwrap());
    assert!(!outlets
        .user_has_access(fixture.org.id, fixture.outlet.id, chef.id, Role::Chef)
        .await
        .unwrap());

    // Repeated ids are assigned once.
    orgs.add_user_with_outlets(
        fixture.org.id,
        chef.id,
        UserRole::Chef,
        &[fixture.outlet.id, fixture.outlet.id],
    )
    .await
    .unwrap();
    assert!(outlets
        .user_has_access(fixture.org.id, fixture.outlet.id, chef.id, Role::Chef)
        .await
        .unwrap());

    cleanup(&db, &other).await;
    cleanup(&db, &fixture).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_last_active_outlet_is_kept() {
    let db = connect().await;
    let fixture = setup(&db).await;
    let outlets = OutletRepository::new(db.clone());

    let err = outlets.delete(fixture.org.id, fixture.outlet.id).await.unwrap_err();
    assert!(matches!(err, OutletError::LastOutlet));

    let err = outlets
        .update(
            fixture.org.id,
            fixture.outlet.id,
            UpdateOutletInput {
                is_active: Some(false),
                ..UpdateOutletInput::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OutletError::LastOutlet));

    let spare = outlets.create(fixture.org.id, "Spare", None).await.unwrap();
    let removal = outlets.delete(fixture.org.id, spare.id).await.unwrap();
    assert_eq!(removal, OutletRemoval::Deleted);

    let err = outlets.create(fixture.org.id, "Main", None).await.unwrap_err();
    assert!(matches!(err, OutletError::DuplicateName(_)));

    cleanup(&db, &fixture).await;
}
