//! Organization repository for database operations.

use restaurantek_core::auth::UserRole as Role;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use super::{is_unique_violation, lock_organization};
use crate::entities::{
    organization_users, organizations, outlets,
    sea_orm_active_enums::{SubscriptionStatus, SubscriptionTier, UserRole},
    user_outlets, users,
};

/// Name of the outlet every organization starts with.
pub const DEFAULT_OUTLET_NAME: &str = "Main";

/// Days of trial a new organization gets.
pub const TRIAL_DAYS: i64 = 14;

/// Error types for organization operations.
#[derive(Debug, thiserror::Error)]
pub enum OrganizationError {
    /// Organization not found.
    #[error("Organization not found: {0}")]
    NotFound(Uuid),

    /// Slug already used by another organization.
    #[error("Slug '{0}' is already taken")]
    SlugTaken(String),

    /// User is not a member of the organization.
    #[error("User {0} is not a member of this organization")]
    NotMember(Uuid),

    /// User is already a member of the organization.
    #[error("User {0} is already a member of this organization")]
    AlreadyMember(Uuid),

    /// Outlet does not exist in the organization.
    #[error("Outlet not found: {0}")]
    OutletNotFound(Uuid),

    /// The change would leave the organization without an owner.
    #[error("An organization must keep at least one owner")]
    LastOwner,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating an organization.
#[derive(Debug, Clone)]
pub struct CreateOrganizationInput {
    /// Display name.
    pub name: String,
    /// URL-friendly unique slug.
    pub slug: String,
    /// ISO 4217 currency code.
    pub currency: String,
    /// IANA timezone.
    pub timezone: String,
}

/// Input for updating an organization. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrganizationInput {
    /// New name.
    pub name: Option<String>,
    /// New currency code.
    pub currency: Option<String>,
    /// New timezone.
    pub timezone: Option<String>,
}

/// Organization repository for CRUD and membership operations.
#[derive(Debug, Clone)]
pub struct OrganizationRepository {
    db: DatabaseConnection,
}

impl OrganizationRepository {
    /// Creates a new organization repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an organization by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<organizations::Model>, DbErr> {
        organizations::Entity::find_by_id(id).one(&self.db).await
    }

    /// Checks if a slug is already taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn slug_exists(&self, slug: &str) -> Result<bool, DbErr> {
        let count = organizations::Entity::find()
            .filter(organizations::Column::Slug.eq(slug))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Creates an organization with the creator as owner and a default outlet.
    ///
    /// All three rows are written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `SlugTaken` on a slug collision, or a database error.
    pub async fn create_with_owner(
        &self,
        input: CreateOrganizationInput,
        owner_id: Uuid,
    ) -> Result<(organizations::Model, outlets::Model), OrganizationError> {
        let txn = self.db.begin().await?;

        let now = chrono::Utc::now();
        let org_id = Uuid::now_v7();

        let org = organizations::ActiveModel {
            id: Set(org_id),
            name: Set(input.name.trim().to_string()),
            slug: Set(input.slug.clone()),
            currency: Set(input.currency.to_uppercase()),
            timezone: Set(input.timezone),
            settings: Set(json!({})),
            is_active: Set(true),
            subscription_tier: Set(SubscriptionTier::Free),
            subscription_status: Set(SubscriptionStatus::Trialing),
            trial_ends_at: Set(Some((now + chrono::Duration::days(TRIAL_DAYS)).into())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let org = match org.insert(&txn).await {
            Ok(org) => org,
            Err(e) if is_unique_violation(&e) => {
                return Err(OrganizationError::SlugTaken(input.slug));
            }
            Err(e) => return Err(e.into()),
        };

        organization_users::ActiveModel {
            user_id: Set(owner_id),
            organization_id: Set(org_id),
            role: Set(UserRole::Owner),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let outlet = outlets::ActiveModel {
            id: Set(Uuid::now_v7()),
            organization_id: Set(org_id),
            name: Set(DEFAULT_OUTLET_NAME.to_string()),
            address: Set(None),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok((org, outlet))
    }

    /// Updates an organization's settings.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the organization does not exist, or a database error.
    pub async fn update(
        &self,
        org_id: Uuid,
        input: UpdateOrganizationInput,
    ) -> Result<organizations::Model, OrganizationError> {
        let org = self
            .find_by_id(org_id)
            .await?
            .ok_or(OrganizationError::NotFound(org_id))?;

        let mut active: organizations::ActiveModel = org.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(currency) = input.currency {
            active.currency = Set(currency.to_uppercase());
        }
        if let Some(timezone) = input.timezone {
            active.timezone = Set(timezone);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Adds a user to an organization.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyMember` if the membership exists, or a database error.
    pub async fn add_user(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<organization_users::Model, OrganizationError> {
        self.add_user_with_outlets(org_id, user_id, role, &[]).await
    }

    /// Adds a user to an organization and assigns them to the given outlets.
    ///
    /// The membership and the assignments are written in one transaction, so
    /// an unknown outlet leaves no membership behind.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyMember` if the membership exists, `OutletNotFound` if an
    /// outlet is not in the organization, or a database error.
    pub async fn add_user_with_outlets(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role: UserRole,
        outlet_ids: &[Uuid],
    ) -> Result<organization_users::Model, OrganizationError> {
        let txn = self.db.begin().await?;
        let now = chrono::Utc::now().into();

        let org_user = organization_users::ActiveModel {
            user_id: Set(user_id),
            organization_id: Set(org_id),
            role: Set(role),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let member = match org_user.insert(&txn).await {
            Ok(member) => member,
            Err(e) if is_unique_violation(&e) => {
                return Err(OrganizationError::AlreadyMember(user_id));
            }
            Err(e) => return Err(e.into()),
        };

        // A repeated id would hit the primary key and abort the transaction.
        let mut outlet_ids = outlet_ids.to_vec();
        outlet_ids.sort_unstable();
        outlet_ids.dedup();

        for outlet_id in outlet_ids {
            let in_org = outlets::Entity::find_by_id(outlet_id)
                .filter(outlets::Column::OrganizationId.eq(org_id))
                .one(&txn)
                .await?
                .is_some();
            if !in_org {
                return Err(OrganizationError::OutletNotFound(outlet_id));
            }

            user_outlets::ActiveModel {
                user_id: Set(user_id),
                outlet_id: Set(outlet_id),
                organization_id: Set(org_id),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        Ok(member)
    }

    /// Gets all users in an organization, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_users(
        &self,
        org_id: Uuid,
    ) -> Result<Vec<(users::Model, organization_users::Model)>, DbErr> {
        organization_users::Entity::find()
            .filter(organization_users::Column::OrganizationId.eq(org_id))
            .find_also_related(users::Entity)
            .order_by_asc(users::Column::FullName)
            .all(&self.db)
            .await
            .map(|results| {
                results
                    .into_iter()
                    .filter_map(|(ou, user)| user.map(|u| (u, ou)))
                    .collect()
            })
    }

    /// Gets a user's membership in an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_user_membership(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<organization_users::Model>, DbErr> {
        organization_users::Entity::find_by_id((user_id, org_id))
            .one(&self.db)
            .await
    }

    /// Checks if a user is a member of an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn is_member(&self, org_id: Uuid, user_id: Uuid) -> Result<bool, DbErr> {
        Ok(self.get_user_membership(org_id, user_id).await?.is_some())
    }

    /// Checks if a user has a specific role or higher in an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn has_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        required_role: Role,
    ) -> Result<bool, DbErr> {
        let membership = self.get_user_membership(org_id, user_id).await?;

        Ok(membership.is_some_and(|m| Role::from(m.role).at_least(required_role)))
    }

    /// Changes a member's role.
    ///
    /// # Errors
    ///
    /// Returns `NotMember`, `LastOwner` when demoting the only owner, or a database error.
    pub async fn update_member_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<organization_users::Model, OrganizationError> {
        let txn = self.db.begin().await?;

        let member = organization_users::Entity::find_by_id((user_id, org_id))
            .one(&txn)
            .await?
            .ok_or(OrganizationError::NotMember(user_id))?;

        if member.role == UserRole::Owner && role != UserRole::Owner {
            ensure_other_owner(&txn, org_id).await?;
        }

        let mut active: organization_users::ActiveModel = member.into();
        active.role = Set(role);
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&txn).await?;

        // Owners and admins see every outlet, explicit assignments are moot.
        if Role::from(role).sees_all_outlets() {
            delete_outlet_assignments(&txn, org_id, user_id).await?;
        }

        txn.commit().await?;
        Ok(updated)
    }

    /// Removes a user from an organization together with their outlet assignments.
    ///
    /// # Errors
    ///
    /// Returns `NotMember`, `LastOwner` when removing the only owner, or a database error.
    pub async fn remove_user(&self, org_id: Uuid, user_id: Uuid) -> Result<(), OrganizationError> {
        let txn = self.db.begin().await?;

        let member = organization_users::Entity::find_by_id((user_id, org_id))
            .one(&txn)
            .await?
            .ok_or(OrganizationError::NotMember(user_id))?;

        if member.role == UserRole::Owner {
            ensure_other_owner(&txn, org_id).await?;
        }

        delete_outlet_assignments(&txn, org_id, user_id).await?;
        organization_users::Entity::delete_by_id((user_id, org_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Counts the members of an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_members(&self, org_id: Uuid) -> Result<u64, DbErr> {
        organization_users::Entity::find()
            .filter(organization_users::Column::OrganizationId.eq(org_id))
            .count(&self.db)
            .await
    }
}

/// Fails with `LastOwner` unless the organization has at least two owners.
///
/// Locks the organization first, so two transactions each removing a
/// different owner cannot both pass on the same count.
async fn ensure_other_owner<C: ConnectionTrait>(
    conn: &C,
    org_id: Uuid,
) -> Result<(), OrganizationError> {
    lock_organization(conn, org_id).await?;
    let owners = organization_users::Entity::find()
        .filter(organization_users::Column::OrganizationId.eq(org_id))
        .filter(organization_users::Column::Role.eq(UserRole::Owner))
        .count(conn)
        .await?;

    if owners < 2 {
        return Err(OrganizationError::LastOwner);
    }
    Ok(())
}

async fn delete_outlet_assignments<C: ConnectionTrait>(
    conn: &C,
    org_id: Uuid,
    user_id: Uuid,
) -> Result<(), DbErr> {
    user_outlets::Entity::delete_many()
        .filter(user_outlets::Column::OrganizationId.eq(org_id))
        .filter(user_outlets::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}
