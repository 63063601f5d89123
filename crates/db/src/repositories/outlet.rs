//! Outlet repository: locations of an organization and who may see them.

use restaurantek_core::auth::UserRole as Role;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use uuid::Uuid;

use super::{is_unique_violation, lock_organization};
use crate::entities::{
    distributor_products, organization_users, outlets, recipes, user_outlets, users,
};

/// Error types for outlet operations.
#[derive(Debug, thiserror::Error)]
pub enum OutletError {
    /// Outlet not found in the organization.
    #[error("Outlet not found: {0}")]
    NotFound(Uuid),

    /// Another outlet of the organization has this name.
    #[error("An outlet named '{0}' already exists")]
    DuplicateName(String),

    /// The organization's only active outlet cannot be removed.
    #[error("Cannot remove the last active outlet")]
    LastOutlet,

    /// User is not a member of the organization.
    #[error("User {0} is not a member of this organization")]
    UserNotMember(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for updating an outlet. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateOutletInput {
    /// New name.
    pub name: Option<String>,
    /// New address; `Some(None)` clears it.
    pub address: Option<Option<String>>,
    /// Reactivate or deactivate.
    pub is_active: Option<bool>,
}

/// What happened to an outlet on delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutletRemoval {
    /// The outlet had no data and was deleted.
    Deleted,
    /// The outlet holds products or recipes and was deactivated instead.
    Deactivated,
}

/// Outlet repository.
#[derive(Debug, Clone)]
pub struct OutletRepository {
    db: DatabaseConnection,
}

impl OutletRepository {
    /// Creates a new outlet repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists the outlets a member can see.
    ///
    /// Owners and admins see every outlet; other roles see the outlets they
    /// are assigned to. Inactive outlets are only listed for roles that see
    /// everything.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<Vec<outlets::Model>, DbErr> {
        let query = outlets::Entity::find()
            .filter(outlets::Column::OrganizationId.eq(org_id))
            .order_by_asc(outlets::Column::Name);

        if role.sees_all_outlets() {
            return query.all(&self.db).await;
        }

        query
            .filter(outlets::Column::IsActive.eq(true))
            .join(JoinType::InnerJoin, outlets::Relation::UserOutlets.def())
            .filter(user_outlets::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
    }

    /// Finds an outlet that belongs to the organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_in_org(
        &self,
        org_id: Uuid,
        outlet_id: Uuid,
    ) -> Result<Option<outlets::Model>, DbErr> {
        outlets::Entity::find_by_id(outlet_id)
            .filter(outlets::Column::OrganizationId.eq(org_id))
            .one(&self.db)
            .await
    }

    /// Creates an outlet.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if the organization already has an outlet with
    /// this name, or a database error.
    pub async fn create(
        &self,
        org_id: Uuid,
        name: &str,
        address: Option<String>,
    ) -> Result<outlets::Model, OutletError> {
        let now = chrono::Utc::now().into();
        let name = name.trim().to_string();

        let outlet = outlets::ActiveModel {
            id: Set(Uuid::now_v7()),
            organization_id: Set(org_id),
            name: Set(name.clone()),
            address: Set(address),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match outlet.insert(&self.db).await {
            Ok(outlet) => Ok(outlet),
            Err(e) if is_unique_violation(&e) => Err(OutletError::DuplicateName(name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Updates an outlet.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `DuplicateName`, `LastOutlet` when deactivating the
    /// only active outlet, or a database error.
    pub async fn update(
        &self,
        org_id: Uuid,
        outlet_id: Uuid,
        input: UpdateOutletInput,
    ) -> Result<outlets::Model, OutletError> {
        let txn = self.db.begin().await?;
        lock_organization(&txn, org_id).await?;

        let outlet = outlets::Entity::find_by_id(outlet_id)
            .filter(outlets::Column::OrganizationId.eq(org_id))
            .one(&txn)
            .await?
            .ok_or(OutletError::NotFound(outlet_id))?;

        if input.is_active == Some(false)
            && outlet.is_active
            && count_active_in(&txn, org_id).await? <= 1
        {
            return Err(OutletError::LastOutlet);
        }

        let mut active: outlets::ActiveModel = outlet.into();
        let mut new_name = None;
        if let Some(name) = input.name {
            let name = name.trim().to_string();
            active.name = Set(name.clone());
            new_name = Some(name);
        }
        if let Some(address) = input.address {
            active.address = Set(address);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        let updated = match active.update(&txn).await {
            Ok(outlet) => outlet,
            Err(e) if is_unique_violation(&e) => {
                return Err(OutletError::DuplicateName(new_name.unwrap_or_default()));
            }
            Err(e) => return Err(e.into()),
        };

        txn.commit().await?;
        Ok(updated)
    }

    /// Removes an outlet.
    ///
    /// An outlet that holds distributor products or recipes is deactivated
    /// so its history survives; an empty one is deleted.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `LastOutlet`, or a database error.
    pub async fn delete(
        &self,
        org_id: Uuid,
        outlet_id: Uuid,
    ) -> Result<OutletRemoval, OutletError> {
        let txn = self.db.begin().await?;
        lock_organization(&txn, org_id).await?;

        let outlet = outlets::Entity::find_by_id(outlet_id)
            .filter(outlets::Column::OrganizationId.eq(org_id))
            .one(&txn)
            .await?
            .ok_or(OutletError::NotFound(outlet_id))?;

        let active_outlets = count_active_in(&txn, org_id).await?;
        if outlet.is_active && active_outlets <= 1 {
            return Err(OutletError::LastOutlet);
        }

        let products = distributor_products::Entity::find()
            .filter(distributor_products::Column::OutletId.eq(outlet_id))
            .count(&txn)
            .await?;
        let recipe_count = recipes::Entity::find()
            .filter(recipes::Column::OutletId.eq(outlet_id))
            .count(&txn)
            .await?;

        let removal = if products > 0 || recipe_count > 0 {
            let mut active: outlets::ActiveModel = outlet.into();
            active.is_active = Set(false);
            active.updated_at = Set(chrono::Utc::now().into());
            active.update(&txn).await?;
            OutletRemoval::Deactivated
        } else {
            outlets::Entity::delete_by_id(outlet_id).exec(&txn).await?;
            OutletRemoval::Deleted
        };

        txn.commit().await?;
        Ok(removal)
    }

    /// Assigns a member to an outlet. Assigning twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `UserNotMember`, or a database error.
    pub async fn assign_user(
        &self,
        org_id: Uuid,
        outlet_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), OutletError> {
        if self.find_in_org(org_id, outlet_id).await?.is_none() {
            return Err(OutletError::NotFound(outlet_id));
        }

        let is_member = organization_users::Entity::find_by_id((user_id, org_id))
            .one(&self.db)
            .await?
            .is_some();
        if !is_member {
            return Err(OutletError::UserNotMember(user_id));
        }

        let assignment = user_outlets::ActiveModel {
            user_id: Set(user_id),
            outlet_id: Set(outlet_id),
            organization_id: Set(org_id),
            created_at: Set(chrono::Utc::now().into()),
        };

        match assignment.insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes a member from an outlet. Returns whether an assignment existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn unassign_user(&self, outlet_id: Uuid, user_id: Uuid) -> Result<bool, DbErr> {
        let result = user_outlets::Entity::delete_by_id((user_id, outlet_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Lists the users explicitly assigned to an outlet.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_users(&self, outlet_id: Uuid) -> Result<Vec<users::Model>, DbErr> {
        users::Entity::find()
            .join(JoinType::InnerJoin, users::Relation::UserOutlets.def())
            .filter(user_outlets::Column::OutletId.eq(outlet_id))
            .order_by_asc(users::Column::FullName)
            .all(&self.db)
            .await
    }

    /// Checks whether a member with `role` may work in an outlet.
    ///
    /// The outlet must belong to the organization. Owners and admins reach
    /// every outlet; other roles need an assignment to an active outlet.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn user_has_access(
        &self,
        org_id: Uuid,
        outlet_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<bool, DbErr> {
        let Some(outlet) = self.find_in_org(org_id, outlet_id).await? else {
            return Ok(false);
        };
        if role.sees_all_outlets() {
            return Ok(true);
        }
        if !outlet.is_active {
            return Ok(false);
        }

        let assigned = user_outlets::Entity::find_by_id((user_id, outlet_id))
            .one(&self.db)
            .await?;
        Ok(assigned.is_some())
    }

    /// Counts an organization's active outlets.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_active(&self, org_id: Uuid) -> Result<u64, DbErr> {
        count_active_in(&self.db, org_id).await
    }
}

async fn count_active_in<C: ConnectionTrait>(conn: &C, org_id: Uuid) -> Result<u64, DbErr> {
    outlets::Entity::find()
        .filter(outlets::Column::OrganizationId.eq(org_id))
        .filter(outlets::Column::IsActive.eq(true))
        .count(conn)
        .await
}
