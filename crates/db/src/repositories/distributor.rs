//! Distributor repository.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::is_unique_violation;
use crate::entities::{distributor_products, distributors};

/// Error types for distributor operations.
#[derive(Debug, thiserror::Error)]
pub enum DistributorError {
    /// Distributor not found in the organization.
    #[error("Distributor not found: {0}")]
    NotFound(Uuid),

    /// Another distributor of the organization has this name.
    #[error("A distributor named '{0}' already exists")]
    DuplicateName(String),

    /// Distributor products still reference the distributor.
    #[error("Distributor has {0} product(s)")]
    InUse(u64),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Contact details of a distributor.
#[derive(Debug, Clone, Default)]
pub struct DistributorContact {
    /// Sales representative.
    pub contact_name: Option<String>,
    /// Order email.
    pub contact_email: Option<String>,
    /// Order phone.
    pub contact_phone: Option<String>,
    /// Customer number with the distributor.
    pub account_number: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Input for updating a distributor. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateDistributorInput {
    /// New name.
    pub name: Option<String>,
    /// Replacement contact details.
    pub contact: Option<DistributorContact>,
    /// Activate or deactivate.
    pub is_active: Option<bool>,
}

/// Distributor repository.
#[derive(Debug, Clone)]
pub struct DistributorRepository {
    db: DatabaseConnection,
}

impl DistributorRepository {
    /// Creates a new distributor repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists an organization's distributors by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        org_id: Uuid,
        active: Option<bool>,
    ) -> Result<Vec<distributors::Model>, DbErr> {
        let mut query =
            distributors::Entity::find().filter(distributors::Column::OrganizationId.eq(org_id));
        if let Some(active) = active {
            query = query.filter(distributors::Column::IsActive.eq(active));
        }
        query
            .order_by_asc(distributors::Column::Name)
            .all(&self.db)
            .await
    }

    /// Finds a distributor that belongs to the organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_in_org(
        &self,
        org_id: Uuid,
        id: Uuid,
    ) -> Result<Option<distributors::Model>, DbErr> {
        distributors::Entity::find_by_id(id)
            .filter(distributors::Column::OrganizationId.eq(org_id))
            .one(&self.db)
            .await
    }

    /// Creates a distributor.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` or a database error.
    pub async fn create(
        &self,
        org_id: Uuid,
        name: &str,
        contact: DistributorContact,
    ) -> Result<distributors::Model, DistributorError> {
        let now = chrono::Utc::now().into();
        let name = name.trim().to_string();

        let distributor = distributors::ActiveModel {
            id: Set(Uuid::now_v7()),
            organization_id: Set(org_id),
            name: Set(name.clone()),
            contact_name: Set(contact.contact_name),
            contact_email: Set(contact.contact_email),
            contact_phone: Set(contact.contact_phone),
            account_number: Set(contact.account_number),
            notes: Set(contact.notes),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match distributor.insert(&self.db).await {
            Ok(distributor) => Ok(distributor),
            Err(e) if is_unique_violation(&e) => Err(DistributorError::DuplicateName(name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Updates a distributor.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `DuplicateName`, or a database error.
    pub async fn update(
        &self,
        org_id: Uuid,
        id: Uuid,
        input: UpdateDistributorInput,
    ) -> Result<distributors::Model, DistributorError> {
        let distributor = self
            .find_in_org(org_id, id)
            .await?
            .ok_or(DistributorError::NotFound(id))?;

        let mut active: distributors::ActiveModel = distributor.into();
        let new_name = input.name.map(|n| n.trim().to_string());
        if let Some(name) = &new_name {
            active.name = Set(name.clone());
        }
        if let Some(contact) = input.contact {
            active.contact_name = Set(contact.contact_name);
            active.contact_email = Set(contact.contact_email);
            active.contact_phone = Set(contact.contact_phone);
            active.account_number = Set(contact.account_number);
            active.notes = Set(contact.notes);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        match active.update(&self.db).await {
            Ok(distributor) => Ok(distributor),
            Err(e) if is_unique_violation(&e) => {
                Err(DistributorError::DuplicateName(new_name.unwrap_or_default()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a distributor that has no products in any outlet.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InUse`, or a database error.
    pub async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<(), DistributorError> {
        if self.find_in_org(org_id, id).await?.is_none() {
            return Err(DistributorError::NotFound(id));
        }

        let products = distributor_products::Entity::find()
            .filter(distributor_products::Column::DistributorId.eq(id))
            .count(&self.db)
            .await?;
        if products > 0 {
            return Err(DistributorError::InUse(products));
        }

        distributors::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}
