//! User repository for database operations.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::{organization_users, organizations, users};

/// User repository for CRUD operations.
///
/// Emails are stored and looked up lowercased.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id).one(&self.db).await
    }

    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
    ) -> Result<users::Model, DbErr> {
        let now = chrono::Utc::now().into();
        let user = users::ActiveModel {
            id: Set(Uuid::now_v7()),
            email: Set(normalize_email(email)),
            password_hash: Set(password_hash.to_string()),
            full_name: Set(full_name.trim().to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        user.insert(&self.db).await
    }

    /// Gets all organizations for a user with their roles, oldest membership first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_user_organizations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(organizations::Model, organization_users::Model)>, DbErr> {
        organization_users::Entity::find()
            .filter(organization_users::Column::UserId.eq(user_id))
            .order_by_asc(organization_users::Column::CreatedAt)
            .find_also_related(organizations::Entity)
            .all(&self.db)
            .await
            .map(|results| {
                results
                    .into_iter()
                    .filter_map(|(ou, org)| org.map(|o| (o, ou)))
                    .filter(|(org, _)| org.is_active)
                    .collect()
            })
    }

    /// Gets the organization a login lands in: the user's oldest active membership.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_default_organization(
        &self,
        user_id: Uuid,
    ) -> Result<Option<(organizations::Model, organization_users::Model)>, DbErr> {
        Ok(self
            .get_user_organizations(user_id)
            .await?
            .into_iter()
            .next())
    }

    /// Checks if an email is already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn email_exists(&self, email: &str) -> Result<bool, DbErr> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(normalize_email(email)))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }
}

/// Lowercases and trims an email address.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Chef@Example.COM "), "chef@example.com");
    }
}
