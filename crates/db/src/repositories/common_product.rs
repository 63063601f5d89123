//! Common product repository: the organization's ingredient catalog.

use restaurantek_core::matching::MatchCandidate;
use restaurantek_shared::types::{CommonProductId, PageRequest};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, Func},
};
use uuid::Uuid;

use super::{is_unique_violation, like_pattern};
use crate::entities::{common_products, distributor_products, recipe_ingredients};

/// Error types for common product operations.
#[derive(Debug, thiserror::Error)]
pub enum CommonProductError {
    /// Product not found in the organization.
    #[error("Common product not found: {0}")]
    NotFound(Uuid),

    /// Another product of the organization has this name (case-insensitive).
    #[error("A product named '{0}' already exists")]
    DuplicateName(String),

    /// Recipes still use the product.
    #[error("Product is used by {0} recipe ingredient(s)")]
    InUse(u64),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Filter for listing common products.
#[derive(Debug, Clone, Default)]
pub struct CommonProductFilter {
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    /// Active flag; `None` lists both.
    pub active: Option<bool>,
}

/// Input for creating a common product.
#[derive(Debug, Clone)]
pub struct CreateCommonProductInput {
    /// Display name.
    pub name: String,
    /// Category such as "Produce".
    pub category: Option<String>,
    /// Canonical unit code.
    pub default_unit: Option<String>,
}

/// Input for updating a common product. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateCommonProductInput {
    /// New name.
    pub name: Option<String>,
    /// New category; `Some(None)` clears it.
    pub category: Option<Option<String>>,
    /// New default unit; `Some(None)` clears it.
    pub default_unit: Option<Option<String>>,
    /// Activate or deactivate.
    pub is_active: Option<bool>,
}

/// How widely a common product is referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductUsage {
    /// Distributor products mapped to it, across outlets.
    pub distributor_products: u64,
    /// Recipe lines using it.
    pub recipe_ingredients: u64,
}

/// Common product repository.
#[derive(Debug, Clone)]
pub struct CommonProductRepository {
    db: DatabaseConnection,
}

impl CommonProductRepository {
    /// Creates a new common product repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists products matching a filter, ordered by name.
    ///
    /// Returns the page and the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        org_id: Uuid,
        filter: &CommonProductFilter,
        page: &PageRequest,
    ) -> Result<(Vec<common_products::Model>, u64), DbErr> {
        let mut query = common_products::Entity::find()
            .filter(common_products::Column::OrganizationId.eq(org_id));

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(common_products::Column::Name)))
                    .like(like_pattern(search)),
            );
        }
        if let Some(category) = &filter.category {
            query = query.filter(common_products::Column::Category.eq(category.as_str()));
        }
        if let Some(active) = filter.active {
            query = query.filter(common_products::Column::IsActive.eq(active));
        }

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_asc(common_products::Column::Name)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((items, total))
    }

    /// Finds a product that belongs to the organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_in_org(
        &self,
        org_id: Uuid,
        id: Uuid,
    ) -> Result<Option<common_products::Model>, DbErr> {
        common_products::Entity::find_by_id(id)
            .filter(common_products::Column::OrganizationId.eq(org_id))
            .one(&self.db)
            .await
    }

    /// Creates a product.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` or a database error.
    pub async fn create(
        &self,
        org_id: Uuid,
        input: CreateCommonProductInput,
    ) -> Result<common_products::Model, CommonProductError> {
        let now = chrono::Utc::now().into();
        let name = input.name.trim().to_string();

        let product = common_products::ActiveModel {
            id: Set(Uuid::now_v7()),
            organization_id: Set(org_id),
            name: Set(name.clone()),
            category: Set(input.category),
            default_unit: Set(input.default_unit),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match product.insert(&self.db).await {
            Ok(product) => Ok(product),
            Err(e) if is_unique_violation(&e) => Err(CommonProductError::DuplicateName(name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Updates a product.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `DuplicateName`, or a database error.
    pub async fn update(
        &self,
        org_id: Uuid,
        id: Uuid,
        input: UpdateCommonProductInput,
    ) -> Result<common_products::Model, CommonProductError> {
        let product = self
            .find_in_org(org_id, id)
            .await?
            .ok_or(CommonProductError::NotFound(id))?;

        let mut active: common_products::ActiveModel = product.into();
        let new_name = input.name.map(|n| n.trim().to_string());
        if let Some(name) = &new_name {
            active.name = Set(name.clone());
        }
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        if let Some(unit) = input.default_unit {
            active.default_unit = Set(unit);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        match active.update(&self.db).await {
            Ok(product) => Ok(product),
            Err(e) if is_unique_violation(&e) => {
                Err(CommonProductError::DuplicateName(new_name.unwrap_or_default()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a product that no recipe uses.
    ///
    /// Mapped distributor products are unmapped by the foreign key.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InUse`, or a database error.
    pub async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<(), CommonProductError> {
        if self.find_in_org(org_id, id).await?.is_none() {
            return Err(CommonProductError::NotFound(id));
        }

        let usage = self.usage(id).await?;
        if usage.recipe_ingredients > 0 {
            return Err(CommonProductError::InUse(usage.recipe_ingredients));
        }

        common_products::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    /// Counts the references to a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn usage(&self, id: Uuid) -> Result<ProductUsage, DbErr> {
        let distributor_products = distributor_products::Entity::find()
            .filter(distributor_products::Column::CommonProductId.eq(id))
            .count(&self.db)
            .await?;
        let recipe_ingredients = recipe_ingredients::Entity::find()
            .filter(recipe_ingredients::Column::CommonProductId.eq(id))
            .count(&self.db)
            .await?;

        Ok(ProductUsage {
            distributor_products,
            recipe_ingredients,
        })
    }

    /// Returns the active products of an organization as match candidates.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn match_candidates(&self, org_id: Uuid) -> Result<Vec<MatchCandidate>, DbErr> {
        let products = common_products::Entity::find()
            .filter(common_products::Column::OrganizationId.eq(org_id))
            .filter(common_products::Column::IsActive.eq(true))
            .all(&self.db)
            .await?;

        Ok(products
            .into_iter()
            .map(|p| MatchCandidate {
                id: CommonProductId::from_uuid(p.id),
                name: p.name,
            })
            .collect())
    }
}
