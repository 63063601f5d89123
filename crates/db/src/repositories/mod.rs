//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Organization-wide data is filtered by organization id and outlet data by
//! outlet id; callers check membership and outlet access first.

pub mod common_product;
pub mod distributor;
pub mod distributor_product;
pub mod organization;
pub mod outlet;
pub mod price;
pub mod recipe;
pub mod subscription;
pub mod user;

pub use common_product::{
    CommonProductError, CommonProductFilter, CommonProductRepository, CreateCommonProductInput,
    ProductUsage, UpdateCommonProductInput,
};
pub use distributor::{
    DistributorContact, DistributorError, DistributorRepository, UpdateDistributorInput,
};
pub use distributor_product::{
    CreateDistributorProductInput, DistributorProductError, DistributorProductFilter,
    DistributorProductRepository, ProductWithPrice, UpdateDistributorProductInput, stored_pack,
};
pub use organization::{
    CreateOrganizationInput, OrganizationError, OrganizationRepository, UpdateOrganizationInput,
};
pub use outlet::{OutletError, OutletRemoval, OutletRepository, UpdateOutletInput};
pub use price::{
    ImportPriceRow, ImportPricesInput, ImportRowOutcome, ImportRowResult, ImportSummary,
    LatestPrice, PriceError, PriceRepository, ProductPriceChange, RecordPriceInput,
};
pub use recipe::{
    CreateRecipeInput, IngredientDetail, IngredientInput, RecipeDetail, RecipeError,
    RecipeFilter, RecipeRepository, UpdateRecipeInput,
};
pub use subscription::{
    Feature, LimitCheckResult, ResourceLimit, ResourceUsage, SubscriptionRepository,
    UsageSummary,
};
pub use user::UserRepository;

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, QuerySelect, SqlErr};
use uuid::Uuid;

use crate::entities::organizations;

/// Whether a database error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Takes a row lock on the organization for the rest of the transaction.
///
/// Guards that count rows before removing one (the last owner, the last
/// active outlet) hold this lock so concurrent removals run one after the
/// other and each sees the other's committed result.
pub(crate) async fn lock_organization<C: ConnectionTrait>(
    conn: &C,
    org_id: Uuid,
) -> Result<(), DbErr> {
    organizations::Entity::find_by_id(org_id)
        .lock_exclusive()
        .one(conn)
        .await?;
    Ok(())
}

/// `LIKE` pattern matching `search` anywhere, for use against `lower(column)`.
pub(crate) fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unescape(pattern: &str) -> String {
        let inner = &pattern[1..pattern.len() - 1];
        let mut out = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                out.extend(chars.next());
            } else {
                out.push(c);
            }
        }
        out
    }

    proptest! {
        #[test]
        fn prop_like_pattern_matches_literal_text(search in ".{0,40}") {
            let pattern = like_pattern(&search);
            prop_assert!(pattern.starts_with('%') && pattern.ends_with('%'));
            prop_assert_eq!(unescape(&pattern), search.trim().to_lowercase());
        }
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" Onion "), "%onion%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_unique_violation_ignores_other_errors() {
        assert!(!is_unique_violation(&DbErr::RecordNotFound("x".to_string())));
    }
}
