//! Subscription tier limits and monthly usage counters.
//!
//! Limits are read from `tier_limits` by the organization's tier; `NULL`
//! limits mean unlimited. Usage counters live in one `organization_usage` row
//! per organization and calendar month (UTC).

use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, Statement,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{
    organization_usage, organization_users, organizations, outlets, recipes,
    sea_orm_active_enums::SubscriptionTier, tier_limits,
};

/// Tier-gated features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Recipe document parsing.
    AiParser,
    /// Bulk price import.
    PriceImport,
}

/// Resources with a per-tier limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceLimit {
    /// Active outlets.
    Outlets,
    /// Organization members.
    Users,
    /// Recipes across all outlets.
    Recipes,
    /// Recipe parses this month.
    AiParsesPerMonth,
}

impl ResourceLimit {
    /// Human-readable resource name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Outlets => "outlets",
            Self::Users => "users",
            Self::Recipes => "recipes",
            Self::AiParsesPerMonth => "recipe parses this month",
        }
    }
}

/// Result of a limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitCheckResult {
    /// Whether one more is allowed.
    pub allowed: bool,
    /// Current usage.
    pub current: i64,
    /// Maximum (None = unlimited).
    pub limit: Option<i64>,
    /// Explanation when not allowed.
    pub message: Option<String>,
}

impl LimitCheckResult {
    fn evaluate(resource: ResourceLimit, current: i64, limit: Option<i64>) -> Self {
        let allowed = limit.is_none_or(|max| current < max);
        let message = (!allowed).then(|| {
            format!(
                "Limit reached: {current}/{} {} for your plan",
                limit.unwrap_or_default(),
                resource.label()
            )
        });
        Self {
            allowed,
            current,
            limit,
            message,
        }
    }
}

/// Usage against limits, as shown to organization admins.
#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    /// Current tier.
    pub tier: SubscriptionTier,
    /// Tier display name.
    pub tier_name: String,
    /// Month the counters belong to (`YYYY-MM`).
    pub year_month: String,
    /// One entry per limited resource.
    pub limits: Vec<ResourceUsage>,
    /// Price imports this month.
    pub price_import_count: i32,
    /// Whether recipe parsing is available.
    pub has_ai_parser: bool,
    /// Whether price import is available.
    pub has_price_import: bool,
}

/// Usage of one resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceUsage {
    /// Resource.
    pub resource: ResourceLimit,
    /// Current usage.
    pub current: i64,
    /// Maximum (None = unlimited).
    pub limit: Option<i64>,
}

/// `YYYY-MM` of a date.
#[must_use]
pub fn year_month(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

const INCREMENT_AI_PARSE_SQL: &str = r"
INSERT INTO organization_usage (id, organization_id, year_month, ai_parse_count, price_import_count)
VALUES ($1, $2, $3, 1, 0)
ON CONFLICT (organization_id, year_month)
DO UPDATE SET ai_parse_count = organization_usage.ai_parse_count + 1
";

const INCREMENT_PRICE_IMPORT_SQL: &str = r"
INSERT INTO organization_usage (id, organization_id, year_month, ai_parse_count, price_import_count)
VALUES ($1, $2, $3, 0, 1)
ON CONFLICT (organization_id, year_month)
DO UPDATE SET price_import_count = organization_usage.price_import_count + 1
";

const ENSURE_USAGE_SQL: &str = r"
INSERT INTO organization_usage (id, organization_id, year_month, ai_parse_count, price_import_count)
VALUES ($1, $2, $3, 0, 0)
ON CONFLICT (organization_id, year_month) DO NOTHING
";

/// Repository for subscription and tier operations.
pub struct SubscriptionRepository;

impl SubscriptionRepository {
    /// Get tier limits for a specific tier.
    pub async fn get_tier_limits(
        db: &DatabaseConnection,
        tier: SubscriptionTier,
    ) -> Result<Option<tier_limits::Model>, DbErr> {
        tier_limits::Entity::find_by_id(tier).one(db).await
    }

    /// Whether an organization's tier includes a feature.
    ///
    /// Organizations whose subscription is past due or cancelled have no
    /// features.
    pub async fn has_feature(
        db: &DatabaseConnection,
        organization_id: Uuid,
        feature: Feature,
    ) -> Result<bool, DbErr> {
        let Some(org) = organizations::Entity::find_by_id(organization_id)
            .one(db)
            .await?
        else {
            return Ok(false);
        };
        if !org.subscription_status.is_usable() {
            return Ok(false);
        }

        let Some(limits) = Self::get_tier_limits(db, org.subscription_tier).await? else {
            return Ok(false);
        };

        Ok(match feature {
            Feature::AiParser => limits.has_ai_parser,
            Feature::PriceImport => limits.has_price_import,
        })
    }

    /// Whether an organization may add one more of `resource`.
    pub async fn check_limit(
        db: &DatabaseConnection,
        organization_id: Uuid,
        resource: ResourceLimit,
    ) -> Result<LimitCheckResult, DbErr> {
        let Some(org) = organizations::Entity::find_by_id(organization_id)
            .one(db)
            .await?
        else {
            return Ok(LimitCheckResult {
                allowed: false,
                current: 0,
                limit: None,
                message: Some("Organization not found".to_string()),
            });
        };

        let Some(limits) = Self::get_tier_limits(db, org.subscription_tier).await? else {
            return Ok(LimitCheckResult {
                allowed: false,
                current: 0,
                limit: None,
                message: Some("Tier limits not configured".to_string()),
            });
        };

        let current = Self::current_usage(db, organization_id, resource).await?;
        Ok(LimitCheckResult::evaluate(
            resource,
            current,
            limit_for(&limits, resource),
        ))
    }

    /// Get or create the usage row for the current month.
    pub async fn get_or_create_current_usage(
        db: &DatabaseConnection,
        organization_id: Uuid,
    ) -> Result<organization_usage::Model, DbErr> {
        let month = year_month(Utc::now().date_naive());
        db.execute(usage_statement(ENSURE_USAGE_SQL, organization_id, &month))
            .await?;

        organization_usage::Entity::find()
            .filter(organization_usage::Column::OrganizationId.eq(organization_id))
            .filter(organization_usage::Column::YearMonth.eq(&month))
            .one(db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("usage for {organization_id} {month}")))
    }

    /// Adds one recipe parse to the current month.
    pub async fn increment_ai_parse_count(
        db: &DatabaseConnection,
        organization_id: Uuid,
    ) -> Result<(), DbErr> {
        let month = year_month(Utc::now().date_naive());
        db.execute(usage_statement(INCREMENT_AI_PARSE_SQL, organization_id, &month))
            .await?;
        Ok(())
    }

    /// Adds one price import to the current month.
    pub async fn increment_price_import_count(
        db: &DatabaseConnection,
        organization_id: Uuid,
    ) -> Result<(), DbErr> {
        let month = year_month(Utc::now().date_naive());
        db.execute(usage_statement(
            INCREMENT_PRICE_IMPORT_SQL,
            organization_id,
            &month,
        ))
        .await?;
        Ok(())
    }

    /// Usage of every limited resource against the organization's tier.
    pub async fn usage_summary(
        db: &DatabaseConnection,
        organization_id: Uuid,
    ) -> Result<Option<UsageSummary>, DbErr> {
        let Some(org) = organizations::Entity::find_by_id(organization_id)
            .one(db)
            .await?
        else {
            return Ok(None);
        };
        let Some(limits) = Self::get_tier_limits(db, org.subscription_tier).await? else {
            return Ok(None);
        };
        let usage = Self::get_or_create_current_usage(db, organization_id).await?;

        let resources = [
            ResourceLimit::Outlets,
            ResourceLimit::Users,
            ResourceLimit::Recipes,
            ResourceLimit::AiParsesPerMonth,
        ];
        let mut entries = Vec::with_capacity(resources.len());
        for resource in resources {
            let current = if resource == ResourceLimit::AiParsesPerMonth {
                i64::from(usage.ai_parse_count)
            } else {
                Self::current_usage(db, organization_id, resource).await?
            };
            entries.push(ResourceUsage {
                resource,
                current,
                limit: limit_for(&limits, resource),
            });
        }

        Ok(Some(UsageSummary {
            tier: limits.tier,
            tier_name: limits.display_name,
            year_month: usage.year_month,
            limits: entries,
            price_import_count: usage.price_import_count,
            has_ai_parser: limits.has_ai_parser,
            has_price_import: limits.has_price_import,
        }))
    }

    async fn current_usage(
        db: &DatabaseConnection,
        organization_id: Uuid,
        resource: ResourceLimit,
    ) -> Result<i64, DbErr> {
        let count = match resource {
            ResourceLimit::Outlets => {
                outlets::Entity::find()
                    .filter(outlets::Column::OrganizationId.eq(organization_id))
                    .filter(outlets::Column::IsActive.eq(true))
                    .count(db)
                    .await?
            }
            ResourceLimit::Users => {
                organization_users::Entity::find()
                    .filter(organization_users::Column::OrganizationId.eq(organization_id))
                    .count(db)
                    .await?
            }
            ResourceLimit::Recipes => {
                recipes::Entity::find()
                    .filter(recipes::Column::OrganizationId.eq(organization_id))
                    .count(db)
                    .await?
            }
            ResourceLimit::AiParsesPerMonth => {
                let usage = Self::get_or_create_current_usage(db, organization_id).await?;
                return Ok(i64::from(usage.ai_parse_count));
            }
        };
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

fn limit_for(limits: &tier_limits::Model, resource: ResourceLimit) -> Option<i64> {
    match resource {
        ResourceLimit::Outlets => limits.max_outlets,
        ResourceLimit::Users => limits.max_users,
        ResourceLimit::Recipes => limits.max_recipes,
        ResourceLimit::AiParsesPerMonth => limits.max_ai_parses_per_month,
    }
    .map(i64::from)
}

fn usage_statement(sql: &str, organization_id: Uuid, month: &str) -> Statement {
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        sql,
        [
            Uuid::now_v7().into(),
            organization_id.into(),
            month.to_string().into(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(year_month(date), "2025-03");
    }

    #[test]
    fn test_limit_allows_below_max() {
        let result = LimitCheckResult::evaluate(ResourceLimit::Outlets, 0, Some(1));
        assert!(result.allowed);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_limit_blocks_at_max() {
        let result = LimitCheckResult::evaluate(ResourceLimit::Recipes, 50, Some(50));
        assert!(!result.allowed);
        assert_eq!(
            result.message.as_deref(),
            Some("Limit reached: 50/50 recipes for your plan")
        );
    }

    #[test]
    fn test_unlimited_always_allows() {
        let result = LimitCheckResult::evaluate(ResourceLimit::Users, 10_000, None);
        assert!(result.allowed);
        assert_eq!(result.limit, None);
    }
}
