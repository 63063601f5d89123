//! Postgres enum types.

use restaurantek_core::auth::UserRole as Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a user inside an organization (`user_role`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[sea_orm(string_value = "owner")]
    Owner,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "chef")]
    Chef,
    #[sea_orm(string_value = "viewer")]
    Viewer,
}

impl From<UserRole> for Role {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Owner => Self::Owner,
            UserRole::Admin => Self::Admin,
            UserRole::Manager => Self::Manager,
            UserRole::Chef => Self::Chef,
            UserRole::Viewer => Self::Viewer,
        }
    }
}

impl From<Role> for UserRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Owner => Self::Owner,
            Role::Admin => Self::Admin,
            Role::Manager => Self::Manager,
            Role::Chef => Self::Chef,
            Role::Viewer => Self::Viewer,
        }
    }
}

/// Subscription plan (`subscription_tier`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "subscription_tier")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[sea_orm(string_value = "free")]
    Free,
    #[sea_orm(string_value = "pro")]
    Pro,
    #[sea_orm(string_value = "enterprise")]
    Enterprise,
}

impl SubscriptionTier {
    /// Lowercase code as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }
}

/// Billing state of an organization (`subscription_status`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "subscription_status")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[sea_orm(string_value = "trialing")]
    Trialing,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "past_due")]
    PastDue,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl SubscriptionStatus {
    /// Lowercase code as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether paid features may be used in this state.
    #[must_use]
    pub const fn is_usable(self) -> bool {
        matches!(self, Self::Trialing | Self::Active)
    }
}

/// How a price record entered the system (`price_source`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "price_source")]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    #[sea_orm(string_value = "manual")]
    Manual,
    #[sea_orm(string_value = "import")]
    Import,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_conversion_round_trips() {
        for role in Role::ALL {
            let db_role = UserRole::from(role);
            assert_eq!(Role::from(db_role), role);
        }
    }

    #[test]
    fn test_usable_statuses() {
        assert!(SubscriptionStatus::Trialing.is_usable());
        assert!(SubscriptionStatus::Active.is_usable());
        assert!(!SubscriptionStatus::PastDue.is_usable());
        assert!(!SubscriptionStatus::Cancelled.is_usable());
    }
}
