//! Authentication and authorization rules.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - Password verification
//! - Organization roles and what each role may do

mod password;

pub use password::{
    MIN_PASSWORD_LENGTH, PasswordError, hash_password, verify_against_dummy, verify_password,
};

use serde::{Deserialize, Serialize};

/// Roles within an organization, from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full access, billing and ownership.
    Owner,
    /// Full access except owner management.
    Admin,
    /// Manages the shared product catalog and distributors.
    Manager,
    /// Maintains products, prices and recipes in assigned outlets.
    Chef,
    /// Read-only access to assigned outlets.
    Viewer,
}

impl UserRole {
    /// All roles, most privileged first.
    pub const ALL: [Self; 5] = [
        Self::Owner,
        Self::Admin,
        Self::Manager,
        Self::Chef,
        Self::Viewer,
    ];

    /// Privilege level (higher = more privileges).
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Owner => 100,
            Self::Admin => 80,
            Self::Manager => 60,
            Self::Chef => 40,
            Self::Viewer => 20,
        }
    }

    /// Returns true if this role is at least as privileged as `other`.
    #[must_use]
    pub const fn at_least(self, other: Self) -> bool {
        self.level() >= other.level()
    }

    /// Parses a role from its lowercase name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "chef" => Some(Self::Chef),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// Owners and admins see every outlet; other roles only their assigned outlets.
    #[must_use]
    pub const fn sees_all_outlets(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    /// Returns true if this role can add, remove and re-role members and manage outlets.
    #[must_use]
    pub const fn can_manage_members(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    /// Returns true if this role can edit the organization-wide catalog and distributors.
    #[must_use]
    pub const fn can_manage_catalog(self) -> bool {
        matches!(self, Self::Owner | Self::Admin | Self::Manager)
    }

    /// Returns true if this role can write products, prices and recipes in an accessible outlet.
    #[must_use]
    pub const fn can_edit_outlet_data(self) -> bool {
        !matches!(self, Self::Viewer)
    }

    /// Returns true if a member with this role may grant `target` to someone.
    ///
    /// Only owners hand out ownership; admins can grant anything up to admin.
    #[must_use]
    pub const fn can_assign_role(self, target: Self) -> bool {
        match self {
            Self::Owner => true,
            Self::Admin => !matches!(target, Self::Owner),
            _ => false,
        }
    }

    /// Lowercase name as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Chef => "chef",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_levels_are_strictly_ordered() {
        for pair in UserRole::ALL.windows(2) {
            assert!(pair[0].level() > pair[1].level());
        }
    }

    #[test]
    fn test_role_parse_roundtrip() {
        for role in UserRole::ALL {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
            assert_eq!(UserRole::parse(&role.to_string().to_uppercase()), Some(role));
        }
        assert_eq!(UserRole::parse("accountant"), None);
    }

    #[test]
    fn test_role_permissions() {
        assert!(UserRole::Owner.sees_all_outlets());
        assert!(UserRole::Admin.sees_all_outlets());
        assert!(!UserRole::Manager.sees_all_outlets());

        assert!(UserRole::Manager.can_manage_catalog());
        assert!(!UserRole::Chef.can_manage_catalog());

        assert!(UserRole::Chef.can_edit_outlet_data());
        assert!(!UserRole::Viewer.can_edit_outlet_data());

        assert!(UserRole::Admin.can_manage_members());
        assert!(!UserRole::Manager.can_manage_members());
    }

    #[test]
    fn test_role_assignment_rules() {
        assert!(UserRole::Owner.can_assign_role(UserRole::Owner));
        assert!(!UserRole::Admin.can_assign_role(UserRole::Owner));
        assert!(UserRole::Admin.can_assign_role(UserRole::Admin));
        assert!(UserRole::Admin.can_assign_role(UserRole::Chef));
        assert!(!UserRole::Manager.can_assign_role(UserRole::Viewer));
    }

    #[test]
    fn test_at_least() {
        assert!(UserRole::Owner.at_least(UserRole::Admin));
        assert!(UserRole::Chef.at_least(UserRole::Chef));
        assert!(!UserRole::Viewer.at_least(UserRole::Chef));
    }
}
