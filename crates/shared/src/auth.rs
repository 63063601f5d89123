//! Authentication types for JWT and tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// Organization ID (current context).
    pub org: Uuid,
    /// User's role in the organization.
    pub role: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
    /// Token purpose, so refresh tokens cannot be used as access tokens and vice versa.
    #[serde(default)]
    pub token_type: TokenType,
}

/// Purpose of a signed token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived API access token.
    #[default]
    Access,
    /// Long-lived token exchanged for new access tokens.
    Refresh,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(user_id: Uuid, org_id: Uuid, role: &str, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            org: org_id,
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            token_type: TokenType::Access,
        }
    }

    /// Marks the claims as belonging to a refresh token.
    #[must_use]
    pub fn into_refresh(mut self) -> Self {
        self.token_type = TokenType::Refresh;
        self
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the organization ID from claims.
    #[must_use]
    pub const fn organization_id(&self) -> Uuid {
        self.org
    }
}

/// Login request payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// User email.
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    /// User password.
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

/// Registration request payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// User email.
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    /// User password.
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    /// User full name.
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub full_name: String,
}

/// Login response payload.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Authenticated user info.
    pub user: UserInfo,
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Token expiration in seconds.
    pub expires_in: i64,
}

/// User info returned in auth responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    /// User ID.
    pub id: Uuid,
    /// User email.
    pub email: String,
    /// User full name.
    pub full_name: String,
    /// Organizations the user belongs to.
    pub organizations: Vec<UserOrganization>,
}

/// Organization info for a user.
#[derive(Debug, Clone, Serialize)]
pub struct UserOrganization {
    /// Organization ID.
    pub id: Uuid,
    /// Organization name.
    pub name: String,
    /// Organization slug.
    pub slug: String,
    /// User's role in this organization.
    pub role: String,
}

/// Refresh token request.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    /// The refresh token.
    pub refresh_token: String,
}

/// Create organization request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    /// Organization name.
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: String,
    /// Organization slug (URL-friendly).
    #[validate(length(min = 2, max = 100, message = "must be 2-100 characters"))]
    pub slug: String,
    /// Currency prices are recorded in (ISO 4217 code).
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "must be a 3-letter ISO code"))]
    pub currency: String,
    /// Timezone (IANA format), used to resolve "today" for price lookups.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Update organization request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateOrganizationRequest {
    /// Organization name (optional).
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: Option<String>,
    /// Currency (optional, ISO 4217 code).
    #[validate(length(equal = 3, message = "must be a 3-letter ISO code"))]
    pub currency: Option<String>,
    /// Timezone (optional, IANA format).
    pub timezone: Option<String>,
}

/// Add user to organization request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddUserRequest {
    /// Email of an already registered user.
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    /// Role to assign.
    pub role: String,
    /// Outlets to assign immediately (ignored for owner/admin, who see all outlets).
    #[serde(default)]
    pub outlet_ids: Vec<Uuid>,
}

/// Update organization member request.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMemberRequest {
    /// New role.
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            email: "chef@example.com".into(),
            password: "long-enough".into(),
            full_name: "Chef".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            email: "not-an-email".into(),
            password: "short".into(),
            full_name: String::new(),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("full_name"));
    }

    #[test]
    fn test_create_organization_defaults() {
        let req: CreateOrganizationRequest =
            serde_json::from_str(r#"{"name": "Bistro", "slug": "bistro"}"#).unwrap();
        assert_eq!(req.currency, "USD");
        assert_eq!(req.timezone, "UTC");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_add_user_request_outlets_default_empty() {
        let req: AddUserRequest =
            serde_json::from_str(r#"{"email": "line@example.com", "role": "chef"}"#).unwrap();
        assert!(req.outlet_ids.is_empty());
    }
}
