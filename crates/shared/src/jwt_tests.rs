//! Unit tests for JWT functionality.

use crate::auth::{Claims, TokenType};
use crate::jwt::{JwtConfig, JwtError, JwtService};
use chrono::{Duration, Utc};
use uuid::Uuid;

fn create_test_service() -> JwtService {
    JwtService::new(JwtConfig {
        secret: "test-secret-key-for-testing".to_string(),
        access_token_expires_minutes: 15,
        refresh_token_expires_days: 7,
    })
}

#[test]
fn test_claims_new_sets_correct_fields() {
    let user_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::hours(1);

    let claims = Claims::new(user_id, org_id, "chef", expires_at);

    assert_eq!(claims.user_id(), user_id);
    assert_eq!(claims.organization_id(), org_id);
    assert_eq!(claims.role, "chef");
    assert!(claims.iat <= Utc::now().timestamp());
    assert_eq!(claims.exp, expires_at.timestamp());
    assert_eq!(claims.token_type, TokenType::Access);
}

#[test]
fn test_access_token_roundtrip() {
    let service = create_test_service();
    let user_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();

    let token = service
        .generate_access_token(user_id, org_id, "manager")
        .unwrap();
    let claims = service.validate_access_token(&token).unwrap();

    assert_eq!(claims.user_id(), user_id);
    assert_eq!(claims.organization_id(), org_id);
    assert_eq!(claims.role, "manager");
}

#[test]
fn test_refresh_token_is_not_an_access_token() {
    let service = create_test_service();
    let token = service
        .generate_refresh_token(Uuid::new_v4(), Uuid::new_v4(), "owner")
        .unwrap();

    assert!(matches!(
        service.validate_access_token(&token),
        Err(JwtError::WrongTokenType)
    ));
    assert!(service.validate_refresh_token(&token).is_ok());
}

#[test]
fn test_access_token_cannot_refresh() {
    let service = create_test_service();
    let token = service
        .generate_access_token(Uuid::new_v4(), Uuid::new_v4(), "owner")
        .unwrap();

    assert!(matches!(
        service.validate_refresh_token(&token),
        Err(JwtError::WrongTokenType)
    ));
}

#[test]
fn test_expired_token() {
    let service = JwtService::new(JwtConfig {
        secret: "test-secret-key-for-testing".to_string(),
        access_token_expires_minutes: -10,
        refresh_token_expires_days: 7,
    });
    let token = service
        .generate_access_token(Uuid::new_v4(), Uuid::new_v4(), "viewer")
        .unwrap();

    assert!(matches!(
        service.validate_token(&token),
        Err(JwtError::Expired)
    ));
}

#[test]
fn test_token_signed_with_other_secret_rejected() {
    let service = create_test_service();
    let other = JwtService::new(JwtConfig {
        secret: "another-secret".to_string(),
        ..JwtConfig::default()
    });
    let token = other
        .generate_access_token(Uuid::new_v4(), Uuid::new_v4(), "viewer")
        .unwrap();

    assert!(matches!(
        service.validate_token(&token),
        Err(JwtError::DecodingError(_))
    ));
}

#[test]
fn test_invalid_token() {
    let service = create_test_service();
    assert!(service.validate_token("invalid.token.here").is_err());
}

#[test]
fn test_config_conversion_from_seconds() {
    let app = crate::config::JwtConfig {
        secret: "s".to_string(),
        access_token_expiry_secs: 900,
        refresh_token_expiry_secs: 604_800,
    };
    let config = JwtConfig::from(&app);
    assert_eq!(config.access_token_expires_minutes, 15);
    assert_eq!(config.refresh_token_expires_days, 7);

    let service = JwtService::new(config);
    assert_eq!(service.access_token_expires_in(), 900);
    assert_eq!(service.refresh_token_expires_days(), 7);
}
