//! Authentication routes for login, register, and token refresh.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde_json::json;
use tracing::info;

use super::common::{ApiResult, created, internal_error, json_error, ok, validate};
use crate::AppState;
use restaurantek_core::auth::{
    UserRole as Role, hash_password, verify_against_dummy, verify_password,
};
use restaurantek_db::{OrganizationRepository, UserRepository};
use restaurantek_shared::{
    JwtError,
    auth::{
        LoginRequest, LoginResponse, RefreshRequest, RegisterRequest, UserInfo, UserOrganization,
    },
};

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
}

fn invalid_credentials() -> axum::response::Response {
    json_error(
        StatusCode::UNAUTHORIZED,
        "invalid_credentials",
        "Invalid email or password",
    )
}

/// POST /auth/login - Authenticate user and return tokens for their default organization.
async fn login(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> ApiResult {
    validate(&payload)?;
    let user_repo = UserRepository::new((*state.db).clone());

    let user = match user_repo.find_by_email(&payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            // Same cost as a real check so timing does not reveal registered emails.
            verify_against_dummy(&payload.password);
            info!("Login attempt for unknown email");
            return Err(invalid_credentials());
        }
        Err(e) => return Err(internal_error("Database error during login", &e)),
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            info!(user_id = %user.id, "Failed login attempt - invalid password");
            return Err(invalid_credentials());
        }
        Err(e) => return Err(internal_error("Password verification error", &e)),
    }

    if !user.is_active {
        return Err(json_error(
            StatusCode::UNAUTHORIZED,
            "account_disabled",
            "This account has been disabled",
        ));
    }

    let orgs = user_repo
        .get_user_organizations(user.id)
        .await
        .map_err(|e| internal_error("Failed to get user organizations", &e))?;

    let Some((default_org, default_membership)) = orgs.first() else {
        return Err(json_error(
            StatusCode::FORBIDDEN,
            "no_organization",
            "User is not a member of any organization",
        ));
    };

    let role = Role::from(default_membership.role).as_str();
    let access_token = state
        .jwt_service
        .generate_access_token(user.id, default_org.id, role)
        .map_err(|e| internal_error("Failed to generate access token", &e))?;
    let refresh_token = state
        .jwt_service
        .generate_refresh_token(user.id, default_org.id, role)
        .map_err(|e| internal_error("Failed to generate refresh token", &e))?;

    info!(user_id = %user.id, org_id = %default_org.id, "User logged in");

    ok(LoginResponse {
        user: UserInfo {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            organizations: orgs
                .iter()
                .map(|(org, membership)| UserOrganization {
                    id: org.id,
                    name: org.name.clone(),
                    slug: org.slug.clone(),
                    role: Role::from(membership.role).as_str().to_string(),
                })
                .collect(),
        },
        access_token,
        refresh_token,
        expires_in: state.jwt_service.access_token_expires_in(),
    })
}

/// POST /auth/register - Register a new user.
///
/// No tokens are issued; the user creates or joins an organization first.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult {
    validate(&payload)?;
    let user_repo = UserRepository::new((*state.db).clone());

    match user_repo.email_exists(&payload.email).await {
        Ok(true) => {
            return Err(json_error(
                StatusCode::CONFLICT,
                "email_exists",
                "An account with this email already exists",
            ));
        }
        Ok(false) => {}
        Err(e) => return Err(internal_error("Database error checking email", &e)),
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| internal_error("Failed to hash password", &e))?;

    let user = user_repo
        .create(&payload.email, &password_hash, &payload.full_name)
        .await
        .map_err(|e| internal_error("Failed to create user", &e))?;

    info!(user_id = %user.id, "New user registered");

    created(json!({
        "user": {
            "id": user.id,
            "email": user.email,
            "full_name": user.full_name
        },
        "message": "Registration successful. Please create or join an organization."
    }))
}

/// POST /auth/refresh - Issue a new access token from a refresh token.
///
/// The role is re-read from the membership so demotions take effect on refresh.
async fn refresh(State(state): State<AppState>, Json(payload): Json<RefreshRequest>) -> ApiResult {
    let claims = state
        .jwt_service
        .validate_refresh_token(&payload.refresh_token)
        .map_err(|e| {
            let (code, message) = match e {
                JwtError::Expired => ("token_expired", "Refresh token has expired"),
                _ => ("invalid_token", "Invalid refresh token"),
            };
            json_error(StatusCode::UNAUTHORIZED, code, message)
        })?;

    let org_repo = OrganizationRepository::new((*state.db).clone());
    let membership = org_repo
        .get_user_membership(claims.organization_id(), claims.user_id())
        .await
        .map_err(|e| internal_error("Failed to load membership", &e))?
        .ok_or_else(|| {
            json_error(
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Membership no longer exists",
            )
        })?;

    let access_token = state
        .jwt_service
        .generate_access_token(
            claims.user_id(),
            claims.organization_id(),
            Role::from(membership.role).as_str(),
        )
        .map_err(|e| internal_error("Failed to generate access token", &e))?;

    ok(json!({
        "access_token": access_token,
        "expires_in": state.jwt_service.access_token_expires_in()
    }))
}
