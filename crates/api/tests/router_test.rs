//! Router tests that need no database: routing, authentication and health.
//!
//! The state carries a disconnected database, so any handler that reaches
//! the database answers 500.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use restaurantek_api::{AppState, create_router};
use restaurantek_shared::{JwtConfig, JwtService};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

fn test_state() -> AppState {
    AppState {
        db: Arc::new(DatabaseConnection::Disconnected),
        jwt_service: Arc::new(JwtService::new(JwtConfig::default())),
        recipe_extractor: None,
    }
}

fn app() -> (Router, AppState) {
    let state = test_state();
    (create_router(state.clone()), state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let (app, _) = app();
    let (status, body) = send(app, get("/api/v1/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "unavailable");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let (app, _) = app();
    let uri = format!("/api/v1/organizations/{}/outlets", Uuid::now_v7());
    let (status, body) = send(app, get(&uri, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_token");
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let (app, _) = app();
    let uri = format!("/api/v1/organizations/{}/usage", Uuid::now_v7());
    let (status, body) = send(app, get(&uri, Some("not.a.jwt"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let (app, state) = app();
    let refresh = state
        .jwt_service
        .generate_refresh_token(Uuid::now_v7(), Uuid::now_v7(), "owner")
        .unwrap();
    let uri = format!("/api/v1/organizations/{}", Uuid::now_v7());
    let (status, body) = send(app, get(&uri, Some(&refresh))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_valid_token_reaches_handler() {
    let (app, state) = app();
    let org_id = Uuid::now_v7();
    let token = state
        .jwt_service
        .generate_access_token(Uuid::now_v7(), org_id, "owner")
        .unwrap();
    let uri = format!("/api/v1/organizations/{org_id}/outlets/{}/recipes", Uuid::now_v7());
    let (status, body) = send(app, get(&uri, Some(&token))).await;

    // Past the middleware the membership lookup hits the disconnected database.
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert_eq!(body["message"], "An internal error occurred");
}

#[tokio::test]
async fn test_login_validates_before_database() {
    let (app, _) = app();
    let (status, body) = send(
        app,
        post_json("/api/v1/auth/login", r#"{"email": "not-an-email", "password": "x"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let (app, state) = app();
    let access = state
        .jwt_service
        .generate_access_token(Uuid::now_v7(), Uuid::now_v7(), "chef")
        .unwrap();
    let (status, body) = send(
        app,
        post_json(
            "/api/v1/auth/refresh",
            &format!(r#"{{"refresh_token": "{access}"}}"#),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _) = app();
    let (status, _) = send(app, get("/api/v1/invoices", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
