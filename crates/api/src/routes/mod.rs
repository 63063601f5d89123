//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

pub mod auth;
pub mod common;
pub mod common_products;
pub mod distributors;
pub mod health;
pub mod organizations;
pub mod outlets;
pub mod prices;
pub mod products;
pub mod recipes;
pub mod users;

/// Creates the API router: health and auth are public, everything else
/// goes through the bearer-token middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(organizations::routes())
        .merge(users::routes())
        .merge(outlets::routes())
        .merge(common_products::routes())
        .merge(distributors::routes())
        .merge(products::routes())
        .merge(prices::routes())
        .merge(recipes::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(protected_routes)
}
