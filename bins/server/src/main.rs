//! RestauranTek API Server
//!
//! Main entry point for the RestauranTek backend service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use restaurantek_api::{AppState, create_router};
use restaurantek_core::parser::{LlmRecipeExtractor, RecipeExtractor};
use restaurantek_db::connect;
use restaurantek_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restaurantek=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .context("Failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));

    let recipe_extractor: Option<Arc<dyn RecipeExtractor>> = match &config.llm {
        Some(llm) => {
            let extractor =
                LlmRecipeExtractor::new(llm).context("Failed to build recipe parser client")?;
            info!(model = %llm.model, "Recipe parser configured");
            Some(Arc::new(extractor))
        }
        None => {
            warn!("No llm section configured, recipe parsing is disabled");
            None
        }
    };

    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        recipe_extractor,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
