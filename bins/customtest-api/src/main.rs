mod auth;
mod error;
mod form;
mod handlers;
mod judge0;
mod language_config;
mod metrics;
mod routes;

use anyhow::Context;
use axum::Router;
use customtest_common::config::Config;
use customtest_common::store::{RedisStore, Store};
use judge0::{ExecutionService, Judge0Client};
use language_config::LanguageRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub judge: Arc<dyn ExecutionService>,
    pub languages: LanguageRegistry,
    pub config: Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_target(false)
        .init();

    info!("Custom test API booting...");

    let config = Config::from_env();

    let languages = LanguageRegistry::load_from_file(&config.languages_config)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Make sure {} exists", config.languages_config))?;

    info!(count = languages.all().len(), "Loaded language configurations");
    if !languages.is_enabled(&config.default_language) {
        warn!(
            default_language = %config.default_language,
            "Default language is not configured; the form will preselect nothing valid"
        );
    }

    let store = RedisStore::connect(&config.redis_url)
        .await
        .context("Failed to connect to Redis")?;

    info!("Connected to Redis: {}", config.redis_url);

    if config.judge0_auth_token.is_none() {
        warn!("JUDGE0_AUTH_TOKEN not set, calling Judge0 without credentials");
    }
    let judge = Judge0Client::new(
        config.judge0_api_url.clone(),
        config.judge0_auth_token.clone(),
        Duration::from_secs(config.judge0_timeout_seconds),
    )
    .context("Failed to build Judge0 client")?;

    info!("Judge0 endpoint: {}", config.judge0_api_url);

    let addr = config.bind_addr.clone();
    let state = Arc::new(AppState {
        store: Arc::new(store),
        judge: Arc::new(judge),
        languages,
        config,
    });

    // Build router
    let app = Router::new()
        .merge(routes::routes())
        .with_state(state);

    // Start server
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
