mod config;
mod routes;
mod state;

use std::sync::Arc;

use portal::api::ApiError;

use crate::config::ServerConfig;
use crate::state::{AppState, PocketBaseSource};

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("backend client error: {0}")]
    Backend(#[from] ApiError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env()?;
    let source = PocketBaseSource::new(&config.base_url, &config.users_collection, config.timeouts)?;
    let state = AppState::new(Arc::new(source));

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!(port = config.port, base_url = %config.base_url, "portal server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
