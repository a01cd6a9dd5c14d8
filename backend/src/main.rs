mod api;
mod config;
mod db;
mod errors;
mod models;
mod registry;
mod state;

use crate::config::Config;
use crate::errors::StartupError;
use crate::state::AppState;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();

    // Store local state under backend/data (ignored by git).
    std::fs::create_dir_all(&config.data_dir).map_err(|e| StartupError::Io(e.to_string()))?;

    let db = db::connect(&config.db_url()).await?;
    db::init_schema(&db).await?;

    let keys = state::load_key_material(config.keys_dir(), config.dev_setup).await?;
    tracing::info!(
        circuit_digest = %keys.digest(),
        constraints = keys.circuit().num_constraints(),
        "key material ready"
    );

    let state = AppState::new(db, keys, &config.api_key);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .map_err(|e| StartupError::Io(format!("bind {}: {e}", config.addr)))?;

    tracing::info!(addr = %config.addr, "backend listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Io(e.to_string()))?;

    tracing::info!("backend stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
