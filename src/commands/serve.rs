//! Serve command - Starts the HTTP server.

use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{Cache, CacheStore, Database, Persistence, TransactionManager};
use crate::services::{ServiceOptions, Services};

/// Execute the serve command
pub async fn execute(args: ServeArgs, mut config: Config) -> AppResult<()> {
    tracing::info!("Starting server...");

    if let Some(host) = args.host {
        config.server_host = host;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }

    // Connect and apply migrations
    let db = Arc::new(Database::connect(&config).await?);

    // The cache is optional: without Redis every read goes to the store
    let cache: Option<Arc<dyn CacheStore>> = Cache::connect_optional(&config)
        .await
        .map(|cache| Arc::new(cache) as Arc<dyn CacheStore>);

    let manager: Arc<dyn TransactionManager> = Arc::new(Persistence::new(
        db.shared_connection(),
        config.repository_backend,
    ));
    tracing::info!(backend = ?config.repository_backend, "Repositories ready");

    let services = Services::build(manager, cache.clone(), ServiceOptions::from(&config));
    let app_state = AppState::from_container(&services, Some(db), cache);

    // Build router
    let app = create_router(app_state);

    // Start server
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
