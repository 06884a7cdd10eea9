//! Serve command - Starts the HTTP server.

use std::sync::Arc;

use tokio::signal;

use super::Backend;
use crate::api::{create_router, AppState};
use crate::auth::{KeyMaterial, TokenAuthority};
use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::FsProfileStore;
use crate::secrets;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: Config) -> AppResult<()> {
    tracing::info!("Starting server...");

    // Keys load before storage is touched
    let source = secrets::from_config(&config).await?;
    let keys = KeyMaterial::load(
        source.as_ref(),
        &config.private_key_secret_path,
        &config.public_key_secret_path,
    )
    .await?;
    let tokens = TokenAuthority::new(keys);

    let backend = Backend::from_config(&config).await?;
    let applied = backend.migrations(&config).up().await?;
    tracing::info!(count = applied.len(), "Storage is up to date");

    let profiles = Arc::new(FsProfileStore::new(&config.profile_storage_dir));
    let app_state = AppState::new(backend.users, profiles, tokens);

    // Build router
    let app = create_router(app_state);

    // Start server
    let addr = format!("{}:{}", args.host, args.port);
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

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
