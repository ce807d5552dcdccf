//! kvstash - HTTP front end for a pseudo-URL addressed store
//!
//! Serves one store (optionally behind a TTL cache) over a small REST API.

use std::net::SocketAddr;

use anyhow::Context;
use serde_json::Value;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kvstash::{create_router, AppState, Config};

/// Main entry point for the kvstash server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the configured store, fronted by a TTL cache if enabled
/// 4. Create Axum router with all endpoints
/// 5. Start HTTP server on configured port
/// 6. On SIGINT/SIGTERM, stop serving and flush the store
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kvstash=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting kvstash server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: store_url={}, cache_enabled={}, timeout={}s, max_entries={}, port={}",
        config.store_url,
        config.cache_enabled,
        config.cache_timeout,
        config.cache_max_entries,
        config.server_port
    );

    let state = AppState::from_config(&config)
        .with_context(|| format!("failed to open store at {}", config.store_url))?;
    info!("Store opened");

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let store = state.store.clone();
    match tokio::task::spawn_blocking(move || store.flush::<Value>()).await {
        Ok(Ok(())) => info!("Store flushed"),
        Ok(Err(e)) => warn!("Store flush failed: {}", e),
        Err(e) => error!("Store flush task failed: {}", e),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
