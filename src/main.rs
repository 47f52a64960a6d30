//! Prep Cache - cache admin server
//!
//! Composition root: builds the one store connector for the process, injects
//! it into the cache service, and serves the admin endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prep_cache::api::{create_router, AppState};
use prep_cache::{CacheConfig, CacheService, StoreConnector};

/// Main entry point for the cache admin server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the store connector and cache service
/// 4. Connect to the store (a failure leaves caching disabled, not fatal)
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prep_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Prep Cache admin server");

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: backend={:?}, store_configured={}, op_timeout={}ms, bulk_timeout={}ms, port={}",
        config.backend,
        config.redis_url.is_some(),
        config.op_timeout_ms,
        config.bulk_timeout_ms,
        config.server_port
    );

    let connector = Arc::new(StoreConnector::from_config(&config));
    let cache = CacheService::new(Arc::clone(&connector), &config);

    if cache.init().await {
        info!("Cache store ready");
    } else {
        warn!("Cache store unavailable, serving uncached");
    }

    let app = create_router(AppState::from_config(cache, &config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("admin server failed")?;

    connector.disconnect();
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
