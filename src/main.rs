//! Taskflow Guard server
//!
//! Serves the cache API behind per-route rate limiting.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::{signal, task::JoinHandle};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskflow_guard::{
    create_router, spawn_cleanup_task, AppState, Config, MemoryStore, RedisStore, StoreBackend,
    StoreConnection,
};

/// Main entry point for the Taskflow Guard server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the store connection (Redis, or in-process memory)
/// 4. Start the TTL cleanup task when running on the memory store
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskflow_guard=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Taskflow Guard");

    let config = Config::from_env();
    info!(
        "Configuration loaded: backend={:?}, env={}, limit={}/{}ms, default_ttl={}s, port={}",
        config.store_backend,
        config.environment,
        config.rate_limit_limit,
        config.rate_limit_window_ms,
        config.cache_default_ttl,
        config.server_port
    );

    let (store, cleanup_handle) = open_store(&config)?;
    info!(backend = store.backend_name(), "Store connection ready");

    let state = AppState::from_config(&config, store);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(cleanup_handle))
    .await
    .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Opens the configured backend. The memory store also gets a cleanup task.
fn open_store(config: &Config) -> anyhow::Result<(StoreConnection, Option<JoinHandle<()>>)> {
    match config.store_backend {
        StoreBackend::Redis => {
            let redis = RedisStore::new(&config.store_host, config.store_port)
                .context("invalid store address")?;
            Ok((
                StoreConnection::with_timeout(redis, config.store_timeout()),
                None,
            ))
        }
        StoreBackend::Memory => {
            let memory = MemoryStore::new();
            let handle = spawn_cleanup_task(memory.clone(), config.cleanup_interval);
            info!("Background cleanup task started");
            Ok((
                StoreConnection::with_timeout(memory, config.store_timeout()),
                Some(handle),
            ))
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Cleanup task aborted");
    }
}
