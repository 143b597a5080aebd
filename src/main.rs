//! Agent Resilience - cache and recovery status server
//!
//! Serves cache and recovery statistics over HTTP while keeping the cache
//! swept and persisted in the background.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_resilience::api::create_router;
use agent_resilience::cache::load_warmup_items;
use agent_resilience::{spawn_cleanup_task, spawn_persist_task, AppState, Config};

/// Main entry point for the status server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create cache store and recovery engine, restore the persisted cache
/// 4. Apply the warmup file, if configured
/// 5. Start background cleanup and persistence tasks
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM, persisting once more
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_resilience=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Agent Resilience server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_size={} bytes, max_retries={}, port={}, cleanup_interval={:?}",
        config.cache.max_size,
        config.recovery.max_retries,
        config.server_port,
        config.cache.cleanup_interval
    );

    let state = AppState::from_config(&config).await;
    {
        let mut cache = state.cache.write().await;
        cache.load().await;

        if let Some(path) = &config.cache.warmup_path {
            match load_warmup_items(path).await {
                Ok(items) => {
                    cache.warmup(&items);
                }
                Err(e) => warn!("Skipping cache warmup from {}: {}", path.display(), e),
            }
        }
    }
    info!("Cache store and recovery engine initialized");

    let mut background = vec![spawn_cleanup_task(
        state.cache.clone(),
        config.cache.cleanup_interval,
    )];
    if config.cache.auto_persist {
        background.push(spawn_persist_task(
            state.cache.clone(),
            config.cache.persist_interval,
        ));
    }
    info!("Background tasks started");

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(background))
        .await
        .context("Server error")?;

    match state.cache.read().await.persist().await {
        Ok(count) => info!("Persisted {} cache entries on shutdown", count),
        Err(e) => warn!("Failed to persist cache on shutdown: {}", e),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful shutdown.
async fn shutdown_signal(background: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
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

    for handle in &background {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
