//! Toolcache - caching gateway for the tools directory API
//!
//! Serves cached reads of the upstream API with stale-on-error fallback.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use toolcache::api::{create_router, AppState};
use toolcache::cache::DEFAULT_LIFETIMES;
use toolcache::fetch::ApiCache;
use toolcache::Config;

/// Main entry point for the toolcache gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the upstream transport and session cache (starts the sweep task)
/// 4. Create Axum router with all endpoints
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toolcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting toolcache gateway");

    let config = Config::from_env();
    info!(
        "Configuration loaded: api_base={}, port={}, sweep_threshold={}, sweep_interval={}s",
        config.api_base, config.server_port, config.sweep_threshold, config.sweep_interval
    );
    for (fragment, lifetime) in DEFAULT_LIFETIMES {
        info!("Default lifetime for {}: {}s", fragment, lifetime.as_secs());
    }

    let state = AppState::from_config(&config).context("Failed to initialize cache")?;
    info!("Session cache initialized");

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&state.cache)))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, stops the cache sweep task and allows graceful shutdown.
async fn shutdown_signal(cache: Arc<ApiCache>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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

    cache.shutdown();
}
