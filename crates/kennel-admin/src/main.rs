//! # Kennel Cache Admin Server
//!
//! Binary entry point for the cache admin service.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kennel_admin::{build_router, AppState, Config};
use kennel_persistence::CacheLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        version = kennel_admin::VERSION,
        environment = %config.cache.environment,
        ttl_secs = config.cache.ttl.single.as_secs(),
        cache_enabled = config.cache.enabled,
        "Starting kennel cache admin"
    );

    let client = kennel_persistence::connect(&config.cache).await?;
    let cache = CacheLayer::new(client, &config.cache)?;

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set, cache clear route will refuse every request");
    }

    let state = AppState::new(cache.admin(), config.admin_token.clone());
    let app = build_router(state, &config.cors_origins);

    let addr = config.server_addr;
    tracing::info!(%addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
