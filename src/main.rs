//! Pitwall - replay server for recorded motorsport sessions
//!
//! Loads a recorded session directory, starts the session clock and the
//! position replay, and serves:
//! - WebSocket feed of notifications, standings changes and replay frames
//! - HTTP endpoints for clock, standings and driver detail

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pitwall::app::AppState;
use pitwall::config::{Config, LogFormat};
use pitwall::http::build_router;
use pitwall::telemetry::JsonSessionDir;
use pitwall::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level, config.log_format);
    init_server_time();

    info!("Starting Pitwall");
    info!("Server address: {}", config.server_addr);
    info!("Session directory: {}", config.session_dir.display());

    let data = JsonSessionDir::new(&config.session_dir).load().await;
    let state = AppState::new(config.clone(), data);

    // All files are loaded before the first step or dispatch
    state.session.start_clock();
    state.session.spawn_replay();

    let router = build_router(state.clone());

    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    // Stopping the session closes open feeds so the server can drain
    let session = state.session.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal(config.run_seconds).await;
            session.stop().await;
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str, log_format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
    }
}

/// Resolves on Ctrl+C, SIGTERM, or after `run_seconds`
async fn shutdown_signal(run_seconds: Option<u64>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let deadline = async {
        match run_seconds {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
        _ = deadline => {
            info!(?run_seconds, "Run time elapsed, starting graceful shutdown");
        }
    }
}
