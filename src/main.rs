//! Linkmon Server — connection telemetry and alerting engine.
//!
//! Main entry point that wires the engine and HTTP layer together and
//! starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use linkmon_api::AppState;
use linkmon_core::config::EngineConfig;
use linkmon_core::error::EngineError;
use linkmon_engine::MonitorEngine;

mod simulator;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<EngineConfig, EngineError> {
    let env = std::env::var("LINKMON_ENV").unwrap_or_else(|_| "development".to_string());
    EngineConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &EngineConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: EngineConfig) -> Result<(), EngineError> {
    tracing::info!("Starting Linkmon v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Assemble the engine ──────────────────────────────
    let engine = Arc::new(MonitorEngine::new(config.clone())?);
    tracing::info!(
        channels = engine.delivery().channel_count().await,
        rules = config.alerting.rules.len(),
        "Engine assembled"
    );

    // ── Step 2: Start tick loop and anomaly pump ─────────────────
    engine.start();

    // ── Step 3: Optional traffic simulator ───────────────────────
    let simulator_handle = if config.simulator.enabled {
        tracing::info!(
            connections = config.simulator.connections,
            "Starting traffic simulator"
        );
        Some(simulator::spawn(Arc::clone(&engine)))
    } else {
        None
    };

    // ── Step 4: Build the HTTP app ───────────────────────────────
    let app = linkmon_api::build_router(AppState::new(Arc::clone(&engine)));

    // ── Step 5: Bind and serve ───────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| EngineError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Linkmon server listening on {}", addr);

    let shutdown_engine = Arc::clone(&engine);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        shutdown_engine.shutdown();
    });

    server
        .await
        .map_err(|e| EngineError::internal(format!("Server error: {}", e)))?;

    // ── Step 6: Stop background tasks ────────────────────────────
    if let Some(handle) = simulator_handle {
        handle.abort();
    }

    tracing::info!("Linkmon server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
