//! Task Tracker
//!
//! Per-user task tracker API server.
//!
//! # Environment Variables
//!
//! - `STORAGE_MODE`: `in_memory` (default) | `postgres`
//! - `DATABASE_URL`: `PostgreSQL` connection URL (required when `STORAGE_MODE=postgres`)
//! - `DATABASE_MAX_CONNECTIONS`: `PostgreSQL` pool size (default: `10`)
//! - `PRINCIPAL_HEADER`: header carrying the authenticated principal (default: `x-authenticated-user`)
//! - `CSRF_SECRET`: anti-forgery token key (default: random per process)
//! - `RECENT_TASKS_LIMIT`: tasks shown in the dashboard's recent list (default: `5`)
//! - `RUST_LOG`: Logging level (e.g., `debug`, `info`, `task_tracker=debug`)
//! - `HOST`: Server host address (default: `0.0.0.0`)
//! - `PORT`: Server port (default: `3000`)
//! - `WORKER_THREADS`: Number of tokio worker threads (default: logical CPU count)

use std::env;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use task_tracker::api::{AppConfig, AppState, router};
use task_tracker::infrastructure::{RepositoryConfig, RepositoryFactory};

/// Reads `WORKER_THREADS`; anything but a positive integer falls back to
/// tokio's default.
fn worker_threads() -> Option<usize> {
    let value = env::var("WORKER_THREADS").ok()?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    match value.parse::<usize>() {
        Ok(threads) if threads > 0 => Some(threads),
        _ => {
            // The subscriber is not installed yet.
            eprintln!("Warning: WORKER_THREADS='{value}' is not a positive integer, using default");
            None
        }
    }
}

fn main() {
    dotenvy::dotenv().ok();

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(threads) = worker_threads() {
        builder.worker_threads(threads);
    }

    let runtime = builder.build().expect("Failed to create tokio runtime");
    runtime.block_on(async_main());
}

async fn async_main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "task_tracker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Task Tracker");

    // Initialize configuration from environment
    let repository_config = match RepositoryConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!("Configuration error: {}", error);
            std::process::exit(1);
        }
    };

    tracing::info!(
        storage_mode = ?repository_config.storage_mode,
        max_connections = repository_config.max_connections,
        "Repository configuration loaded"
    );

    let application_config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!("Configuration error: {}", error);
            std::process::exit(1);
        }
    };

    tracing::info!(config = ?application_config, "Application configuration loaded");

    // Create the task repository for the configured backend
    let factory = RepositoryFactory::new(repository_config);
    let task_repository = match factory.create().await {
        Ok(repository) => {
            tracing::info!("Task repository initialized successfully");
            repository
        }
        Err(error) => {
            tracing::error!("Failed to initialize task repository: {}", error);
            std::process::exit(1);
        }
    };

    let application_state = match AppState::new(task_repository, application_config) {
        Ok(state) => state,
        Err(error) => {
            tracing::error!("Failed to initialize application state: {}", error);
            std::process::exit(1);
        }
    };

    let application = router(application_state);

    // Parse server address from environment
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(3000);

    let address: SocketAddr = match format!("{host}:{port}").parse() {
        Ok(address) => address,
        Err(error) => {
            tracing::error!(%error, "Invalid server address: {}:{}", host, port);
            std::process::exit(1);
        }
    };

    // Start the server
    let listener = match TcpListener::bind(address).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, "Failed to bind to address {}", address);
            std::process::exit(1);
        }
    };

    match listener.local_addr() {
        Ok(address) => tracing::info!("Listening on {}", address),
        Err(error) => tracing::warn!(%error, "Could not determine local address"),
    }

    if let Err(error) = axum::serve(listener, application)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(%error, "Server error");
        std::process::exit(1);
    }

    tracing::info!("Server shutdown complete");
}

/// Completes on Ctrl+C, or on SIGTERM where available.
///
/// A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::warn!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("Interrupted, shutting down"),
        () = terminate => tracing::info!("Terminated, shutting down"),
    }
}
