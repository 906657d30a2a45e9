//! SOP Hub Server: versioned storage for standard operating procedures.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use sophub_api::{AppState, build_app};
use sophub_core::config::{AppConfig, MetadataBackend};
use sophub_core::error::{AppError, ErrorKind};
use sophub_database::{DatabasePool, MemoryVersionStore, PgVersionStore, VersionStore};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from `SOPHUB_CONFIG_DIR` for the `SOPHUB_ENV` environment.
fn load_configuration() -> Result<AppConfig, AppError> {
    let dir = std::env::var("SOPHUB_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let env = std::env::var("SOPHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&dir, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
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
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SOP Hub v{}", env!("CARGO_PKG_VERSION"));

    let (version_store, database): (Arc<dyn VersionStore>, Option<DatabasePool>) =
        match config.metadata.backend {
            MetadataBackend::Postgres => {
                tracing::info!("Connecting to database...");
                let db = DatabasePool::connect(&config.database).await?;
                (Arc::new(PgVersionStore::from_database(&db)), Some(db))
            }
            MetadataBackend::Memory => {
                tracing::warn!("Using in-memory metadata store; versions are lost on restart");
                (Arc::new(MemoryVersionStore::new()), None)
            }
        };

    let blobs = sophub_storage::build_blob_store(&config.storage).await?;
    tracing::info!(provider = %blobs.store.provider_type(), "Blob store initialized");

    let bind_address = config.server.bind_address();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = AppState::new(config, version_store, blobs);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Failed to bind {bind_address}"),
                e,
            )
        })?;
    tracing::info!(address = %bind_address, "Server listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });
    let mut server = tokio::spawn(async move { serve.await });

    let outcome = tokio::select! {
        joined = &mut server => joined,
        _ = shutdown_rx.changed() => {
            tracing::info!(grace_seconds = grace.as_secs(), "Shutdown requested, draining requests");
            match tokio::time::timeout(grace, &mut server).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!("Grace period elapsed, closing remaining connections");
                    server.abort();
                    Ok(Ok(()))
                }
            }
        }
    };

    if let Some(db) = database {
        db.close().await;
    }

    match outcome {
        Ok(Ok(())) => {
            tracing::info!("Server stopped");
            Ok(())
        }
        Ok(Err(e)) => Err(AppError::with_source(ErrorKind::Internal, "Server failed", e)),
        Err(e) => Err(AppError::with_source(
            ErrorKind::Internal,
            "Server task panicked",
            e,
        )),
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
}
