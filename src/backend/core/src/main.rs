//! Libris Server - Main entry point

use std::sync::Arc;

use libris_core::{
    api::{self, AppState},
    config::{Config, StoreBackend},
    db::{Database, InMemoryStore, LibraryStore},
    observability,
    service::LibraryService,
};

/// Points at an optional TOML config file.
const CONFIG_PATH_VAR: &str = "LIBRIS_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => Config::from_file(&path)?,
        Err(_) => Config::load()?,
    };

    // Initialize observability
    observability::init("libris-server", &config.observability)?;
    let metrics = if config.observability.metrics_enabled {
        Some(observability::install_metrics()?)
    } else {
        None
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Libris Server"
    );

    let store: Arc<dyn LibraryStore> = match config.database.backend {
        StoreBackend::Postgres => {
            let db = Database::new(&config.database).await?;
            tracing::info!("Connected to database");
            if config.database.run_migrations {
                db.migrate().await?;
            }
            Arc::new(db)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on shutdown");
            Arc::new(InMemoryStore::new())
        }
    };

    let policy = config.relations.dependent_sales;
    tracing::info!(backend = store.backend_name(), ?policy, "Store ready");

    // Create app state
    let mut app_state = AppState::new(LibraryService::new(store, policy));
    if let Some(handle) = metrics {
        app_state = app_state.with_metrics(handle);
    }

    // Build router
    let app = api::build_router(app_state);

    // Start server
    let addr = config.bind_address();
    tracing::info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    observability::shutdown();
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
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
                tracing::error!(error = %e, "Failed to install signal handler");
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

    tracing::info!("Shutdown signal received");
}
