//! Invoice Server
//!
//! HTTP front end for invoice intake: accepts an uploaded invoice, has the
//! model extract its fields, saves them and returns the stored record.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::{DatabaseConfig, ServerConfig};
use handlers::{create_router, AppState};
use invoice_domain::traits::InvoiceStore;
use invoice_extractor::Extractor;
use invoice_llm::{GeminiProvider, LlmError};
use invoice_store::{PgStore, SharedStore, SqliteStore, StoreError};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Database could not be opened or prepared
    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    /// Model client could not be built
    #[error("Model client error: {0}")]
    Llm(#[from] LlmError),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Install the global tracing subscriber
///
/// Honours `RUST_LOG`; defaults to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Open the configured database backend
pub fn open_store(database: &DatabaseConfig) -> Result<SharedStore, ServerError> {
    let store: SharedStore = match database {
        DatabaseConfig::Sqlite { path } => Arc::new(SqliteStore::new(path)?),
        DatabaseConfig::Postgres { .. } => match database.pg_settings() {
            Some(settings) => Arc::new(PgStore::new(&settings)),
            None => return Err(ServerError::Server("Missing PostgreSQL settings".to_string())),
        },
    };
    Ok(store)
}

/// Build the application state from configuration
///
/// Creates the invoices table if needed; a database that cannot be
/// prepared stops startup.
pub async fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    let provider = GeminiProvider::with_endpoint(
        &config.gemini.endpoint,
        &config.gemini.api_key,
        &config.gemini.model,
        config.gemini.timeout(),
    )?;
    let extractor = Extractor::new(provider);

    let store = open_store(&config.database)?;
    store.ensure_schema().await?;
    info!(backend = config.database.backend(), "Invoices table ready");

    Ok(AppState { extractor, store })
}

/// Start the invoice HTTP server
///
/// Builds the model client and store, then serves until Ctrl-C.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    info!("Starting invoice server");
    info!("Bind address: {}", config.bind_addr());
    info!("Model: {}", config.gemini.model);
    info!("Database backend: {}", config.database.backend());

    let state = build_state(&config).await?;
    let app = create_router(state, config.max_upload_bytes);

    // Bind and serve
    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
