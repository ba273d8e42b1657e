//! Invoice Storage Layer
//!
//! Implements the `InvoiceStore` trait: create the `invoices` table if it is
//! missing, insert one record, hand back the generated id. There is no
//! read, update or delete path.
//!
//! # Backends
//!
//! - `PgStore`: PostgreSQL, a fresh connection per operation (production)
//! - `SqliteStore`: SQLite, one mutex-guarded connection (local runs, tests)
//!
//! # Examples
//!
//! ```no_run
//! use invoice_domain::traits::InvoiceStore;
//! use invoice_store::SqliteStore;
//!
//! # async fn example() -> Result<(), invoice_store::StoreError> {
//! let store = SqliteStore::open_in_memory()?;
//! store.ensure_schema().await?;
//! // Store is now ready for inserts
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod postgres;
pub mod sqlite;

use invoice_domain::traits::InvoiceStore;
use std::sync::Arc;
use thiserror::Error;

pub use postgres::{PgSettings, PgStore, DEFAULT_PG_PORT};
pub use sqlite::SqliteStore;

/// Shared handle to any store backend
pub type SharedStore = Arc<dyn InvoiceStore<Error = StoreError>>;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// PostgreSQL driver error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// SQLite driver error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Could not obtain a usable connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Blocking task failed to complete
    #[error("Store task failed: {0}")]
    Task(String),
}
