//! SQLite-backed invoice store
//!
//! One long-lived connection guarded by a mutex. Every operation runs on the
//! blocking pool, so concurrent requests are serialised at the mutex and
//! never share the connection at the same time.

use crate::StoreError;
use async_trait::async_trait;
use invoice_domain::traits::InvoiceStore;
use invoice_domain::{ExtractedInvoice, InvoiceId};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

const SCHEMA: &str = include_str!("schema_sqlite.sql");

/// SQLite-based implementation of InvoiceStore
///
/// Use `:memory:` (or [`SqliteStore::open_in_memory`]) for a throwaway
/// database in tests.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use invoice_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("invoices.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| StoreError::Connection(format!("Store lock error: {}", e)))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl InvoiceStore for SqliteStore {
    type Error = StoreError;

    async fn ensure_schema(&self) -> Result<(), Self::Error> {
        self.with_conn(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
    }

    async fn insert_invoice(&self, invoice: &ExtractedInvoice) -> Result<InvoiceId, Self::Error> {
        // Decimal and date are stored as their canonical text forms
        let total_amount = invoice.total_amount.to_string();
        let issue_date = invoice.issue_date.format("%Y-%m-%d").to_string();
        let tax_id = invoice.tax_id.clone();

        let id = self
            .with_conn(move |conn| {
                let id: i64 = conn.query_row(
                    "INSERT INTO invoices (total_amount, issue_date, tax_id)
                     VALUES (?1, ?2, ?3) RETURNING id",
                    params![total_amount, issue_date, tax_id],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
            .await?;

        debug!(id, "Inserted invoice into SQLite");
        Ok(InvoiceId::from_value(id))
    }
}
