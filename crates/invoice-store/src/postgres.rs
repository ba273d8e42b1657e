//! PostgreSQL-backed invoice store
//!
//! No pool: each operation opens its own connection and closes it before
//! returning, so nothing is held between requests.

use crate::StoreError;
use async_trait::async_trait;
use invoice_domain::traits::InvoiceStore;
use invoice_domain::{ExtractedInvoice, InvoiceId};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection};
use std::fmt;
use tracing::{debug, warn};

const SCHEMA: &str = include_str!("schema_postgres.sql");

/// Default PostgreSQL port
pub const DEFAULT_PG_PORT: u16 = 5432;

/// Connection settings for PostgreSQL
#[derive(Clone, PartialEq, Eq)]
pub struct PgSettings {
    /// Server host name or address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database name
    pub database: String,
    /// Login role
    pub user: String,
    /// Login password
    pub password: String,
}

impl fmt::Debug for PgSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// PostgreSQL implementation of InvoiceStore
#[derive(Clone)]
pub struct PgStore {
    options: PgConnectOptions,
}

impl fmt::Debug for PgStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgStore")
            .field("host", &self.options.get_host())
            .field("port", &self.options.get_port())
            .field("database", &self.options.get_database())
            .field("user", &self.options.get_username())
            .finish_non_exhaustive()
    }
}

impl PgStore {
    /// Create a store for the given settings
    ///
    /// No connection is made until the first operation.
    pub fn new(settings: &PgSettings) -> Self {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .database(&settings.database)
            .username(&settings.user)
            .password(&settings.password);

        Self { options }
    }

    async fn connect(&self) -> Result<PgConnection, StoreError> {
        Ok(self.options.connect().await?)
    }
}

/// Close `conn`, then hand back the outcome of the work done on it
async fn close_after<T>(conn: PgConnection, result: Result<T, sqlx::Error>) -> Result<T, StoreError> {
    let closed = conn.close().await;
    settle(result, closed)
}

/// A failed close only surfaces when the work itself failed; once a
/// statement has committed its result stands.
fn settle<T>(
    result: Result<T, sqlx::Error>,
    closed: Result<(), sqlx::Error>,
) -> Result<T, StoreError> {
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(value), Err(e)) => {
            warn!(error = %e, "Failed to close PostgreSQL connection");
            Ok(value)
        }
        (Err(e), _) => Err(e.into()),
    }
}

#[async_trait]
impl InvoiceStore for PgStore {
    type Error = StoreError;

    async fn ensure_schema(&self) -> Result<(), Self::Error> {
        let mut conn = self.connect().await?;
        let result = sqlx::query(SCHEMA).execute(&mut conn).await;
        close_after(conn, result).await?;

        debug!("Invoices table verified");
        Ok(())
    }

    async fn insert_invoice(&self, invoice: &ExtractedInvoice) -> Result<InvoiceId, Self::Error> {
        let mut conn = self.connect().await?;

        let result = sqlx::query_scalar::<_, i64>(
            "INSERT INTO invoices (total_amount, issue_date, tax_id)
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(invoice.total_amount)
        .bind(invoice.issue_date)
        .bind(&invoice.tax_id)
        .fetch_one(&mut conn)
        .await;

        // Release the connection whether or not the insert went through
        let id = close_after(conn, result).await?;

        debug!(id, "Inserted invoice into PostgreSQL");
        Ok(InvoiceId::from_value(id))
    }
}
