//! Database access for the ERP `PostgreSQL` data source.
//!
//! # Schema: `erp` (read-only, owned by the ERP)
//!
//! ## Tables
//!
//! - `erp.sale_lines` - One line per item sold (store, supplier, reference, date)
//! - `erp.stock_levels` - Dated stock snapshots per store and product
//! - `erp.products` - Product catalog (family, public price, order quantity, image)
//! - `erp.suppliers` - Supplier names
//!
//! The back office never writes to this schema.

pub mod sales;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use sales::SalesRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
