//! Database operations for the storefront `PostgreSQL`.
//!
//! # Tables
//!
//! - `storefront.customer` - Customer accounts (soft-delete and guest flags)
//! - `storefront.customer_connection` - Login events
//! - `storefront.customer_order` - Orders
//! - `storefront.customer_shop` - Customer/shop associations (multi-shop)
//!
//! The schema is owned by the host platform; this crate only queries it and
//! deletes customer rows. Dependent rows are removed by `ON DELETE CASCADE`.

pub mod inactive_users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use inactive_users::InactiveUserRepository;

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
