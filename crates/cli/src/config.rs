//! CLI configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `STOREFRONT_READ_DATABASE_URL` - Read replica for the scan queries;
//!   deletes always go to the primary

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),
}

/// CLI application configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// `PostgreSQL` connection URL for the primary (contains password)
    pub database_url: SecretString,
    /// Optional read-replica connection URL
    pub read_database_url: Option<SecretString>,
}

impl CliConfig {
    /// Load configuration from the environment (and `.env` if present).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `STOREFRONT_DATABASE_URL` is
    /// not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("STOREFRONT_DATABASE_URL")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

        let read_database_url = std::env::var("STOREFRONT_READ_DATABASE_URL")
            .ok()
            .map(SecretString::from);

        Ok(Self {
            database_url,
            read_database_url,
        })
    }
}
