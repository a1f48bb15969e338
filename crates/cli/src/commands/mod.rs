//! CLI subcommands.

pub mod export;
pub mod remove;

use sqlx::PgPool;

use clementine_core::ShopId;
use clementine_gdpr::{InactiveUserRepository, InactivityCriteria, create_pool};

use crate::config::CliConfig;

/// Connection pools for one command invocation.
pub struct Pools {
    primary: PgPool,
    read: Option<PgPool>,
}

impl Pools {
    /// Connect to the primary (and, when configured, the read replica).
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if a connection cannot be established.
    pub async fn connect(config: &CliConfig) -> Result<Self, sqlx::Error> {
        tracing::info!("Connecting to storefront database...");
        let primary = create_pool(&config.database_url).await?;

        let read = match &config.read_database_url {
            Some(url) => Some(create_pool(url).await?),
            None => None,
        };

        Ok(Self { primary, read })
    }

    /// Build a repository routing reads to the replica when one is present.
    pub fn repository(&self) -> InactiveUserRepository<'_> {
        let repository = InactiveUserRepository::new(&self.primary);
        match &self.read {
            Some(read) => repository.with_read_pool(read),
            None => repository,
        }
    }
}

/// Build criteria from the shared `--days` / `--shop` options.
fn criteria(days: u32, shop: Option<i32>) -> InactivityCriteria {
    let criteria = InactivityCriteria::new(days);
    match shop {
        Some(shop_id) => criteria.with_shop(ShopId::new(shop_id)),
        None => criteria,
    }
}
