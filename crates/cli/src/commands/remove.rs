//! Removal command for inactive customers.
//!
//! # Usage
//!
//! ```bash
//! # Simulate: counts what would be deleted, mutates nothing
//! clem remove --days 365 --dry-run
//!
//! # Delete for real; prompts for confirmation unless --force
//! clem remove --days 730 --shop 1 --force
//! ```
//!
//! Customers with orders of any age are skipped, never deleted. Live runs
//! below the safety threshold are refused outright.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string
//! - `STOREFRONT_READ_DATABASE_URL` - Optional read replica

use std::time::Instant;

use clap::Args;
use thiserror::Error;

use clementine_gdpr::{InactiveUserService, ProgressEvent, RepositoryError};

use super::Pools;
use crate::config::{CliConfig, ConfigError};

/// Minimum inactivity period for a live (non-dry-run) deletion. Guards
/// against mass deletion from a mistyped small value.
pub const MIN_SAFE_INACTIVE_DAYS: u32 = 180;

/// Progress lines show at most this many characters of the current email.
const EMAIL_DISPLAY_LEN: usize = 30;

/// Arguments for `clem remove`.
#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Number of days of inactivity
    #[arg(short, long, default_value_t = 365)]
    pub days: u32,

    /// Shop ID (default: all shops)
    #[arg(short, long)]
    pub shop: Option<i32>,

    /// Batch size for deletion pagination
    #[arg(short, long, default_value_t = 100)]
    pub batch: u32,

    /// Simulate deletion without actually deleting
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub force: bool,
}

/// Errors that can occur during the remove command.
#[derive(Debug, Error)]
pub enum RemoveError {
    /// Invalid command-line input.
    #[error("{0}")]
    Validation(String),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query layer error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Confirmation prompt failed.
    #[error("Confirmation prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// Run the remove command.
///
/// # Errors
///
/// Returns `RemoveError::Validation` before touching the database if `days`
/// is zero, or below the safety threshold without `--dry-run`; otherwise
/// propagates configuration and query errors.
pub async fn run(args: RemoveArgs) -> Result<(), RemoveError> {
    validate(args.days, args.dry_run)?;

    let config = CliConfig::from_env()?;
    let pools = Pools::connect(&config).await?;
    let service = InactiveUserService::new(pools.repository());
    let criteria = super::criteria(args.days, args.shop);

    tracing::info!("Checking inactive customers for {} days...", args.days);

    let count = service.count_inactive(&criteria).await?;

    if count == 0 {
        tracing::info!("No inactive customers found.");
        return Ok(());
    }

    tracing::info!("Found {count} inactive customers to delete.");

    if args.dry_run {
        tracing::info!("DRY RUN MODE: no customers will actually be deleted.");
    }

    if !args.force && !args.dry_run {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Are you sure you want to delete {count} inactive customers?"
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            tracing::info!("Operation cancelled.");
            return Ok(());
        }
    }

    tracing::info!("Processing deletion...");

    let mut printer = ProgressPrinter::new();
    let mut on_progress = |event: &ProgressEvent| printer.observe(event);

    let outcome = service
        .remove_inactive_users(&criteria, args.batch, args.dry_run, Some(&mut on_progress))
        .await?;

    if args.dry_run {
        tracing::info!("Would delete: {} customers", outcome.deleted);
    } else {
        tracing::info!("Deleted: {} customers", outcome.deleted);
    }

    if outcome.skipped > 0 {
        tracing::warn!("Skipped: {} customers (have orders)", outcome.skipped);
    }

    if !outcome.errors.is_empty() {
        tracing::warn!("Errors: {}", outcome.errors.len());
        for error in &outcome.errors {
            tracing::warn!("  - {error}");
        }
    }

    tracing::info!("Operation completed successfully.");
    Ok(())
}

fn validate(days: u32, dry_run: bool) -> Result<(), RemoveError> {
    if days == 0 {
        return Err(RemoveError::Validation(
            "days must be greater than 0".to_owned(),
        ));
    }

    if days < MIN_SAFE_INACTIVE_DAYS && !dry_run {
        return Err(RemoveError::Validation(format!(
            "for safety reasons the minimum inactivity period is \
             {MIN_SAFE_INACTIVE_DAYS} days; use --dry-run to test with fewer"
        )));
    }

    Ok(())
}

/// Throttled console progress with elapsed/remaining estimates.
///
/// Prints when the integer percentage has changed since the last printed
/// line AND the percentage is a multiple of 5 or the record count is a
/// multiple of 100.
struct ProgressPrinter {
    started: Instant,
    last_percent: Option<u64>,
}

impl ProgressPrinter {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            last_percent: None,
        }
    }

    // Progress is interactive console output, not a log record
    #[allow(clippy::print_stdout)]
    fn observe(&mut self, event: &ProgressEvent) {
        let percent = percent_of(event.current, event.total);
        if !self.should_print(percent, event.current) {
            return;
        }

        let elapsed = self.started.elapsed();
        let remaining_secs =
            estimate_remaining_secs(elapsed.as_secs_f64(), event.current, event.total);

        println!(
            "[{percent}%] {}/{} processed | Elapsed: {} | Remaining: ~{} | Current: {}",
            event.current,
            event.total,
            format_duration(elapsed.as_secs()),
            format_duration(remaining_secs),
            truncate_email(&event.email),
        );
    }

    fn should_print(&mut self, percent: u64, current: u64) -> bool {
        if self.last_percent == Some(percent) {
            return false;
        }

        if percent % 5 == 0 || current % 100 == 0 {
            self.last_percent = Some(percent);
            return true;
        }

        false
    }
}

fn percent_of(current: u64, total: u64) -> u64 {
    if total == 0 {
        return 100;
    }
    current * 100 / total
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn estimate_remaining_secs(elapsed_secs: f64, current: u64, total: u64) -> u64 {
    if current == 0 {
        return 0;
    }
    let estimated_total = elapsed_secs / current as f64 * total as f64;
    (estimated_total - elapsed_secs).max(0.0) as u64
}

fn format_duration(total_secs: u64) -> String {
    if total_secs < 60 {
        return format!("{total_secs}s");
    }

    let minutes = total_secs / 60;
    let secs = total_secs % 60;

    if minutes < 60 {
        return format!("{minutes}m {secs}s");
    }

    let hours = minutes / 60;
    let minutes = minutes % 60;
    format!("{hours}h {minutes}m")
}

fn truncate_email(email: &str) -> String {
    email.chars().take(EMAIL_DISPLAY_LEN).collect()
}
