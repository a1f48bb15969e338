//! Email export command for inactive customers.
//!
//! # Usage
//!
//! ```bash
//! # Write a CSV to var/gdpr/inactive_customer_emails.csv
//! clem export-emails --days 365
//!
//! # Print a pretty JSON array to the console
//! clem export-emails --days 365 --format json --display
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string
//! - `STOREFRONT_READ_DATABASE_URL` - Optional read replica

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use thiserror::Error;

use clementine_core::Email;
use clementine_gdpr::{InactiveUserService, RepositoryError};

use super::Pools;
use crate::config::{CliConfig, ConfigError};

/// Rendering for the collected addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single `email` header column, one row per address.
    Csv,
    /// Pretty-printed JSON array of strings.
    Json,
    /// Newline-joined addresses.
    Text,
}

/// Arguments for `clem export-emails`.
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Number of days of inactivity
    #[arg(short, long, default_value_t = 365)]
    pub days: u32,

    /// Shop ID (default: all shops)
    #[arg(short, long)]
    pub shop: Option<i32>,

    /// Batch size for pagination
    #[arg(short, long, default_value_t = 1000)]
    pub batch: u32,

    /// Output directory
    #[arg(long, default_value = "var/gdpr")]
    pub out_dir: PathBuf,

    /// Output filename (e.g. emails.csv)
    #[arg(long, default_value = "inactive_customer_emails.csv")]
    pub out_name: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Print to the console instead of writing a file
    #[arg(long)]
    pub display: bool,
}

/// Errors that can occur during the export command.
#[derive(Debug, Error)]
pub enum ExportError {
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

    /// Failed to write the output file.
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to encode CSV.
    #[error("Failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to encode JSON.
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Run the export command.
///
/// # Errors
///
/// Returns `ExportError::Validation` before touching the database if `days`
/// is zero; otherwise propagates configuration, query and output errors.
pub async fn run(args: ExportArgs) -> Result<(), ExportError> {
    validate(args.days)?;

    let config = CliConfig::from_env()?;
    let pools = Pools::connect(&config).await?;
    let service = InactiveUserService::new(pools.repository());
    let criteria = super::criteria(args.days, args.shop);

    tracing::info!("Fetching inactive customers for {} days...", args.days);

    let count = service.count_inactive(&criteria).await?;
    tracing::info!("Found {count} inactive customers.");

    if count == 0 {
        tracing::info!("No inactive customers found, nothing to export.");
        return Ok(());
    }

    let emails = service.export_emails(&criteria, args.batch).await?;
    let rendered = render(&emails, args.format)?;

    if args.display {
        display(&rendered);
    } else {
        let path = args.out_dir.join(&args.out_name);
        write_to_file(&rendered, &path)?;
        tracing::info!("Emails exported to: {}", path.display());
    }

    tracing::info!("Total: {} emails", emails.len());
    Ok(())
}

fn validate(days: u32) -> Result<(), ExportError> {
    if days == 0 {
        return Err(ExportError::Validation(
            "days must be greater than 0".to_owned(),
        ));
    }
    Ok(())
}

/// Render the address list in the requested format.
fn render(emails: &[Email], format: OutputFormat) -> Result<String, ExportError> {
    match format {
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(["email"])?;
            for email in emails {
                writer.write_record([email.as_str()])?;
            }
            let bytes = writer
                .into_inner()
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        OutputFormat::Json => {
            let addresses: Vec<&str> = emails.iter().map(Email::as_str).collect();
            Ok(serde_json::to_string_pretty(&addresses)?)
        }
        OutputFormat::Text => {
            let addresses: Vec<&str> = emails.iter().map(Email::as_str).collect();
            Ok(addresses.join("\n"))
        }
    }
}

// Payload output goes to stdout, not to the tracing log
#[allow(clippy::print_stdout)]
fn display(rendered: &str) {
    println!("{rendered}");
}

fn write_to_file(rendered: &str, path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, rendered)?;
    Ok(())
}
