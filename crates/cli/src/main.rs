//! Clementine CLI - GDPR maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Export emails of customers inactive for a year
//! clem export-emails --days 365
//!
//! # Same, scoped to one shop, printed to the console as JSON
//! clem export-emails --days 365 --shop 1 --format json --display
//!
//! # Simulate a removal run
//! clem remove --days 365 --dry-run
//!
//! # Remove for real, skipping the confirmation prompt
//! clem remove --days 730 --force
//! ```
//!
//! # Commands
//!
//! - `export-emails` - Export email addresses of inactive customers
//! - `remove` - Delete inactive customers (skips customers with orders)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "clem")]
#[command(author, version, about = "Clementine GDPR maintenance tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export email addresses of inactive customers
    ExportEmails(commands::export::ExportArgs),
    /// Delete inactive customers (customers with orders are skipped)
    Remove(commands::remove::RemoveArgs),
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::ExportEmails(args) => commands::export::run(args).await?,
        Commands::Remove(args) => commands::remove::run(args).await?,
    }
    Ok(())
}
