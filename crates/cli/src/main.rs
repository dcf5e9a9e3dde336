//! Plateful CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! pf-cli migrate
//!
//! # Delete stale push devices now instead of waiting for the daily job
//! pf-cli devices sweep
//!
//! # Import a legacy per-restaurant menu export
//! pf-cli menu import-legacy menu-export.json
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pf-cli")]
#[command(author, version, about = "Plateful CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage push devices
    Devices {
        #[command(subcommand)]
        action: DevicesAction,
    },
    /// Manage menus
    Menu {
        #[command(subcommand)]
        action: MenuAction,
    },
}

#[derive(Subcommand)]
enum DevicesAction {
    /// Delete soft-deleted devices and devices unused for 30 days
    Sweep,
}

#[derive(Subcommand)]
enum MenuAction {
    /// Import a legacy `{ restaurantId: [items] }` export into `menu_items`
    ImportLegacy {
        /// Path to the JSON export
        file: PathBuf,
    },
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

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Devices { action } => match action {
            DevicesAction::Sweep => {
                let report = commands::devices::sweep().await?;
                println!(
                    "Deleted {} device(s); {} restaurant(s) failed",
                    report.deleted,
                    report.failures.len()
                );
            }
        },
        Commands::Menu { action } => match action {
            MenuAction::ImportLegacy { file } => {
                let summary = commands::menu_import::import_legacy(&file).await?;
                println!(
                    "Imported {} item(s), created {} categor(ies), rejected {}",
                    summary.imported,
                    summary.categories_created,
                    summary.rejected.len()
                );
                for rejected in &summary.rejected {
                    println!(
                        "  {}/{}: {}",
                        rejected.restaurant, rejected.item, rejected.reason
                    );
                }
            }
        },
    }
    Ok(())
}
