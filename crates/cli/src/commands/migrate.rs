//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! pf-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Both binaries share one database; the schema lives in the workspace
//! `migrations/` directory.

use super::{CommandError, connect};

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if the connection or any migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../../migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
