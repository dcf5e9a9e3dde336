//! CLI command implementations.

pub mod devices;
pub mod menu_import;
pub mod migrate;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use plateful_admin::db::RepositoryError;
use plateful_admin::push::PushError;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Push error: {0}")]
    Push(#[from] PushError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid legacy menu export: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Connect to the shared database.
///
/// Reads `ADMIN_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CommandError> {
    let _ = dotenvy::dotenv();

    let url = std::env::var("ADMIN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("ADMIN_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(plateful_admin::db::create_pool(&SecretString::from(url)).await?)
}
