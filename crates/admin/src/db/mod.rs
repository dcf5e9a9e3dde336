//! Database operations for the admin dashboard.
//!
//! ## Tables
//!
//! - `restaurants` - Tenant restaurants (onboarding + settings)
//! - `categories` / `menu_items` - Canonical menu
//! - `orders` - Placed orders (status transitions only; lines are immutable)
//! - `devices` - Push delivery tokens, keyed by `(restaurant_id, token)`
//!
//! # Migrations
//!
//! Migrations are stored in `migrations/` at the workspace root and run via:
//! ```bash
//! cargo run -p plateful-cli -- migrate
//! ```

pub mod devices;
pub mod menu;
pub mod orders;
pub mod restaurants;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use devices::PgDeviceStore;
pub use menu::MenuRepository;
pub use restaurants::RestaurantRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or lost race (e.g. duplicate slug, stale status).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_unique(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(format!("{what} already exists"))
            }
            _ => Self::Database(err),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
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
