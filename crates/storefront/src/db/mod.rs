//! Database operations for the storefront.
//!
//! The storefront reads restaurants and menus, and writes orders. All other
//! tables belong to the admin service.
//!
//! ## Tables
//!
//! - `restaurants` - Tenant restaurants (read-only here)
//! - `categories` / `menu_items` - Canonical menu (read-only here)
//! - `orders` - Placed orders (insert + read)
//! - `tower_sessions.session` - Session storage (cart lives here)
//!
//! # Migrations
//!
//! Migrations are stored in `migrations/` at the workspace root and run via:
//! ```bash
//! cargo run -p plateful-cli -- migrate
//! ```

pub mod menu;
pub mod orders;
pub mod restaurants;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

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
