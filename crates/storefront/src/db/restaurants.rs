//! Restaurant lookups.

use sqlx::PgPool;

use plateful_core::RestaurantId;
use plateful_core::menu::{Restaurant, RestaurantRow};

use super::RepositoryError;

const SELECT_RESTAURANT: &str = r"
    SELECT id, name, slug, description, address, phone, is_active,
           owner_user_id, created_at, updated_at
    FROM restaurants
";

/// Repository for restaurant reads.
pub struct RestaurantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RestaurantRepository<'a> {
    /// Create a new restaurant repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List active restaurants by name.
    ///
    /// Rows that fail validation are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        let rows = sqlx::query_as::<_, RestaurantRow>(&format!(
            "{SELECT_RESTAURANT} WHERE is_active ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                Restaurant::try_from(row)
                    .inspect_err(|e| tracing::warn!(restaurant_id = %id, error = %e, "Skipping malformed restaurant"))
                    .ok()
            })
            .collect())
    }

    /// Get an active restaurant by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row is malformed.
    pub async fn get_active(&self, id: &RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        let row = sqlx::query_as::<_, RestaurantRow>(&format!(
            "{SELECT_RESTAURANT} WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Restaurant::try_from)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
    }
}
