//! Menu reads from the canonical `menu_items` table.

use sqlx::PgPool;

use plateful_core::menu::{Category, CategoryRow, MenuItem, MenuItemRow};
use plateful_core::{MenuItemId, RestaurantId};

use super::RepositoryError;

/// Repository for menu reads.
pub struct MenuRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MenuRepository<'a> {
    /// Create a new menu repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Categories for a restaurant, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self, restaurant_id: &RestaurantId) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, restaurant_id, name, position
            FROM categories
            WHERE restaurant_id = $1
            ORDER BY position, name
            ",
        )
        .bind(restaurant_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Category::try_from(row)
                    .inspect_err(|e| tracing::warn!(error = %e, "Skipping malformed category"))
                    .ok()
            })
            .collect())
    }

    /// Available menu items for a restaurant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn available_items(&self, restaurant_id: &RestaurantId) -> Result<Vec<MenuItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, MenuItemRow>(
            r"
            SELECT id, restaurant_id, category_id, name, description, price,
                   is_available, image_url, created_at, updated_at
            FROM menu_items
            WHERE restaurant_id = $1 AND is_available
            ORDER BY name
            ",
        )
        .bind(restaurant_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                MenuItem::try_from(row)
                    .inspect_err(|e| tracing::warn!(error = %e, "Skipping malformed menu item"))
                    .ok()
            })
            .collect())
    }

    /// Get a menu item by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row is malformed.
    pub async fn get_item(&self, id: &MenuItemId) -> Result<Option<MenuItem>, RepositoryError> {
        let row = sqlx::query_as::<_, MenuItemRow>(
            r"
            SELECT id, restaurant_id, category_id, name, description, price,
                   is_available, image_url, created_at, updated_at
            FROM menu_items
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(MenuItem::try_from)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
    }
}
