//! Category and menu item management.

use sqlx::PgPool;

use plateful_core::menu::{Category, CategoryRow, MenuItem, MenuItemRow};
use plateful_core::{CategoryId, MenuItemId, RestaurantId};

use super::RepositoryError;
use crate::models::{NewCategory, ValidMenuItem};

const MENU_ITEM_COLUMNS: &str = r"
    id, restaurant_id, category_id, name, description, price,
    is_available, image_url, created_at, updated_at
";

fn decode_item(row: MenuItemRow) -> Result<MenuItem, RepositoryError> {
    MenuItem::try_from(row).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
}

/// Repository for menu writes and full (unfiltered) menu reads.
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
    pub async fn categories(
        &self,
        restaurant_id: &RestaurantId,
    ) -> Result<Vec<Category>, RepositoryError> {
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

    /// Add a category. Without an explicit position it goes last.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[tracing::instrument(skip(self, new), fields(restaurant_id = %restaurant_id))]
    pub async fn create_category(
        &self,
        restaurant_id: &RestaurantId,
        new: &NewCategory,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO categories (id, restaurant_id, name, position)
            VALUES (
                $1, $2, $3,
                COALESCE($4, (SELECT COALESCE(MAX(position) + 1, 0)
                              FROM categories WHERE restaurant_id = $2))
            )
            RETURNING id, restaurant_id, name, position
            ",
        )
        .bind(CategoryId::generate())
        .bind(restaurant_id)
        .bind(&new.name)
        .bind(new.position)
        .fetch_one(self.pool)
        .await?;

        Category::try_from(row).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
    }

    /// Delete a category. Its items become uncategorised.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such category exists.
    pub async fn delete_category(&self, id: &CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Every menu item of a restaurant, including unavailable ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, restaurant_id: &RestaurantId) -> Result<Vec<MenuItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, MenuItemRow>(&format!(
            "SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE restaurant_id = $1 ORDER BY name"
        ))
        .bind(restaurant_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                decode_item(row)
                    .inspect_err(|e| tracing::warn!(item_id = %id, error = %e, "Skipping malformed menu item"))
                    .ok()
            })
            .collect())
    }

    /// Check that a category exists and belongs to the restaurant.
    async fn ensure_category(
        &self,
        restaurant_id: &RestaurantId,
        category_id: Option<&CategoryId>,
    ) -> Result<(), RepositoryError> {
        let Some(category_id) = category_id else {
            return Ok(());
        };
        let found: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM categories WHERE id = $1 AND restaurant_id = $2",
        )
        .bind(category_id)
        .bind(restaurant_id)
        .fetch_optional(self.pool)
        .await?;

        if found.is_none() {
            return Err(RepositoryError::Conflict(format!(
                "category {category_id} does not belong to restaurant {restaurant_id}"
            )));
        }
        Ok(())
    }

    /// Insert or replace a menu item under a known id.
    ///
    /// Used both for new items (with a generated id) and by the legacy
    /// importer, which keeps the original ids.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category belongs to another
    /// restaurant or the id is owned by another restaurant.
    #[tracing::instrument(skip(self, item), fields(restaurant_id = %restaurant_id, item_id = %id))]
    pub async fn upsert_item(
        &self,
        restaurant_id: &RestaurantId,
        id: &MenuItemId,
        item: &ValidMenuItem,
    ) -> Result<MenuItem, RepositoryError> {
        self.ensure_category(restaurant_id, item.category_id.as_ref())
            .await?;

        let row = sqlx::query_as::<_, MenuItemRow>(&format!(
            r"
            INSERT INTO menu_items
                (id, restaurant_id, category_id, name, description, price, is_available, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET category_id = EXCLUDED.category_id,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                is_available = EXCLUDED.is_available,
                image_url = EXCLUDED.image_url,
                updated_at = NOW()
            WHERE menu_items.restaurant_id = EXCLUDED.restaurant_id
            RETURNING {MENU_ITEM_COLUMNS}
            "
        ))
        .bind(id)
        .bind(restaurant_id)
        .bind(item.category_id.as_ref())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .bind(item.is_available)
        .bind(item.image_url.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| {
            RepositoryError::Conflict(format!("menu item {id} belongs to another restaurant"))
        })?;

        decode_item(row)
    }

    /// Replace an existing menu item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    #[tracing::instrument(skip(self, item), fields(item_id = %id))]
    pub async fn update_item(
        &self,
        id: &MenuItemId,
        item: &ValidMenuItem,
    ) -> Result<MenuItem, RepositoryError> {
        let restaurant_id: String =
            sqlx::query_scalar("SELECT restaurant_id FROM menu_items WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?
                .ok_or(RepositoryError::NotFound)?;
        let restaurant_id = RestaurantId::try_from(restaurant_id)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        self.upsert_item(&restaurant_id, id, item).await
    }

    /// Delete a menu item. Placed orders keep their own snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    pub async fn delete_item(&self, id: &MenuItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
