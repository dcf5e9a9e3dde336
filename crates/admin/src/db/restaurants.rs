//! Restaurant onboarding and settings.

use sqlx::PgPool;

use plateful_core::RestaurantId;
use plateful_core::menu::{Restaurant, RestaurantRow};

use super::RepositoryError;
use crate::models::{NewRestaurant, RestaurantPatch};

const RETURNING_RESTAURANT: &str = r"
    RETURNING id, name, slug, description, address, phone, is_active,
              owner_user_id, created_at, updated_at
";

fn decode(row: RestaurantRow) -> Result<Restaurant, RepositoryError> {
    Restaurant::try_from(row).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
}

/// Repository for restaurant records.
pub struct RestaurantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RestaurantRepository<'a> {
    /// Create a new restaurant repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a restaurant with a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[tracing::instrument(skip(self, new), fields(slug = %new.slug))]
    pub async fn create(&self, new: &NewRestaurant) -> Result<Restaurant, RepositoryError> {
        let row = sqlx::query_as::<_, RestaurantRow>(&format!(
            r"
            INSERT INTO restaurants (id, name, slug, description, address, phone, owner_user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            {RETURNING_RESTAURANT}
            "
        ))
        .bind(RestaurantId::generate())
        .bind(&new.name)
        .bind(&new.slug)
        .bind(&new.description)
        .bind(&new.address)
        .bind(&new.phone)
        .bind(new.owner_user_id.as_ref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "restaurant slug"))?;

        decode(row)
    }

    /// Get a restaurant by id, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row is malformed.
    pub async fn get(&self, id: &RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        let row = sqlx::query_as::<_, RestaurantRow>(
            r"
            SELECT id, name, slug, description, address, phone, is_active,
                   owner_user_id, created_at, updated_at
            FROM restaurants
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(decode).transpose()
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the restaurant does not exist.
    #[tracing::instrument(skip(self, patch), fields(restaurant_id = %id))]
    pub async fn update(
        &self,
        id: &RestaurantId,
        patch: &RestaurantPatch,
    ) -> Result<Restaurant, RepositoryError> {
        let row = sqlx::query_as::<_, RestaurantRow>(&format!(
            r"
            UPDATE restaurants
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                address = COALESCE($4, address),
                phone = COALESCE($5, phone),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            {RETURNING_RESTAURANT}
            "
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.address.as_deref())
        .bind(patch.phone.as_deref())
        .bind(patch.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        decode(row)
    }

    /// Ids of every restaurant, active or not.
    ///
    /// Invalid ids are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_ids(&self) -> Result<Vec<RestaurantId>, RepositoryError> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM restaurants ORDER BY id")
            .fetch_all(self.pool)
            .await?;

        Ok(ids
            .into_iter()
            .filter_map(|raw| {
                RestaurantId::try_from(raw.clone())
                    .inspect_err(|e| tracing::warn!(restaurant_id = %raw, error = %e, "Skipping invalid restaurant id"))
                    .ok()
            })
            .collect())
    }
}
