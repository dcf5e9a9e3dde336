//! `PostgreSQL` device store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use plateful_core::RestaurantId;

use super::{RepositoryError, RestaurantRepository};
use crate::push::{Device, DeviceRegistration, DeviceRow, DeviceStore};

/// Device registrations backed by the `devices` table.
#[derive(Debug, Clone)]
pub struct PgDeviceStore {
    pool: PgPool,
}

impl PgDeviceStore {
    /// Create a new device store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceStore for PgDeviceStore {
    #[tracing::instrument(skip(self, registration), fields(restaurant_id = %restaurant_id))]
    async fn upsert(
        &self,
        restaurant_id: &RestaurantId,
        registration: &DeviceRegistration,
    ) -> Result<Device, RepositoryError> {
        let row = sqlx::query_as::<_, DeviceRow>(
            r"
            INSERT INTO devices (restaurant_id, token, user_id, user_email, platform, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (restaurant_id, token) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                user_email = EXCLUDED.user_email,
                platform = EXCLUDED.platform,
                user_agent = EXCLUDED.user_agent,
                last_used = NOW(),
                deleted = FALSE,
                deleted_at = NULL
            RETURNING restaurant_id, token, user_id, user_email, platform, user_agent,
                      created_at, last_used, deleted
            ",
        )
        .bind(restaurant_id)
        .bind(&registration.token)
        .bind(&registration.user_id)
        .bind(&registration.user_email)
        .bind(&registration.platform)
        .bind(&registration.user_agent)
        .fetch_one(&self.pool)
        .await?;

        Device::try_from(row).map_err(RepositoryError::DataCorruption)
    }

    async fn live_tokens(
        &self,
        restaurant_id: &RestaurantId,
    ) -> Result<Vec<String>, RepositoryError> {
        let tokens = sqlx::query_scalar(
            "SELECT token FROM devices WHERE restaurant_id = $1 AND NOT deleted ORDER BY created_at",
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tokens)
    }

    #[tracing::instrument(skip(self, tokens), fields(restaurant_id = %restaurant_id, count = tokens.len()))]
    async fn soft_delete(
        &self,
        restaurant_id: &RestaurantId,
        tokens: &[String],
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE devices
            SET deleted = TRUE, deleted_at = NOW()
            WHERE restaurant_id = $1 AND token = ANY($2) AND NOT deleted
            ",
        )
        .bind(restaurant_id)
        .bind(tokens)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn restaurant_ids(&self) -> Result<Vec<RestaurantId>, RepositoryError> {
        RestaurantRepository::new(&self.pool).list_ids().await
    }

    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id))]
    async fn delete_stale(
        &self,
        restaurant_id: &RestaurantId,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM devices WHERE restaurant_id = $1 AND (deleted OR last_used < $2)",
        )
        .bind(restaurant_id)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
