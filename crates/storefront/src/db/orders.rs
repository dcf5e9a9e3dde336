//! Order persistence for checkout and tracking.

use sqlx::PgPool;
use sqlx::types::Json;

use plateful_core::order::{CustomerInfo, Order, OrderLine, OrderRow};
use plateful_core::{OrderId, RestaurantId, cart::CartTotals};

use super::RepositoryError;

/// Insert a new pending order.
///
/// Timestamps are assigned by the database.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
/// Returns `RepositoryError::DataCorruption` if the stored row fails validation.
#[tracing::instrument(skip(pool, lines, customer), fields(order_id = %id, restaurant_id = %restaurant_id))]
pub async fn insert_order(
    pool: &PgPool,
    id: &OrderId,
    restaurant_id: &RestaurantId,
    lines: &[OrderLine],
    customer: &CustomerInfo,
    totals: CartTotals,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(
        r"
        INSERT INTO orders (id, restaurant_id, lines, customer, status, subtotal, tax, total)
        VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7)
        RETURNING id, restaurant_id, lines, customer, status, subtotal, tax, total,
                  created_at, updated_at
        ",
    )
    .bind(id)
    .bind(restaurant_id)
    .bind(Json(lines))
    .bind(Json(customer))
    .bind(totals.subtotal)
    .bind(totals.tax)
    .bind(totals.total)
    .fetch_one(pool)
    .await?;

    Order::try_from(row).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
}

/// Fetch an order by id.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
/// Returns `RepositoryError::DataCorruption` if the row fails validation.
pub async fn get_order(pool: &PgPool, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(
        r"
        SELECT id, restaurant_id, lines, customer, status, subtotal, tax, total,
               created_at, updated_at
        FROM orders
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Order::try_from)
        .transpose()
        .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
}
