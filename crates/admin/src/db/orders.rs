//! Order reads and conditional status updates.

use sqlx::PgPool;

use plateful_core::order::{Order, OrderRow};
use plateful_core::{OrderId, OrderStatus, RestaurantId};

use super::RepositoryError;

const SELECT_ORDER: &str = r"
    SELECT id, restaurant_id, lines, customer, status, subtotal, tax, total,
           created_at, updated_at
    FROM orders
";

/// Decode rows, logging and skipping any that fail validation.
pub(crate) fn decode_rows(rows: Vec<OrderRow>) -> Vec<Order> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            Order::try_from(row)
                .inspect_err(|e| tracing::warn!(order_id = %id, error = %e, "Skipping malformed order"))
                .ok()
        })
        .collect()
}

/// List every order for a restaurant, newest first.
///
/// Malformed rows are quarantined (logged and skipped).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_for_restaurant(
    pool: &PgPool,
    restaurant_id: &RestaurantId,
) -> Result<Vec<Order>, RepositoryError> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "{SELECT_ORDER} WHERE restaurant_id = $1 ORDER BY created_at DESC"
    ))
    .bind(restaurant_id)
    .fetch_all(pool)
    .await?;

    Ok(decode_rows(rows))
}

/// Fetch an order by id.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
/// Returns `RepositoryError::DataCorruption` if the row fails validation.
pub async fn get_order(pool: &PgPool, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Order::try_from)
        .transpose()
        .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
}

/// Move an order from `current` to `target`, refreshing `updated_at`.
///
/// The update only applies while the stored status still equals `current`.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if no row matched (the order changed
/// concurrently or does not exist), `RepositoryError::Database` on query failure.
#[tracing::instrument(skip(pool), fields(order_id = %id, from = %current, to = %target))]
pub async fn update_status(
    pool: &PgPool,
    id: &OrderId,
    current: OrderStatus,
    target: OrderStatus,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(
        r"
        UPDATE orders
        SET status = $3, updated_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING id, restaurant_id, lines, customer, status, subtotal, tax, total,
                  created_at, updated_at
        ",
    )
    .bind(id)
    .bind(current)
    .bind(target)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Err(RepositoryError::Conflict(format!(
            "order {id} is no longer {current}"
        )));
    };

    Order::try_from(row).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
}
