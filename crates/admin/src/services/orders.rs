//! Order status transitions.
//!
//! A transition is checked against the status state machine and applied with
//! a conditional update that only matches while the stored status is still
//! the one the caller saw. A lost race is reported as a conflict; the
//! realtime feed then delivers the winning state.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use plateful_core::order::Order;
use plateful_core::{OrderId, OrderStatus, RestaurantId, TransitionError};

use crate::db::{RepositoryError, orders};

/// Order lookups and conditional status writes.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fetch the current order.
    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Set `target` if the stored status is still `current`.
    async fn compare_and_set(
        &self,
        id: &OrderId,
        current: OrderStatus,
        target: OrderStatus,
    ) -> Result<Order, RepositoryError>;
}

/// [`OrderStore`] over the `orders` table.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        orders::get_order(&self.pool, id).await
    }

    async fn compare_and_set(
        &self,
        id: &OrderId,
        current: OrderStatus,
        target: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        orders::update_status(&self.pool, id, current, target).await
    }
}

/// Why a transition was not applied.
#[derive(Debug, Error)]
pub enum TransitionFailure {
    #[error("order not found")]
    NotFound,

    #[error(transparent)]
    Invalid(#[from] TransitionError),

    #[error("order was changed by someone else: {0}")]
    Conflict(String),

    #[error("failed to update order: {0}")]
    Store(RepositoryError),
}

impl From<RepositoryError> for TransitionFailure {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Store(other),
        }
    }
}

/// A requested status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub order_id: OrderId,
    /// Restaurant whose board issued the request.
    pub restaurant_id: RestaurantId,
    pub target: OrderStatus,
    /// Status the caller last saw; when absent the stored status is used.
    pub expected: Option<OrderStatus>,
}

/// Validate and apply a status transition.
///
/// # Errors
///
/// - [`TransitionFailure::NotFound`] if the order does not exist or belongs
///   to another restaurant
/// - [`TransitionFailure::Invalid`] if the state machine forbids the move
/// - [`TransitionFailure::Conflict`] if the status changed concurrently
/// - [`TransitionFailure::Store`] on database failure
#[instrument(skip(store), fields(order_id = %request.order_id, target = %request.target))]
pub async fn apply_transition(
    store: &dyn OrderStore,
    request: &TransitionRequest,
) -> Result<Order, TransitionFailure> {
    let order = store
        .get(&request.order_id)
        .await?
        .filter(|o| o.restaurant_id == request.restaurant_id)
        .ok_or(TransitionFailure::NotFound)?;

    let current = request.expected.unwrap_or(order.status);
    if current != order.status {
        return Err(TransitionFailure::Conflict(format!(
            "order is {} but the board showed {current}",
            order.status
        )));
    }
    current.check_transition(request.target)?;

    match store
        .compare_and_set(&request.order_id, current, request.target)
        .await
    {
        Ok(updated) => {
            info!(from = %current, "Order status updated");
            Ok(updated)
        }
        Err(e) => {
            warn!(error = %e, "Order status update failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::test_support::sample_order;

    /// In-memory orders with a switch to simulate a concurrent writer.
    #[derive(Default)]
    pub(crate) struct FakeOrders {
        pub orders: Mutex<HashMap<OrderId, Order>>,
        pub race_to: Option<OrderStatus>,
        pub writes: Mutex<usize>,
    }

    impl FakeOrders {
        pub(crate) fn with(order: Order) -> Self {
            let store = Self::default();
            store.orders.lock().unwrap().insert(order.id.clone(), order);
            store
        }
    }

    #[async_trait]
    impl OrderStore for FakeOrders {
        async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
            Ok(self.orders.lock().unwrap().get(id).cloned())
        }

        async fn compare_and_set(
            &self,
            id: &OrderId,
            current: OrderStatus,
            target: OrderStatus,
        ) -> Result<Order, RepositoryError> {
            *self.writes.lock().unwrap() += 1;
            let mut orders = self.orders.lock().unwrap();
            let order = orders.get_mut(id).ok_or(RepositoryError::NotFound)?;
            if let Some(other) = self.race_to {
                order.status = other;
            }
            if order.status != current {
                return Err(RepositoryError::Conflict(format!("order {id} is no longer {current}")));
            }
            order.status = target;
            Ok(order.clone())
        }
    }

    fn request(target: OrderStatus) -> TransitionRequest {
        TransitionRequest {
            order_id: OrderId::parse("order-1").unwrap(),
            restaurant_id: RestaurantId::parse("r1").unwrap(),
            target,
            expected: None,
        }
    }

    #[tokio::test]
    async fn test_pending_to_preparing() {
        let store = FakeOrders::with(sample_order("order-1", "r1"));
        let order = apply_transition(&store, &request(OrderStatus::Preparing))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Preparing);
    }

    #[tokio::test]
    async fn test_skipping_ahead_is_rejected_without_writing() {
        let store = FakeOrders::with(sample_order("order-1", "r1"));
        let result = apply_transition(&store, &request(OrderStatus::Delivered)).await;
        assert!(matches!(
            result,
            Err(TransitionFailure::Invalid(TransitionError::NotAllowed { .. }))
        ));
        assert_eq!(*store.writes.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_edit_is_conflict() {
        let store = FakeOrders {
            race_to: Some(OrderStatus::Cancelled),
            ..FakeOrders::with(sample_order("order-1", "r1"))
        };
        let result = apply_transition(&store, &request(OrderStatus::Preparing)).await;
        assert!(matches!(result, Err(TransitionFailure::Conflict(_))));
    }

    #[tokio::test]
    async fn test_stale_board_is_conflict() {
        let store = FakeOrders::with(sample_order("order-1", "r1"));
        let stale = TransitionRequest {
            expected: Some(OrderStatus::Ready),
            ..request(OrderStatus::Delivering)
        };
        let result = apply_transition(&store, &stale).await;
        assert!(matches!(result, Err(TransitionFailure::Conflict(_))));
    }

    #[tokio::test]
    async fn test_other_restaurants_order_is_not_found() {
        let store = FakeOrders::with(sample_order("order-1", "r2"));
        let result = apply_transition(&store, &request(OrderStatus::Preparing)).await;
        assert!(matches!(result, Err(TransitionFailure::NotFound)));
    }
}
