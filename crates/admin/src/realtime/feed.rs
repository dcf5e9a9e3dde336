//! Order snapshot feeds.

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use thiserror::Error;
use tracing::{debug, instrument};

use plateful_core::RestaurantId;
use plateful_core::order::Order;

use crate::db::{RepositoryError, orders};

/// Channel the `orders` trigger notifies with the affected restaurant id.
pub const ORDER_CHANGES_CHANNEL: &str = "order_changes";

/// Errors that end a subscription.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to listen for order changes: {0}")]
    Listen(#[from] sqlx::Error),

    #[error("failed to load orders: {0}")]
    Query(#[from] RepositoryError),

    #[error("order feed closed")]
    Closed,
}

/// Stream of full snapshots, newest order first.
pub type SnapshotStream = BoxStream<'static, Result<Vec<Order>, SyncError>>;

/// Source of live order snapshots for one restaurant.
#[async_trait]
pub trait OrderFeed: Send + Sync {
    /// Subscribe to a restaurant's orders.
    ///
    /// The stream yields the current list first, then a fresh list after
    /// every change. An `Err` item is final.
    async fn subscribe(&self, restaurant_id: &RestaurantId) -> Result<SnapshotStream, SyncError>;
}

/// [`OrderFeed`] over `LISTEN order_changes`.
///
/// Each subscription holds its own listener connection, released when the
/// stream is dropped.
#[derive(Debug, Clone)]
pub struct PgOrderFeed {
    pool: PgPool,
}

impl PgOrderFeed {
    /// Create a feed that listens and queries through `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderFeed for PgOrderFeed {
    #[instrument(skip(self), fields(restaurant_id = %restaurant_id))]
    async fn subscribe(&self, restaurant_id: &RestaurantId) -> Result<SnapshotStream, SyncError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(ORDER_CHANGES_CHANNEL).await?;

        let pool = self.pool.clone();
        let restaurant_id = restaurant_id.clone();

        let snapshots = stream! {
            match orders::list_for_restaurant(&pool, &restaurant_id).await {
                Ok(list) => yield Ok(list),
                Err(e) => {
                    yield Err(SyncError::Query(e));
                    return;
                }
            }

            loop {
                let notification = match listener.recv().await {
                    Ok(n) => n,
                    Err(e) => {
                        yield Err(SyncError::Listen(e));
                        return;
                    }
                };
                if notification.payload() != restaurant_id.as_str() {
                    continue;
                }

                debug!("Order change received");
                match orders::list_for_restaurant(&pool, &restaurant_id).await {
                    Ok(list) => yield Ok(list),
                    Err(e) => {
                        yield Err(SyncError::Query(e));
                        return;
                    }
                }
            }
        };

        Ok(snapshots.boxed())
    }
}
