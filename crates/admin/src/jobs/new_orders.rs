//! New-order push notifications.

use std::pin::pin;
use std::sync::Arc;

use futures::{Stream, StreamExt, TryStreamExt};
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use plateful_core::OrderId;

use crate::push::{FanOutSummary, NotificationService};
use crate::services::OrderStore;

/// Channel the `orders` insert trigger notifies with the new order id.
pub const ORDER_CREATED_CHANNEL: &str = "order_created";

/// Fan-outs allowed in flight at once.
pub const MAX_CONCURRENT_FAN_OUTS: usize = 32;

/// Listen for inserted orders and fan out a notification for each.
///
/// Runs until the listener fails. Each notification is handled once; there
/// is no retry or deduplication.
///
/// # Errors
///
/// Returns the listener error that ended the job.
pub async fn run_new_order_notifier(
    pool: PgPool,
    orders: Arc<dyn OrderStore>,
    notifications: NotificationService,
) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(&pool).await?;
    listener.listen(ORDER_CREATED_CHANNEL).await?;
    info!(channel = ORDER_CREATED_CHANNEL, "New order notifier listening");

    let payloads = listener
        .into_stream()
        .map_ok(|notification| notification.payload().to_owned());
    dispatch_new_orders(payloads, orders, notifications).await
}

/// Run each payload's fan-out in its own task, at most
/// [`MAX_CONCURRENT_FAN_OUTS`] at once.
///
/// Waits for in-flight fan-outs once the stream ends or fails.
///
/// # Errors
///
/// Returns the first error yielded by `payloads`.
pub async fn dispatch_new_orders<S, E>(
    payloads: S,
    orders: Arc<dyn OrderStore>,
    notifications: NotificationService,
) -> Result<(), E>
where
    S: Stream<Item = Result<String, E>>,
{
    let limit = Arc::new(Semaphore::new(MAX_CONCURRENT_FAN_OUTS));
    let mut in_flight = JoinSet::new();
    let mut payloads = pin!(payloads);

    let result = loop {
        let payload = match payloads.next().await {
            Some(Ok(payload)) => payload,
            Some(Err(e)) => break Err(e),
            None => break Ok(()),
        };

        while let Some(finished) = in_flight.try_join_next() {
            if let Err(e) = finished {
                error!(error = %e, "New order fan-out task failed");
            }
        }

        let Ok(permit) = Arc::clone(&limit).acquire_owned().await else {
            break Ok(());
        };
        let orders = Arc::clone(&orders);
        let notifications = notifications.clone();
        in_flight.spawn(async move {
            notify_new_order(orders.as_ref(), &notifications, &payload).await;
            drop(permit);
        });
    };

    while let Some(finished) = in_flight.join_next().await {
        if let Err(e) = finished {
            error!(error = %e, "New order fan-out task failed");
        }
    }
    result
}

/// Handle one `order_created` payload.
///
/// Returns the fan-out summary, or `None` if the order could not be loaded
/// or the dispatch failed (both logged).
#[instrument(skip(orders, notifications))]
pub async fn notify_new_order(
    orders: &dyn OrderStore,
    notifications: &NotificationService,
    payload: &str,
) -> Option<FanOutSummary> {
    let order_id = match OrderId::parse(payload) {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed order_created payload");
            return None;
        }
    };

    let order = match orders.get(&order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => {
            warn!(order_id = %order_id, "New order vanished before notification");
            return None;
        }
        Err(e) => {
            error!(order_id = %order_id, error = %e, "Failed to load new order");
            return None;
        }
    };

    // Dispatch failures are already captured by the service.
    notifications.fan_out_new_order(&order).await.ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::convert::Infallible;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::push::{DeliveryFailure, PushError, PushMessage, PushTransport, SendOutcome};
    use crate::push::fakes::{FakeStore, FakeTransport};
    use crate::services::orders::tests::FakeOrders;
    use crate::test_support::sample_order;

    fn setup(transport: FakeTransport) -> (FakeOrders, NotificationService, Arc<FakeStore>) {
        let now = Utc::now();
        let store = Arc::new(
            FakeStore::default()
                .with_device("r1", "phone", now, false)
                .with_device("r1", "gone", now, false),
        );
        let service = NotificationService::new(
            store.clone(),
            Some(Arc::new(transport)),
            "https://admin.plateful.app",
        );
        (FakeOrders::with(sample_order("o1", "r1")), service, store)
    }

    #[tokio::test]
    async fn test_inserted_order_is_fanned_out() {
        let (orders, service, store) = setup(FakeTransport {
            failures: BTreeMap::from([("gone".to_string(), DeliveryFailure::Unregistered)]),
            ..FakeTransport::default()
        });

        let summary = notify_new_order(&orders, &service, "o1").await.unwrap();
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.pruned, 1);
        assert!(store.tokens("r1").contains(&("gone".to_string(), true)));
    }

    #[tokio::test]
    async fn test_unknown_or_malformed_payload_is_skipped() {
        let (orders, service, _) = setup(FakeTransport::default());
        assert!(notify_new_order(&orders, &service, "missing").await.is_none());
        assert!(notify_new_order(&orders, &service, "").await.is_none());
    }

    #[tokio::test]
    async fn test_total_dispatch_failure_yields_none() {
        let (orders, service, _) = setup(FakeTransport {
            down: true,
            ..FakeTransport::default()
        });
        assert!(notify_new_order(&orders, &service, "o1").await.is_none());
    }

    /// Transport that never answers for one token.
    struct StallingTransport {
        stalls_on: &'static str,
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PushTransport for StallingTransport {
        async fn send_multicast(
            &self,
            tokens: &[String],
            _message: &PushMessage,
        ) -> Result<Vec<SendOutcome>, PushError> {
            if tokens.iter().any(|t| t == self.stalls_on) {
                std::future::pending::<()>().await;
            }
            self.delivered.lock().unwrap().extend(tokens.iter().cloned());
            Ok(tokens.iter().map(|t| SendOutcome::delivered(t.clone())).collect())
        }
    }

    #[tokio::test]
    async fn test_slow_fan_out_does_not_block_later_orders() {
        let now = Utc::now();
        let store = Arc::new(
            FakeStore::default()
                .with_device("r-slow", "slow-phone", now, false)
                .with_device("r-fast", "fast-phone", now, false),
        );
        let transport = Arc::new(StallingTransport {
            stalls_on: "slow-phone",
            delivered: Mutex::new(Vec::new()),
        });
        let service = NotificationService::new(
            store,
            Some(transport.clone() as Arc<dyn PushTransport>),
            "https://admin.plateful.app",
        );
        let orders = FakeOrders::with(sample_order("o-slow", "r-slow"));
        let fast = sample_order("o-fast", "r-fast");
        orders.orders.lock().unwrap().insert(fast.id.clone(), fast);

        let payloads = futures::stream::iter(["o-slow", "o-fast"])
            .map(|p| Ok::<_, Infallible>(p.to_string()))
            .chain(futures::stream::pending());
        let job = tokio::spawn(dispatch_new_orders(payloads, Arc::new(orders), service));

        tokio::time::timeout(Duration::from_secs(5), async {
            while transport.delivered.lock().unwrap().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(*transport.delivered.lock().unwrap(), vec!["fast-phone"]);

        job.abort();
    }

    #[tokio::test]
    async fn test_dispatch_stops_on_stream_error() {
        let (orders, service, _) = setup(FakeTransport::default());
        let payloads = futures::stream::iter([Ok("o1".to_string()), Err("listener closed")]);
        let result = dispatch_new_orders(payloads, Arc::new(orders), service).await;
        assert_eq!(result, Err("listener closed"));
    }
}
