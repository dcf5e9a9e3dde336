//! Spawned subscription task and its handle.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{Instrument, debug, info_span, warn};

use plateful_core::order::Order;
use plateful_core::{OrderId, RestaurantId};

use super::arrivals::ArrivalTracker;
use super::feed::{OrderFeed, SyncError};
use crate::push::NEW_ORDER_TITLE;
use crate::push::setup::NotificationPermission;

/// How long a new-order alert stays up unless dismissed.
pub const ALERT_DURATION: Duration = Duration::from_secs(5);

const EVENT_BUFFER: usize = 32;

/// What the viewer is told.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SyncEvent {
    /// The complete current list, newest first.
    Snapshot { orders: Vec<Order> },
    /// Orders that appeared since the previous snapshot.
    Alert { order_ids: Vec<OrderId> },
    /// The alert expired or was dismissed.
    AlertCleared,
    /// The subscription failed. Nothing follows.
    Error { message: String },
}

impl SyncEvent {
    /// Event name used on the SSE wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Snapshot { .. } => "snapshot",
            Self::Alert { .. } => "alert",
            Self::AlertCleared => "alert_cleared",
            Self::Error { .. } => "error",
        }
    }

    fn error(err: &SyncError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }
}

/// Viewer input to a running adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncControl {
    /// Clear the current alert now.
    Dismiss,
    /// The viewer became visible (`true`) or hidden (`false`).
    SetVisible(bool),
}

/// Platform notifications shown while the board is not visible.
pub trait PlatformNotifier: Send + Sync {
    /// Permission previously granted by the user. Never prompts.
    fn permission(&self) -> NotificationPermission;

    /// Show a notification. Best effort.
    fn notify(&self, title: &str, body: &str);
}

/// Configures and starts a subscription.
pub struct SyncAdapter {
    feed: Arc<dyn OrderFeed>,
    notifier: Option<Arc<dyn PlatformNotifier>>,
    visible: bool,
}

impl SyncAdapter {
    /// Adapter for a visible viewer with no platform notifications.
    #[must_use]
    pub fn new(feed: Arc<dyn OrderFeed>) -> Self {
        Self {
            feed,
            notifier: None,
            visible: true,
        }
    }

    /// Request platform notifications for alerts raised while hidden.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn PlatformNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Initial visibility of the viewer.
    #[must_use]
    pub const fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Spawn the subscription task for `restaurant_id`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(self, restaurant_id: RestaurantId) -> SyncHandle {
        let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
        let (controls, controls_rx) = mpsc::unbounded_channel();

        let span = info_span!("order_sync", restaurant_id = %restaurant_id);
        let task = tokio::spawn(
            self.run(restaurant_id, events_tx, controls_rx)
                .instrument(span),
        );

        SyncHandle {
            events,
            controls,
            task,
        }
    }

    async fn run(
        self,
        restaurant_id: RestaurantId,
        events: mpsc::Sender<SyncEvent>,
        mut controls: mpsc::UnboundedReceiver<SyncControl>,
    ) {
        let mut snapshots = match self.feed.subscribe(&restaurant_id).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Order subscription failed");
                let _ = events.send(SyncEvent::error(&e)).await;
                return;
            }
        };

        let mut tracker = ArrivalTracker::new();
        let mut visible = self.visible;
        let mut clear_at: Option<Instant> = None;

        loop {
            let event = tokio::select! {
                item = snapshots.next() => match item {
                    Some(Ok(orders)) => {
                        let arrivals = tracker.observe(&orders);
                        if events.send(SyncEvent::Snapshot { orders }).await.is_err() {
                            return;
                        }
                        if arrivals.is_empty() {
                            continue;
                        }
                        clear_at = Some(Instant::now() + ALERT_DURATION);
                        if !visible {
                            self.notify_hidden(arrivals.len());
                        }
                        SyncEvent::Alert { order_ids: arrivals }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Order subscription failed");
                        let _ = events.send(SyncEvent::error(&e)).await;
                        return;
                    }
                    None => {
                        warn!("Order feed ended");
                        let _ = events.send(SyncEvent::error(&SyncError::Closed)).await;
                        return;
                    }
                },
                () = alert_expiry(clear_at) => {
                    clear_at = None;
                    SyncEvent::AlertCleared
                }
                Some(control) = controls.recv() => match control {
                    SyncControl::Dismiss => {
                        if clear_at.take().is_none() {
                            continue;
                        }
                        SyncEvent::AlertCleared
                    }
                    SyncControl::SetVisible(now_visible) => {
                        visible = now_visible;
                        continue;
                    }
                },
            };

            if events.send(event).await.is_err() {
                return;
            }
        }
    }

    fn notify_hidden(&self, count: usize) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if notifier.permission() != NotificationPermission::Granted {
            debug!("Notification permission not granted, skipping");
            return;
        }
        let body = if count == 1 {
            "1 new order received".to_string()
        } else {
            format!("{count} new orders received")
        };
        notifier.notify(NEW_ORDER_TITLE, &body);
    }
}

async fn alert_expiry(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Owner of a running subscription.
///
/// Dropping the handle aborts the task, which drops the feed stream and its
/// listener connection.
#[derive(Debug)]
pub struct SyncHandle {
    events: mpsc::Receiver<SyncEvent>,
    controls: mpsc::UnboundedSender<SyncControl>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Wait for the next event. `None` once the subscription has ended.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        self.events.recv().await
    }

    /// Clear the current alert before it expires.
    pub fn dismiss_alert(&self) {
        let _ = self.controls.send(SyncControl::Dismiss);
    }

    /// Report viewer visibility.
    pub fn set_visible(&self, visible: bool) {
        let _ = self.controls.send(SyncControl::SetVisible(visible));
    }

    /// Consume the handle as a stream of events; dropping the stream
    /// unsubscribes.
    pub fn into_stream(self) -> impl Stream<Item = SyncEvent> + Send + 'static {
        futures::stream::unfold(self, |mut handle| async move {
            handle.next_event().await.map(|event| (event, handle))
        })
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::channel::mpsc as feed_channel;

    use super::*;
    use crate::realtime::SnapshotStream;
    use crate::test_support::sample_order;

    pub(crate) type FeedSender = feed_channel::UnboundedSender<Result<Vec<Order>, SyncError>>;

    /// Feed whose snapshots are pushed by the test.
    pub(crate) struct FakeFeed {
        receiver: Mutex<Option<feed_channel::UnboundedReceiver<Result<Vec<Order>, SyncError>>>>,
    }

    impl FakeFeed {
        pub(crate) fn new() -> (FeedSender, Arc<Self>) {
            let (tx, rx) = feed_channel::unbounded();
            (
                tx,
                Arc::new(Self {
                    receiver: Mutex::new(Some(rx)),
                }),
            )
        }
    }

    #[async_trait]
    impl OrderFeed for FakeFeed {
        async fn subscribe(&self, _: &RestaurantId) -> Result<SnapshotStream, SyncError> {
            self.receiver
                .lock()
                .unwrap()
                .take()
                .map(|rx| rx.boxed())
                .ok_or(SyncError::Closed)
        }
    }

    struct FakeNotifier {
        permission: NotificationPermission,
        shown: Mutex<Vec<(String, String)>>,
    }

    impl FakeNotifier {
        fn new(permission: NotificationPermission) -> Arc<Self> {
            Arc::new(Self {
                permission,
                shown: Mutex::new(Vec::new()),
            })
        }
    }

    impl PlatformNotifier for FakeNotifier {
        fn permission(&self) -> NotificationPermission {
            self.permission
        }

        fn notify(&self, title: &str, body: &str) {
            self.shown
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
        }
    }

    fn snapshot(ids: &[&str]) -> Vec<Order> {
        ids.iter().map(|id| sample_order(id, "r1")).collect()
    }

    fn rid() -> RestaurantId {
        RestaurantId::parse("r1").unwrap()
    }

    async fn expect_snapshot(handle: &mut SyncHandle, len: usize) {
        match handle.next_event().await {
            Some(SyncEvent::Snapshot { orders }) => assert_eq!(orders.len(), len),
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    /// Push an initial snapshot and one new order, consuming both snapshots
    /// and the alert.
    async fn raise_alert(feed: &FeedSender, handle: &mut SyncHandle) {
        feed.unbounded_send(Ok(snapshot(&["a"]))).unwrap();
        expect_snapshot(handle, 1).await;
        feed.unbounded_send(Ok(snapshot(&["b", "a"]))).unwrap();
        expect_snapshot(handle, 2).await;
        assert_eq!(
            handle.next_event().await,
            Some(SyncEvent::Alert {
                order_ids: vec![OrderId::parse("b").unwrap()]
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_alert_clears_after_five_seconds() {
        let (feed, source) = FakeFeed::new();
        let mut handle = SyncAdapter::new(source).start(rid());

        raise_alert(&feed, &mut handle).await;
        let raised = Instant::now();

        assert_eq!(handle.next_event().await, Some(SyncEvent::AlertCleared));
        assert!(raised.elapsed() >= ALERT_DURATION);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_clears_immediately() {
        let (feed, source) = FakeFeed::new();
        let mut handle = SyncAdapter::new(source).start(rid());

        raise_alert(&feed, &mut handle).await;
        let raised = Instant::now();
        handle.dismiss_alert();

        assert_eq!(handle.next_event().await, Some(SyncEvent::AlertCleared));
        assert!(raised.elapsed() < ALERT_DURATION);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_snapshot_has_no_alert() {
        let (feed, source) = FakeFeed::new();
        let mut handle = SyncAdapter::new(source).start(rid());

        feed.unbounded_send(Ok(snapshot(&["a", "b"]))).unwrap();
        expect_snapshot(&mut handle, 2).await;
        feed.unbounded_send(Ok(snapshot(&["a", "b"]))).unwrap();
        expect_snapshot(&mut handle, 2).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_viewer_gets_platform_notification() {
        let (feed, source) = FakeFeed::new();
        let notifier = FakeNotifier::new(NotificationPermission::Granted);
        let mut handle = SyncAdapter::new(source)
            .with_notifier(notifier.clone())
            .visible(false)
            .start(rid());

        raise_alert(&feed, &mut handle).await;

        let shown = notifier.shown.lock().unwrap().clone();
        assert_eq!(
            shown,
            vec![("New Order!".to_string(), "1 new order received".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_visible_viewer_or_missing_permission_is_not_notified() {
        for (visible, permission) in [
            (true, NotificationPermission::Granted),
            (false, NotificationPermission::Denied),
            (false, NotificationPermission::Default),
        ] {
            let (feed, source) = FakeFeed::new();
            let notifier = FakeNotifier::new(permission);
            let mut handle = SyncAdapter::new(source)
                .with_notifier(notifier.clone())
                .visible(visible)
                .start(rid());

            raise_alert(&feed, &mut handle).await;
            assert!(notifier.shown.lock().unwrap().is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_change_applies_to_later_alerts() {
        let (feed, source) = FakeFeed::new();
        let notifier = FakeNotifier::new(NotificationPermission::Granted);
        let mut handle = SyncAdapter::new(source)
            .with_notifier(notifier.clone())
            .start(rid());

        handle.set_visible(false);
        raise_alert(&feed, &mut handle).await;
        assert_eq!(notifier.shown.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_is_final() {
        let (feed, source) = FakeFeed::new();
        let mut handle = SyncAdapter::new(source).start(rid());

        feed.unbounded_send(Ok(snapshot(&["a"]))).unwrap();
        expect_snapshot(&mut handle, 1).await;
        feed.unbounded_send(Err(SyncError::Closed)).unwrap();

        assert!(matches!(
            handle.next_event().await,
            Some(SyncEvent::Error { .. })
        ));
        assert_eq!(handle.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_failure_is_reported() {
        let (_feed, source) = FakeFeed::new();
        let _first = SyncAdapter::new(source.clone()).start(rid());
        // The fake hands its stream out once; a second subscriber fails.
        let mut second = SyncAdapter::new(source).start(rid());

        assert_eq!(
            second.next_event().await,
            Some(SyncEvent::Error {
                message: "order feed closed".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_dropping_handle_releases_feed() {
        let (feed, source) = FakeFeed::new();
        let mut handle = SyncAdapter::new(source).start(rid());
        feed.unbounded_send(Ok(snapshot(&["a"]))).unwrap();
        expect_snapshot(&mut handle, 1).await;

        drop(handle);
        for _ in 0..100 {
            if feed.is_closed() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(feed.is_closed());
    }

    #[test]
    fn test_event_wire_shape() {
        let event = SyncEvent::Alert {
            order_ids: vec![OrderId::parse("b").unwrap()],
        };
        assert_eq!(event.name(), "alert");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({ "type": "alert", "orderIds": ["b"] })
        );
    }
}
