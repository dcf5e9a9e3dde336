//! Kanban order board.
//!
//! [`BoardView`] groups a snapshot into one column per board status and
//! derives urgency at render time. [`BoardSession`] is the viewer-side state
//! fed by [`SyncEvent`]s: the latest snapshot, which orders have a
//! transition in flight, the current alert, and errors.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use plateful_core::order::Order;
use plateful_core::{OrderId, OrderStatus, RestaurantId, TransitionError};

use crate::realtime::SyncEvent;
use crate::services::orders::TransitionRequest;

/// An order as shown on the board.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCard {
    #[serde(flatten)]
    pub order: Order,
    pub urgent: bool,
    /// Status the board's single action moves to.
    pub next_status: Option<OrderStatus>,
    pub action_label: Option<&'static str>,
    pub updating: bool,
}

/// One status column, newest order first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub status: OrderStatus,
    pub label: &'static str,
    pub count: usize,
    pub orders: Vec<OrderCard>,
}

/// The whole board at one instant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub columns: Vec<BoardColumn>,
    pub urgent_count: usize,
    pub generated_at: DateTime<Utc>,
}

impl BoardView {
    /// Group `orders` into columns as of `now`. Cancelled orders are not shown.
    #[must_use]
    pub fn build(orders: &[Order], now: DateTime<Utc>) -> Self {
        Self::build_with_updating(orders, now, &HashSet::new())
    }

    /// Like [`BoardView::build`], marking the orders in `updating`.
    #[must_use]
    pub fn build_with_updating(
        orders: &[Order],
        now: DateTime<Utc>,
        updating: &HashSet<OrderId>,
    ) -> Self {
        let columns: Vec<BoardColumn> = OrderStatus::BOARD_COLUMNS
            .iter()
            .map(|&status| {
                let mut cards: Vec<OrderCard> = orders
                    .iter()
                    .filter(|o| o.status == status)
                    .map(|o| OrderCard {
                        order: o.clone(),
                        urgent: o.is_urgent(now),
                        next_status: status.admin_next(),
                        action_label: status.admin_action_label(),
                        updating: updating.contains(&o.id),
                    })
                    .collect();
                cards.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at));

                BoardColumn {
                    status,
                    label: status.label(),
                    count: cards.len(),
                    orders: cards,
                }
            })
            .collect();

        let urgent_count = columns
            .iter()
            .flat_map(|c| &c.orders)
            .filter(|card| card.urgent)
            .count();

        Self {
            columns,
            urgent_count,
            generated_at: now,
        }
    }

    /// The column for `status`, if it is shown.
    #[must_use]
    pub fn column(&self, status: OrderStatus) -> Option<&BoardColumn> {
        self.columns.iter().find(|c| c.status == status)
    }
}

/// Why the board refused to start a transition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardActionError {
    #[error("order {0} is not on the board")]
    UnknownOrder(OrderId),

    #[error("order {0} is already being updated")]
    AlreadyUpdating(OrderId),

    #[error(transparent)]
    Invalid(#[from] TransitionError),
}

/// Viewer-side board state.
///
/// Status is only ever changed by snapshots. A failed transition leaves the
/// order as it was and records an error; the next snapshot reconciles.
#[derive(Debug)]
pub struct BoardSession {
    restaurant_id: RestaurantId,
    orders: Vec<Order>,
    updating: HashSet<OrderId>,
    alert: Option<Vec<OrderId>>,
    sync_error: Option<String>,
    action_error: Option<String>,
}

impl BoardSession {
    /// Empty board for a restaurant.
    #[must_use]
    pub fn new(restaurant_id: RestaurantId) -> Self {
        Self {
            restaurant_id,
            orders: Vec::new(),
            updating: HashSet::new(),
            alert: None,
            sync_error: None,
            action_error: None,
        }
    }

    /// Fold one sync event into the board.
    pub fn apply(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Snapshot { orders } => self.orders = orders,
            SyncEvent::Alert { order_ids } => self.alert = Some(order_ids),
            SyncEvent::AlertCleared => self.alert = None,
            SyncEvent::Error { message } => self.sync_error = Some(message),
        }
    }

    /// Mark `order_id` as updating and build the request to send.
    ///
    /// # Errors
    ///
    /// Returns a [`BoardActionError`] if the order is unknown, already has a
    /// transition in flight, or cannot move to `target`.
    pub fn begin_transition(
        &mut self,
        order_id: &OrderId,
        target: OrderStatus,
    ) -> Result<TransitionRequest, BoardActionError> {
        let order = self
            .orders
            .iter()
            .find(|o| &o.id == order_id)
            .ok_or_else(|| BoardActionError::UnknownOrder(order_id.clone()))?;
        if self.updating.contains(order_id) {
            return Err(BoardActionError::AlreadyUpdating(order_id.clone()));
        }
        order.status.check_transition(target)?;

        let request = TransitionRequest {
            order_id: order_id.clone(),
            restaurant_id: self.restaurant_id.clone(),
            target,
            expected: Some(order.status),
        };
        self.updating.insert(order_id.clone());
        self.action_error = None;
        Ok(request)
    }

    /// Clear the updating marker for `order_id`, keeping `error` if the
    /// remote update failed.
    pub fn finish_transition(&mut self, order_id: &OrderId, error: Option<String>) {
        self.updating.remove(order_id);
        if let Some(message) = error {
            tracing::warn!(order_id = %order_id, error = %message, "Status update failed");
            self.action_error = Some(message);
        }
    }

    /// Current snapshot, newest first.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Whether a transition is in flight for `order_id`.
    #[must_use]
    pub fn is_updating(&self, order_id: &OrderId) -> bool {
        self.updating.contains(order_id)
    }

    /// Orders named by the active new-order alert.
    #[must_use]
    pub fn alert(&self) -> Option<&[OrderId]> {
        self.alert.as_deref()
    }

    /// The subscription error, once one has occurred.
    #[must_use]
    pub fn sync_error(&self) -> Option<&str> {
        self.sync_error.as_deref()
    }

    /// The last failed transition.
    #[must_use]
    pub fn action_error(&self) -> Option<&str> {
        self.action_error.as_deref()
    }

    /// Render the board as of `now`.
    #[must_use]
    pub fn view(&self, now: DateTime<Utc>) -> BoardView {
        BoardView::build_with_updating(&self.orders, now, &self.updating)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::test_support::sample_order;

    fn order(id: &str, status: OrderStatus, age_minutes: i64, now: DateTime<Utc>) -> Order {
        let mut order = sample_order(id, "r1");
        order.status = status;
        order.created_at = now - TimeDelta::minutes(age_minutes);
        order
    }

    fn id(raw: &str) -> OrderId {
        OrderId::parse(raw).unwrap()
    }

    #[test]
    fn test_columns_follow_board_order_without_cancelled() {
        let now = Utc::now();
        let orders = vec![
            order("a", OrderStatus::Cancelled, 1, now),
            order("b", OrderStatus::Ready, 1, now),
        ];
        let view = BoardView::build(&orders, now);

        let statuses: Vec<OrderStatus> = view.columns.iter().map(|c| c.status).collect();
        assert_eq!(statuses, OrderStatus::BOARD_COLUMNS.to_vec());
        assert!(view.column(OrderStatus::Cancelled).is_none());
        assert_eq!(view.column(OrderStatus::Ready).unwrap().count, 1);
    }

    #[test]
    fn test_columns_are_newest_first() {
        let now = Utc::now();
        let orders = vec![
            order("old", OrderStatus::Pending, 20, now),
            order("new", OrderStatus::Pending, 1, now),
            order("mid", OrderStatus::Pending, 10, now),
        ];
        let view = BoardView::build(&orders, now);
        let ids: Vec<&str> = view.columns[0]
            .orders
            .iter()
            .map(|c| c.order.id.as_str())
            .collect();
        assert_eq!(ids, ["new", "mid", "old"]);
    }

    #[test]
    fn test_urgency_is_pending_and_over_thirty_minutes() {
        let now = Utc::now();
        let orders = vec![
            order("late", OrderStatus::Pending, 31, now),
            order("fresh", OrderStatus::Pending, 29, now),
            order("cooking", OrderStatus::Preparing, 90, now),
        ];
        let view = BoardView::build(&orders, now);

        assert_eq!(view.urgent_count, 1);
        let pending = view.column(OrderStatus::Pending).unwrap();
        assert!(pending.orders[1].urgent);
        assert!(!pending.orders[0].urgent);
        assert!(!view.column(OrderStatus::Preparing).unwrap().orders[0].urgent);
    }

    #[test]
    fn test_cards_offer_the_admin_action() {
        let now = Utc::now();
        let view = BoardView::build(&[order("a", OrderStatus::Pending, 1, now)], now);
        let card = &view.column(OrderStatus::Pending).unwrap().orders[0];
        assert_eq!(card.next_status, Some(OrderStatus::Preparing));
        assert_eq!(card.action_label, OrderStatus::Pending.admin_action_label());

        let view = BoardView::build(&[order("b", OrderStatus::Delivered, 1, now)], now);
        let card = &view.column(OrderStatus::Delivered).unwrap().orders[0];
        assert_eq!(card.next_status, None);
    }

    fn session_with(orders: Vec<Order>) -> BoardSession {
        let mut session = BoardSession::new(RestaurantId::parse("r1").unwrap());
        session.apply(SyncEvent::Snapshot { orders });
        session
    }

    #[test]
    fn test_begin_marks_updating_and_blocks_double_submit() {
        let now = Utc::now();
        let mut session = session_with(vec![order("a", OrderStatus::Pending, 1, now)]);

        let request = session
            .begin_transition(&id("a"), OrderStatus::Preparing)
            .unwrap();
        assert_eq!(request.expected, Some(OrderStatus::Pending));
        assert!(session.is_updating(&id("a")));
        assert!(session.view(now).columns[0].orders[0].updating);

        assert_eq!(
            session.begin_transition(&id("a"), OrderStatus::Preparing),
            Err(BoardActionError::AlreadyUpdating(id("a")))
        );
    }

    #[test]
    fn test_invalid_transition_does_not_mark_updating() {
        let now = Utc::now();
        let mut session = session_with(vec![order("a", OrderStatus::Pending, 1, now)]);

        let result = session.begin_transition(&id("a"), OrderStatus::Delivered);
        assert!(matches!(result, Err(BoardActionError::Invalid(_))));
        assert!(!session.is_updating(&id("a")));

        assert_eq!(
            session.begin_transition(&id("zzz"), OrderStatus::Preparing),
            Err(BoardActionError::UnknownOrder(id("zzz")))
        );
    }

    #[test]
    fn test_failed_update_keeps_status_and_reports() {
        let now = Utc::now();
        let mut session = session_with(vec![order("a", OrderStatus::Pending, 1, now)]);

        session
            .begin_transition(&id("a"), OrderStatus::Preparing)
            .unwrap();
        session.finish_transition(&id("a"), Some("network down".to_string()));

        assert!(!session.is_updating(&id("a")));
        assert_eq!(session.orders()[0].status, OrderStatus::Pending);
        assert_eq!(session.action_error(), Some("network down"));
    }

    #[test]
    fn test_snapshot_reconciles_status() {
        let now = Utc::now();
        let mut session = session_with(vec![order("a", OrderStatus::Pending, 1, now)]);

        session
            .begin_transition(&id("a"), OrderStatus::Preparing)
            .unwrap();
        session.finish_transition(&id("a"), None);
        assert_eq!(session.orders()[0].status, OrderStatus::Pending);

        session.apply(SyncEvent::Snapshot {
            orders: vec![order("a", OrderStatus::Preparing, 1, now)],
        });
        assert_eq!(session.orders()[0].status, OrderStatus::Preparing);
        assert_eq!(session.action_error(), None);
    }

    #[test]
    fn test_alert_and_sticky_error() {
        let mut session = session_with(Vec::new());

        session.apply(SyncEvent::Alert {
            order_ids: vec![id("a")],
        });
        assert_eq!(session.alert(), Some(&[id("a")][..]));
        session.apply(SyncEvent::AlertCleared);
        assert_eq!(session.alert(), None);

        session.apply(SyncEvent::Error {
            message: "listener lost".to_string(),
        });
        session.apply(SyncEvent::Snapshot { orders: Vec::new() });
        assert_eq!(session.sync_error(), Some("listener lost"));
    }
}
