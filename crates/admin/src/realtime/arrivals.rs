//! New-order detection between consecutive snapshots.

use std::collections::HashSet;

use plateful_core::OrderId;
use plateful_core::order::Order;

/// Remembers the ids of the previous snapshot.
///
/// The first snapshot, and any snapshot following an empty one, never
/// reports arrivals: a restaurant's backlog is not "new" when the board
/// opens.
#[derive(Debug, Default)]
pub struct ArrivalTracker {
    previous: HashSet<OrderId>,
}

impl ArrivalTracker {
    /// Create a tracker that has not seen any snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `orders` as the current snapshot and return the ids that were
    /// not in the previous one, in snapshot order.
    pub fn observe(&mut self, orders: &[Order]) -> Vec<OrderId> {
        let arrivals = if self.previous.is_empty() {
            Vec::new()
        } else {
            orders
                .iter()
                .filter(|o| !self.previous.contains(&o.id))
                .map(|o| o.id.clone())
                .collect()
        };

        self.previous = orders.iter().map(|o| o.id.clone()).collect();
        arrivals
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::sample_order;

    fn snapshot(ids: &[&str]) -> Vec<Order> {
        ids.iter().map(|id| sample_order(id, "r1")).collect()
    }

    fn ids(raw: &[&str]) -> Vec<OrderId> {
        raw.iter().map(|id| OrderId::parse(id).unwrap()).collect()
    }

    #[test]
    fn test_initial_snapshot_never_alerts() {
        let mut tracker = ArrivalTracker::new();
        assert!(tracker.observe(&snapshot(&["a", "b"])).is_empty());
    }

    #[test]
    fn test_new_id_is_reported() {
        let mut tracker = ArrivalTracker::new();
        tracker.observe(&snapshot(&["a"]));
        assert_eq!(tracker.observe(&snapshot(&["b", "a"])), ids(&["b"]));
    }

    #[test]
    fn test_status_change_is_not_an_arrival() {
        let mut tracker = ArrivalTracker::new();
        tracker.observe(&snapshot(&["a", "b"]));
        assert!(tracker.observe(&snapshot(&["a", "b"])).is_empty());
    }

    #[test]
    fn test_first_order_after_empty_board_does_not_alert() {
        let mut tracker = ArrivalTracker::new();
        tracker.observe(&[]);
        assert!(tracker.observe(&snapshot(&["a"])).is_empty());
        assert_eq!(tracker.observe(&snapshot(&["b", "a"])), ids(&["b"]));
    }

    #[test]
    fn test_removal_then_readd_alerts_again() {
        let mut tracker = ArrivalTracker::new();
        tracker.observe(&snapshot(&["a", "b"]));
        tracker.observe(&snapshot(&["a"]));
        assert_eq!(tracker.observe(&snapshot(&["b", "a"])), ids(&["b"]));
    }
}
