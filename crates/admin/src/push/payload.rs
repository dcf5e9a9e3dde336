//! New-order notification payload.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use plateful_core::order::Order;

use super::types::PushMessage;

/// Title shown on every new-order notification.
pub const NEW_ORDER_TITLE: &str = "New Order!";

/// Value of the `type` data field.
pub const NEW_ORDER_TYPE: &str = "new_order";

const DEFAULT_SOUND: &str = "default";

/// Dashboard page a notification click opens.
#[must_use]
pub fn dashboard_link(base_url: &str, order: &Order) -> String {
    format!(
        "{}/restaurants/{}/orders",
        base_url.trim_end_matches('/'),
        order.restaurant_id
    )
}

/// Build the notification for a freshly placed order.
///
/// The body reads `Order #<ref> • <n> item(s) • $<total>` where `<ref>` is
/// the first eight characters of the order id, uppercased.
#[must_use]
pub fn new_order_message(order: &Order, base_url: &str, now: DateTime<Utc>) -> PushMessage {
    let item_count = order.item_count();
    let body = format!(
        "Order #{} • {} item(s) • {}",
        order.id.short_ref(),
        item_count,
        order.total.display()
    );

    let data = BTreeMap::from([
        ("orderId".to_string(), order.id.to_string()),
        ("restaurantId".to_string(), order.restaurant_id.to_string()),
        ("total".to_string(), format!("{:.2}", order.total.rounded())),
        ("itemCount".to_string(), item_count.to_string()),
        ("timestamp".to_string(), now.to_rfc3339()),
        ("type".to_string(), NEW_ORDER_TYPE.to_string()),
    ]);

    PushMessage {
        title: NEW_ORDER_TITLE.to_string(),
        body,
        data,
        link: dashboard_link(base_url, order),
        sound: Some(DEFAULT_SOUND.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::test_support::sample_order;

    #[test]
    fn test_new_order_body() {
        let order = sample_order("a1b2c3d4e5f6", "thai-garden");
        let message = new_order_message(&order, "https://admin.plateful.app/", Utc::now());
        assert_eq!(message.title, "New Order!");
        assert_eq!(message.body, "Order #A1B2C3D4 • 3 item(s) • $27.50");
        assert_eq!(
            message.link,
            "https://admin.plateful.app/restaurants/thai-garden/orders"
        );
    }

    #[test]
    fn test_data_fields_are_strings() {
        let order = sample_order("a1b2c3d4e5f6", "thai-garden");
        let now = Utc::now();
        let message = new_order_message(&order, "https://admin.plateful.app", now);
        assert_eq!(message.data["orderId"], "a1b2c3d4e5f6");
        assert_eq!(message.data["restaurantId"], "thai-garden");
        assert_eq!(message.data["total"], "27.50");
        assert_eq!(message.data["itemCount"], "3");
        assert_eq!(message.data["timestamp"], now.to_rfc3339());
        assert_eq!(message.data["type"], "new_order");
        assert_eq!(message.data.len(), 6);
    }
}
