//! Fixtures shared by unit tests.

#![allow(clippy::unwrap_used)]

use chrono::Utc;

use plateful_core::cart::{Cart, CartItem};
use plateful_core::order::{CustomerInfo, Order};
use plateful_core::{Email, MenuItemId, Money, OrderId, OrderStatus, RestaurantId};

/// An order for `restaurant` with 2 × 10.00 and 1 × 5.00.
pub fn sample_order(id: &str, restaurant: &str) -> Order {
    let restaurant_id = RestaurantId::parse(restaurant).unwrap();
    let mut cart = Cart::new();
    for (item, cents, qty) in [("pad-thai", 1000, 2), ("spring-rolls", 500, 1)] {
        cart.add_item(
            &CartItem {
                item_id: MenuItemId::parse(item).unwrap(),
                restaurant_id: restaurant_id.clone(),
                name: item.to_string(),
                unit_price: Money::from_cents(cents),
            },
            qty,
        )
        .unwrap();
    }
    let totals = cart.totals();
    let now = Utc::now();
    Order {
        id: OrderId::parse(id).unwrap(),
        restaurant_id,
        lines: cart.to_order_lines(),
        customer: CustomerInfo {
            name: "Sam".into(),
            email: Email::parse("sam@example.com").unwrap(),
            phone: "555-0100".into(),
            address: "1 Main St".into(),
            notes: None,
        },
        status: OrderStatus::Pending,
        subtotal: totals.subtotal,
        tax: totals.tax,
        total: totals.total,
        created_at: now,
        updated_at: now,
    }
}
