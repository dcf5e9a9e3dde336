//! Cart to order snapshot, across the persisted form.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use plateful_core::cart::{Cart, CartError, PersistedCart};
use plateful_core::order::CustomerForm;
use plateful_core::{Money, OrderStatus};
use plateful_integration_tests::fixtures::{cart_item, order};

#[test]
fn test_browse_fill_and_snapshot() {
    let curry = cart_item("curry", "thai-garden", "Green Curry", 1250);
    let rice = cart_item("rice", "thai-garden", "Jasmine Rice", 300);
    let pizza = cart_item("margherita", "luigis", "Margherita", 1100);

    let mut cart = Cart::new();
    cart.add_item(&curry, 1).unwrap();
    cart.add_item(&rice, 2).unwrap();
    cart.add_item(&curry, 1).unwrap();

    // A second restaurant is refused and the cart is untouched.
    let before = cart.clone();
    assert!(matches!(
        cart.add_item(&pizza, 1),
        Err(CartError::DifferentRestaurant { .. })
    ));
    assert_eq!(cart, before);

    assert_eq!(cart.lines().len(), 2);
    assert_eq!(cart.item_count(), 4);
    let totals = cart.totals();
    assert_eq!(totals.subtotal, Money::from_cents(3100));
    assert_eq!(totals.tax, Money::from_cents(310));
    assert_eq!(totals.total, Money::from_cents(3410));

    let lines = cart.to_order_lines();
    assert_eq!(lines[0].item_id.as_str(), "curry");
    assert_eq!(lines[0].quantity, 2);
    assert_eq!(lines[0].line_subtotal, Money::from_cents(2500));
}

#[test]
fn test_emptying_cart_releases_restaurant() {
    let curry = cart_item("curry", "thai-garden", "Green Curry", 1250);
    let pizza = cart_item("margherita", "luigis", "Margherita", 1100);

    let mut cart = Cart::new();
    cart.add_item(&curry, 3).unwrap();
    cart.update_quantity(&curry.item_id, 0);
    assert!(cart.is_empty());
    assert_eq!(cart.totals().total, Money::ZERO);

    cart.add_item(&pizza, 1).unwrap();
    assert_eq!(cart.lines()[0].restaurant_id().as_str(), "luigis");
}

#[test]
fn test_persisted_cart_survives_reload() {
    let mut cart = Cart::new();
    cart.add_item(&cart_item("curry", "thai-garden", "Green Curry", 1250), 2)
        .unwrap();

    let json = serde_json::to_string(&cart.to_persisted()).unwrap();
    assert!(json.contains("\"boundRestaurantId\":\"thai-garden\""));

    let restored = Cart::restore(serde_json::from_str::<PersistedCart>(&json).unwrap()).unwrap();
    assert_eq!(restored, cart);
}

#[test]
fn test_tampered_cart_is_rejected_on_reload() {
    let json = r#"{
        "lines": [
            { "itemId": "curry", "restaurantId": "thai-garden", "name": "Green Curry",
              "unitPrice": "12.50", "quantity": 1 },
            { "itemId": "margherita", "restaurantId": "luigis", "name": "Margherita",
              "unitPrice": "11.00", "quantity": 1 }
        ],
        "boundRestaurantId": "thai-garden"
    }"#;
    let persisted: PersistedCart = serde_json::from_str(json).unwrap();
    assert!(Cart::restore(persisted).is_err());
}

#[test]
fn test_checkout_form_reports_every_problem() {
    let errors = CustomerForm {
        name: "  ".into(),
        email: "not-an-email".into(),
        phone: String::new(),
        address: "12 Elm St".into(),
        notes: None,
    }
    .validate()
    .unwrap_err();

    let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
    assert_eq!(fields, ["name", "phone", "email"]);
}

#[test]
fn test_order_snapshot_is_consistent() {
    let order = order("o1", "thai-garden", OrderStatus::Pending, 0);
    order.validate().unwrap();
    assert_eq!(order.total, Money::from_cents(2750));
    assert_eq!(order.item_count(), 3);
}
