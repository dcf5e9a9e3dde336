//! Test data builders.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use plateful_admin::config::{AdminConfig, FcmConfig};
use plateful_admin::push::{NotificationService, PushTransport};
use plateful_admin::state::AppState;
use plateful_core::cart::{Cart, CartItem};
use plateful_core::order::{CustomerInfo, Order};
use plateful_core::{Email, MenuItemId, Money, OrderId, OrderStatus, RestaurantId};

use crate::fakes::{ChannelFeed, MemoryDevices, MemoryOrders};

/// A menu item priced in cents.
pub fn cart_item(id: &str, restaurant: &str, name: &str, cents: i64) -> CartItem {
    CartItem {
        item_id: MenuItemId::parse(id).unwrap(),
        restaurant_id: RestaurantId::parse(restaurant).unwrap(),
        name: name.to_string(),
        unit_price: Money::from_cents(cents),
    }
}

/// An order of two 10.00 items and one 5.00 item, `age_minutes` old.
pub fn order(id: &str, restaurant: &str, status: OrderStatus, age_minutes: i64) -> Order {
    let mut cart = Cart::new();
    cart.add_item(&cart_item("curry", restaurant, "Green Curry", 1000), 2)
        .unwrap();
    cart.add_item(&cart_item("rice", restaurant, "Jasmine Rice", 500), 1)
        .unwrap();
    let totals = cart.totals();
    let created_at = Utc::now() - TimeDelta::minutes(age_minutes);

    Order {
        id: OrderId::parse(id).unwrap(),
        restaurant_id: RestaurantId::parse(restaurant).unwrap(),
        lines: cart.to_order_lines(),
        customer: CustomerInfo {
            name: "Alex Diner".into(),
            email: Email::parse("alex@example.com").unwrap(),
            phone: "555-0101".into(),
            address: "12 Elm St".into(),
            notes: None,
        },
        status,
        subtotal: totals.subtotal,
        tax: totals.tax,
        total: totals.total,
        created_at,
        updated_at: created_at,
    }
}

/// Admin configuration for in-process tests, optionally with FCM set.
pub fn admin_config(with_fcm: bool) -> AdminConfig {
    AdminConfig {
        database_url: SecretString::from("postgres://localhost/plateful_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "https://admin.plateful.test".into(),
        cleanup_hour_utc: 3,
        fcm: with_fcm.then(|| FcmConfig {
            project_id: "plateful-test".into(),
            access_token: SecretString::from("ya29.test-access-token-9f8e7d6c5b4a"),
            vapid_public_key: "BKtestVapidPublicKey".into(),
        }),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A pool that never connects unless a handler touches the database.
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://localhost/plateful_test")
        .unwrap()
}

/// In-memory backends behind an [`AppState`].
pub struct TestApp {
    pub state: AppState,
    pub devices: Arc<MemoryDevices>,
    pub orders: Arc<MemoryOrders>,
    pub feed: Arc<ChannelFeed>,
}

/// Build state over in-memory stores. With a transport, push is enabled.
pub fn test_app(transport: Option<Arc<dyn PushTransport>>) -> TestApp {
    let config = admin_config(transport.is_some());
    let devices = Arc::new(MemoryDevices::default());
    let orders = Arc::new(MemoryOrders::default());
    let feed = Arc::new(ChannelFeed::default());

    let notifications =
        NotificationService::new(devices.clone(), transport, config.base_url.clone());
    let state = AppState::from_parts(
        config,
        lazy_pool(),
        notifications,
        orders.clone(),
        feed.clone(),
    );

    TestApp {
        state,
        devices,
        orders,
        feed,
    }
}
