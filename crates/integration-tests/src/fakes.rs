//! In-memory implementations of the admin storage and delivery seams.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};

use plateful_admin::db::RepositoryError;
use plateful_admin::push::{
    DeliveryFailure, Device, DeviceRegistration, DeviceStore, PushError, PushMessage,
    PushTransport, SendOutcome,
};
use plateful_admin::realtime::{OrderFeed, SnapshotStream, SyncError};
use plateful_admin::services::OrderStore;
use plateful_core::order::Order;
use plateful_core::{Email, OrderId, OrderStatus, RestaurantId, UserId};

/// Device table keyed by `(restaurant, token)`.
#[derive(Default)]
pub struct MemoryDevices {
    devices: Mutex<BTreeMap<(String, String), Device>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryDevices {
    /// Insert a device directly, bypassing registration.
    pub fn seed(&self, restaurant: &str, token: &str, last_used: DateTime<Utc>, deleted: bool) {
        let device = Device {
            restaurant_id: RestaurantId::parse(restaurant).unwrap(),
            token: token.to_string(),
            user_id: UserId::parse("chef").unwrap(),
            user_email: Email::parse("chef@example.com").unwrap(),
            platform: "web".into(),
            user_agent: "integration".into(),
            created_at: last_used,
            last_used,
            deleted,
        };
        self.devices
            .lock()
            .unwrap()
            .insert((restaurant.to_string(), token.to_string()), device);
    }

    /// Make every sweep of `restaurant` fail.
    pub fn fail_sweeps_for(&self, restaurant: &str) {
        self.failing.lock().unwrap().insert(restaurant.to_string());
    }

    /// Look up one device.
    pub fn device(&self, restaurant: &str, token: &str) -> Option<Device> {
        self.devices
            .lock()
            .unwrap()
            .get(&(restaurant.to_string(), token.to_string()))
            .cloned()
    }

    /// Every stored token of a restaurant, deleted or not, in token order.
    pub fn tokens(&self, restaurant: &str) -> Vec<String> {
        self.devices
            .lock()
            .unwrap()
            .keys()
            .filter(|(r, _)| r == restaurant)
            .map(|(_, t)| t.clone())
            .collect()
    }
}

#[async_trait]
impl DeviceStore for MemoryDevices {
    async fn upsert(
        &self,
        restaurant_id: &RestaurantId,
        registration: &DeviceRegistration,
    ) -> Result<Device, RepositoryError> {
        let now = Utc::now();
        let key = (restaurant_id.to_string(), registration.token.clone());
        let mut devices = self.devices.lock().unwrap();
        let created_at = devices.get(&key).map_or(now, |d| d.created_at);
        let device = Device {
            restaurant_id: restaurant_id.clone(),
            token: registration.token.clone(),
            user_id: registration.user_id.clone(),
            user_email: registration.user_email.clone(),
            platform: registration.platform.clone(),
            user_agent: registration.user_agent.clone(),
            created_at,
            last_used: now,
            deleted: false,
        };
        devices.insert(key, device.clone());
        Ok(device)
    }

    async fn live_tokens(
        &self,
        restaurant_id: &RestaurantId,
    ) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .devices
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.restaurant_id == *restaurant_id && !d.deleted)
            .map(|d| d.token.clone())
            .collect())
    }

    async fn soft_delete(
        &self,
        restaurant_id: &RestaurantId,
        tokens: &[String],
    ) -> Result<u64, RepositoryError> {
        let mut changed = 0;
        for device in self.devices.lock().unwrap().values_mut() {
            if device.restaurant_id == *restaurant_id
                && !device.deleted
                && tokens.contains(&device.token)
            {
                device.deleted = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn restaurant_ids(&self) -> Result<Vec<RestaurantId>, RepositoryError> {
        let mut ids: Vec<String> = self
            .devices
            .lock()
            .unwrap()
            .keys()
            .map(|(r, _)| r.clone())
            .chain(self.failing.lock().unwrap().iter().cloned())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids
            .iter()
            .map(|r| RestaurantId::parse(r).unwrap())
            .collect())
    }

    async fn delete_stale(
        &self,
        restaurant_id: &RestaurantId,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        if self.failing.lock().unwrap().contains(restaurant_id.as_str()) {
            return Err(RepositoryError::DataCorruption(
                "devices table unreadable".into(),
            ));
        }
        let mut devices = self.devices.lock().unwrap();
        let before = devices.len();
        devices.retain(|_, d| {
            d.restaurant_id != *restaurant_id || !(d.deleted || d.last_used < cutoff)
        });
        Ok((before - devices.len()) as u64)
    }
}

/// Transport that records every dispatch and rejects configured tokens.
#[derive(Default)]
pub struct RecordingTransport {
    rejected: HashMap<String, DeliveryFailure>,
    sent: Mutex<Vec<(Vec<String>, PushMessage)>>,
}

impl RecordingTransport {
    /// Report `token` as failing with `failure` on every dispatch.
    #[must_use]
    pub fn rejecting(mut self, token: &str, failure: DeliveryFailure) -> Self {
        self.rejected.insert(token.to_string(), failure);
        self
    }

    /// Dispatches so far, in order.
    pub fn sent(&self) -> Vec<(Vec<String>, PushMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn send_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<Vec<SendOutcome>, PushError> {
        self.sent
            .lock()
            .unwrap()
            .push((tokens.to_vec(), message.clone()));
        Ok(tokens
            .iter()
            .map(|t| match self.rejected.get(t) {
                Some(failure) => SendOutcome::failed(t.clone(), failure.clone()),
                None => SendOutcome::delivered(t.clone()),
            })
            .collect())
    }
}

/// Order table with compare-and-set status writes.
#[derive(Default)]
pub struct MemoryOrders {
    orders: Mutex<HashMap<OrderId, Order>>,
}

impl MemoryOrders {
    /// Store or replace an order.
    pub fn insert(&self, order: Order) {
        self.orders.lock().unwrap().insert(order.id.clone(), order);
    }

    /// Current stored status.
    pub fn status(&self, id: &str) -> Option<OrderStatus> {
        self.orders
            .lock()
            .unwrap()
            .get(&OrderId::parse(id).unwrap())
            .map(|o| o.status)
    }

    /// Every order of a restaurant, newest first.
    pub fn snapshot(&self, restaurant: &str) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .lock()
            .unwrap()
            .values()
            .filter(|o| o.restaurant_id.as_str() == restaurant)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }
}

#[async_trait]
impl OrderStore for MemoryOrders {
    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.lock().unwrap().get(id).cloned())
    }

    async fn compare_and_set(
        &self,
        id: &OrderId,
        current: OrderStatus,
        target: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if order.status != current {
            return Err(RepositoryError::Conflict(format!(
                "order status is {}",
                order.status
            )));
        }
        order.status = target;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}

type SnapshotItem = Result<Vec<Order>, SyncError>;

struct FeedChannel {
    sender: UnboundedSender<SnapshotItem>,
    receiver: Option<UnboundedReceiver<SnapshotItem>>,
}

/// Feed driven by the test: one channel per restaurant, subscribable once.
#[derive(Default)]
pub struct ChannelFeed {
    channels: Mutex<HashMap<String, FeedChannel>>,
}

impl ChannelFeed {
    fn with_channel<T>(&self, restaurant: &str, f: impl FnOnce(&mut FeedChannel) -> T) -> T {
        let mut channels = self.channels.lock().unwrap();
        let channel = channels.entry(restaurant.to_string()).or_insert_with(|| {
            let (sender, receiver) = mpsc::unbounded();
            FeedChannel {
                sender,
                receiver: Some(receiver),
            }
        });
        f(channel)
    }

    /// Deliver a snapshot. Snapshots sent before subscription are queued.
    pub fn publish(&self, restaurant: &str, orders: Vec<Order>) {
        self.with_channel(restaurant, |c| {
            let _ = c.sender.unbounded_send(Ok(orders));
        });
    }

    /// End the restaurant's stream with an error.
    pub fn fail(&self, restaurant: &str, error: SyncError) {
        self.with_channel(restaurant, |c| {
            let _ = c.sender.unbounded_send(Err(error));
        });
    }

    /// Whether the subscriber dropped its end.
    pub fn is_released(&self, restaurant: &str) -> bool {
        self.with_channel(restaurant, |c| c.sender.is_closed())
    }
}

#[async_trait]
impl OrderFeed for ChannelFeed {
    async fn subscribe(&self, restaurant_id: &RestaurantId) -> Result<SnapshotStream, SyncError> {
        self.with_channel(restaurant_id.as_str(), |c| c.receiver.take())
            .map(|rx| rx.boxed())
            .ok_or(SyncError::Closed)
    }
}
