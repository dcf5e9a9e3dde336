//! Push notification lifecycle: registration, fan-out, pruning and sweep.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{error, info, instrument, warn};

use plateful_core::RestaurantId;
use plateful_core::order::Order;

use super::error::PushError;
use super::payload::new_order_message;
use super::types::{
    DeliveryFailure, Device, DeviceRegistration, FanOutSummary, PushMessage, SendOutcome,
    SweepFailure, SweepReport,
};
use crate::db::RepositoryError;

/// Days without use after which a device is swept.
pub const STALE_AFTER_DAYS: i64 = 30;

/// Persistence for device registrations.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Insert or refresh a registration, clearing any soft-delete.
    async fn upsert(
        &self,
        restaurant_id: &RestaurantId,
        registration: &DeviceRegistration,
    ) -> Result<Device, RepositoryError>;

    /// Tokens of every non-deleted device of a restaurant.
    async fn live_tokens(&self, restaurant_id: &RestaurantId)
    -> Result<Vec<String>, RepositoryError>;

    /// Soft-delete the given tokens in one write. Returns rows changed.
    async fn soft_delete(
        &self,
        restaurant_id: &RestaurantId,
        tokens: &[String],
    ) -> Result<u64, RepositoryError>;

    /// Every restaurant that may own devices.
    async fn restaurant_ids(&self) -> Result<Vec<RestaurantId>, RepositoryError>;

    /// Hard-delete soft-deleted devices and devices unused since `cutoff`.
    async fn delete_stale(
        &self,
        restaurant_id: &RestaurantId,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;
}

/// Delivery of one message to many tokens.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Send `message` to every token, reporting one outcome per token.
    ///
    /// Returns an error only when the dispatch failed as a whole.
    async fn send_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<Vec<SendOutcome>, PushError>;
}

/// Push notification service.
///
/// Constructed once at startup and shared through `AppState`. Without a
/// transport (push not configured) fan-out is a logged no-op; registration
/// and sweeping still work.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn DeviceStore>,
    transport: Option<Arc<dyn PushTransport>>,
    dashboard_url: String,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub fn new(
        store: Arc<dyn DeviceStore>,
        transport: Option<Arc<dyn PushTransport>>,
        dashboard_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            dashboard_url: dashboard_url.into(),
        }
    }

    /// Whether a push transport is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Register (or refresh) a device for a restaurant.
    ///
    /// # Errors
    ///
    /// Returns `PushError::Store` if the upsert fails.
    #[instrument(skip(self, registration), fields(restaurant_id = %restaurant_id, user_id = %registration.user_id))]
    pub async fn register_device(
        &self,
        restaurant_id: &RestaurantId,
        registration: &DeviceRegistration,
    ) -> Result<Device, PushError> {
        let device = self.store.upsert(restaurant_id, registration).await?;
        info!(platform = %device.platform, "Device registered");
        Ok(device)
    }

    /// Soft-delete one device at the user's request.
    ///
    /// # Errors
    ///
    /// Returns `PushError::Store(RepositoryError::NotFound)` if the token is
    /// not registered for the restaurant.
    #[instrument(skip(self, token), fields(restaurant_id = %restaurant_id))]
    pub async fn unregister_device(
        &self,
        restaurant_id: &RestaurantId,
        token: &str,
    ) -> Result<(), PushError> {
        let changed = self
            .store
            .soft_delete(restaurant_id, &[token.to_owned()])
            .await?;
        if changed == 0 {
            return Err(RepositoryError::NotFound.into());
        }
        info!("Device unregistered");
        Ok(())
    }

    /// Notify every live device of the order's restaurant about a new order.
    ///
    /// Tokens FCM reports as unregistered or invalid are soft-deleted in one
    /// batch. Individual delivery failures are counted, not raised.
    ///
    /// # Errors
    ///
    /// Returns `PushError::Store` if devices cannot be listed, or
    /// `PushError::DispatchFailed` if the dispatch failed as a whole.
    #[instrument(skip(self, order), fields(order_id = %order.id, restaurant_id = %order.restaurant_id))]
    pub async fn fan_out_new_order(&self, order: &Order) -> Result<FanOutSummary, PushError> {
        let Some(transport) = &self.transport else {
            info!("Push not configured; skipping new order notification");
            return Ok(FanOutSummary::default());
        };

        let tokens = self.store.live_tokens(&order.restaurant_id).await?;
        if tokens.is_empty() {
            info!("No registered devices for restaurant");
            return Ok(FanOutSummary::default());
        }

        let message = new_order_message(order, &self.dashboard_url, Utc::now());
        let outcomes = match transport.send_multicast(&tokens, &message).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                error!(error = %e, sentry_event_id = %event_id, "New order dispatch failed");
                return Err(e);
            }
        };

        let delivered = outcomes.iter().filter(|o| o.result.is_ok()).count();
        let dead: Vec<String> = outcomes
            .iter()
            .filter(|o| o.result.as_ref().is_err_and(DeliveryFailure::is_permanent))
            .map(|o| o.token.clone())
            .collect();

        let pruned = if dead.is_empty() {
            0
        } else {
            match self.store.soft_delete(&order.restaurant_id, &dead).await {
                Ok(_) => dead.len(),
                Err(e) => {
                    warn!(error = %e, tokens = dead.len(), "Failed to prune invalid tokens");
                    0
                }
            }
        };

        let summary = FanOutSummary {
            attempted: tokens.len(),
            delivered,
            failed: outcomes.len() - delivered,
            pruned,
        };
        info!(
            attempted = summary.attempted,
            delivered = summary.delivered,
            failed = summary.failed,
            pruned = summary.pruned,
            "New order notification sent"
        );
        Ok(summary)
    }

    /// Hard-delete soft-deleted devices and devices unused for more than
    /// [`STALE_AFTER_DAYS`], restaurant by restaurant.
    ///
    /// A failure for one restaurant is logged and recorded in the report;
    /// the sweep continues with the next.
    ///
    /// # Errors
    ///
    /// Returns `PushError::Store` only if the restaurant list cannot be read.
    #[instrument(skip(self))]
    pub async fn sweep_stale_devices(&self, now: DateTime<Utc>) -> Result<SweepReport, PushError> {
        let cutoff = now - TimeDelta::days(STALE_AFTER_DAYS);
        let mut report = SweepReport::default();

        for restaurant_id in self.store.restaurant_ids().await? {
            match self.store.delete_stale(&restaurant_id, cutoff).await {
                Ok(deleted) => {
                    if deleted > 0 {
                        info!(restaurant_id = %restaurant_id, deleted, "Swept stale devices");
                    }
                    report.deleted += deleted;
                }
                Err(e) => {
                    error!(restaurant_id = %restaurant_id, error = %e, "Device sweep failed for restaurant");
                    report.failures.push(SweepFailure {
                        restaurant_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            deleted = report.deleted,
            failures = report.failures.len(),
            "Device sweep complete"
        );
        Ok(report)
    }
}
