//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::db::PgDeviceStore;
use crate::push::{FcmClient, NotificationService, PushClientConfig, PushTransport};
use crate::realtime::{OrderFeed, PgOrderFeed};
use crate::services::{OrderStore, PgOrderStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    notifications: NotificationService,
    orders: Arc<dyn OrderStore>,
    feed: Arc<dyn OrderFeed>,
}

impl AppState {
    /// Create the production state: `PostgreSQL` stores, and FCM delivery
    /// when it is configured.
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool) -> Self {
        let transport = config
            .fcm()
            .map(|fcm| Arc::new(FcmClient::new(fcm)) as Arc<dyn PushTransport>);
        let notifications = NotificationService::new(
            Arc::new(PgDeviceStore::new(pool.clone())),
            transport,
            config.base_url.clone(),
        );

        Self::from_parts(
            config,
            pool.clone(),
            notifications,
            Arc::new(PgOrderStore::new(pool.clone())),
            Arc::new(PgOrderFeed::new(pool)),
        )
    }

    /// Assemble state from explicit components.
    #[must_use]
    pub fn from_parts(
        config: AdminConfig,
        pool: PgPool,
        notifications: NotificationService,
        orders: Arc<dyn OrderStore>,
        feed: Arc<dyn OrderFeed>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                notifications,
                orders,
                feed,
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the push notification service.
    #[must_use]
    pub fn notifications(&self) -> &NotificationService {
        &self.inner.notifications
    }

    /// Get the order store used for status transitions.
    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    /// Shared handle to the order store, for background jobs.
    #[must_use]
    pub fn order_store(&self) -> Arc<dyn OrderStore> {
        Arc::clone(&self.inner.orders)
    }

    /// Get the realtime order feed.
    #[must_use]
    pub fn feed(&self) -> Arc<dyn OrderFeed> {
        Arc::clone(&self.inner.feed)
    }

    /// Push settings served to clients.
    #[must_use]
    pub fn push_client_config(&self) -> PushClientConfig {
        match self.inner.config.fcm() {
            Some(fcm) if self.inner.notifications.is_enabled() => PushClientConfig {
                enabled: true,
                vapid_public_key: Some(fcm.vapid_public_key.clone()),
            },
            _ => PushClientConfig {
                enabled: false,
                vapid_public_key: None,
            },
        }
    }
}
