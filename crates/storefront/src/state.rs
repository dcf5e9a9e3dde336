//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use plateful_core::RestaurantId;

use crate::config::StorefrontConfig;
use crate::models::MenuView;

/// How long a grouped menu is served from memory.
const MENU_CACHE_TTL: Duration = Duration::from_secs(60);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    menu_cache: Cache<RestaurantId, Arc<MenuView>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let menu_cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(MENU_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                menu_cache,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the grouped-menu cache.
    #[must_use]
    pub fn menu_cache(&self) -> &Cache<RestaurantId, Arc<MenuView>> {
        &self.inner.menu_cache
    }
}
