//! HTTP route handlers for the admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                   - Liveness check
//! GET    /health/ready                             - Readiness check (database)
//!
//! # Onboarding
//! POST   /restaurants                              - Create a restaurant
//! GET    /restaurants/{id}                         - Restaurant details
//! PUT    /restaurants/{id}                         - Partial update
//!
//! # Menu
//! GET    /restaurants/{id}/categories              - Categories by position
//! POST   /restaurants/{id}/categories              - Add a category
//! DELETE /categories/{id}                          - Remove a category
//! GET    /restaurants/{id}/menu-items              - Every item, available or not
//! POST   /restaurants/{id}/menu-items              - Add an item
//! PUT    /menu-items/{id}                          - Replace an item
//! DELETE /menu-items/{id}                          - Remove an item
//!
//! # Orders
//! GET    /restaurants/{id}/orders                  - Kanban board
//! GET    /restaurants/{id}/orders/stream           - Live board events (SSE)
//! POST   /restaurants/{id}/orders/{order_id}/status - Status transition
//!
//! # Push
//! GET    /api/push/config                          - Client push settings
//! POST   /restaurants/{id}/devices                 - Register a device
//! DELETE /restaurants/{id}/devices/{token}         - Opt a device out
//! ```

pub mod devices;
pub mod menu;
pub mod orders;
pub mod restaurants;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use plateful_core::IdError;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the restaurant-scoped routes router.
pub fn restaurant_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(restaurants::create))
        .route("/{id}", get(restaurants::show).put(restaurants::update))
        .route(
            "/{id}/categories",
            get(menu::list_categories).post(menu::create_category),
        )
        .route(
            "/{id}/menu-items",
            get(menu::list_items).post(menu::create_item),
        )
        .route("/{id}/orders", get(orders::board))
        .route("/{id}/orders/stream", get(orders::stream))
        .route("/{id}/orders/{order_id}/status", post(orders::transition))
        .route("/{id}/devices", post(devices::register))
        .route("/{id}/devices/{token}", delete(devices::unregister))
}

/// Create all routes for the admin.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/restaurants", restaurant_routes())
        .route("/categories/{id}", delete(menu::delete_category))
        .route(
            "/menu-items/{id}",
            put(menu::update_item).delete(menu::delete_item),
        )
        .route("/api/push/config", get(devices::push_config))
}

/// Parse a path segment into a typed id.
pub(crate) fn parse_id<T>(raw: String) -> Result<T>
where
    T: TryFrom<String, Error = IdError>,
{
    T::try_from(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}
