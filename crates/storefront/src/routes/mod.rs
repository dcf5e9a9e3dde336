//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (database)
//!
//! # Menu
//! GET  /restaurants                - Active restaurants
//! GET  /restaurants/{id}/menu      - Available items grouped by category
//!
//! # Cart (session-backed)
//! GET  /cart                       - Cart contents and totals
//! POST /cart/add                   - Add an item (409 if from another restaurant)
//! POST /cart/update                - Set a line quantity (<= 0 removes)
//! POST /cart/remove                - Remove a line
//! POST /cart/clear                 - Empty the cart
//!
//! # Checkout
//! POST /checkout                   - Place the order
//! GET  /orders/{id}                - Order status tracking
//! ```

pub mod cart;
pub mod checkout;
pub mod orders;
pub mod restaurants;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the restaurant and menu routes router.
pub fn restaurant_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(restaurants::index))
        .route("/{id}/menu", get(restaurants::menu))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/restaurants", restaurant_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::place_order))
        .route("/orders/{id}", get(orders::show))
}
