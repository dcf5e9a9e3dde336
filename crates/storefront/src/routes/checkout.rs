//! Checkout route handler.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use plateful_core::order::{CustomerForm, Order};

use crate::db::orders;
use crate::error::Result;
use crate::services::cart::CartStore;
use crate::services::checkout::{clear_after_checkout, prepare_order};
use crate::state::AppState;

/// Place an order from the session cart.
///
/// Responds 400 for an empty cart and 422 with per-field errors for invalid
/// customer details. On success the order is stored as `pending` and the
/// cart is cleared; once the order is stored the response is 201 even if
/// clearing the cart fails.
#[instrument(skip(state, store, form))]
pub async fn place_order(
    State(state): State<AppState>,
    mut store: CartStore,
    Json(form): Json<CustomerForm>,
) -> Result<(StatusCode, Json<Order>)> {
    let cart = store.snapshot().await?;
    let draft = prepare_order(&cart, form)?;

    let order = orders::insert_order(
        state.pool(),
        &draft.id,
        &draft.restaurant_id,
        &draft.lines,
        &draft.customer,
        draft.totals,
    )
    .await?;

    clear_after_checkout(&mut store, &order.id).await;

    tracing::info!(
        order_id = %order.id,
        restaurant_id = %order.restaurant_id,
        total = %order.total,
        "Order placed"
    );
    Ok((StatusCode::CREATED, Json(order)))
}
