//! Cart route handlers.
//!
//! The cart lives in the session. Item names and prices always come from the
//! menu table; the client only ever sends item ids and quantities.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use plateful_core::MenuItemId;
use plateful_core::cart::Cart;

use crate::db::menu::MenuRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::CartView;
use crate::services::cart::CartStore;
use crate::state::AppState;

/// Add-to-cart request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub item_id: MenuItemId,
    pub quantity: Option<u32>,
}

/// Update-quantity request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantity {
    pub item_id: MenuItemId,
    pub quantity: i64,
}

/// Remove-line request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItem {
    pub item_id: MenuItemId,
}

/// Show cart contents.
#[instrument(skip(store))]
pub async fn show(mut store: CartStore) -> Result<Json<CartView>> {
    let cart = store.snapshot().await?;
    Ok(Json(CartView::from(&cart)))
}

/// Add an item to the cart.
///
/// Returns 409 with the bound restaurant id if the cart holds items from a
/// different restaurant.
#[instrument(skip(state, store), fields(item_id = %body.item_id))]
pub async fn add(
    State(state): State<AppState>,
    mut store: CartStore,
    Json(body): Json<AddToCart>,
) -> Result<Json<CartView>> {
    let item = MenuRepository::new(state.pool())
        .get_item(&body.item_id)
        .await?
        .filter(|item| item.is_available)
        .ok_or_else(|| AppError::NotFound(format!("menu item {}", body.item_id)))?;

    let quantity = body.quantity.unwrap_or(1);
    let cart_item = item.to_cart_item();
    let cart = store
        .mutate(|cart| {
            cart.add_item(&cart_item, quantity)?;
            Ok::<_, plateful_core::cart::CartError>(cart.clone())
        })
        .await??;

    add_breadcrumb(
        "cart",
        "Added item",
        Some(&[("item_id", body.item_id.as_str())]),
    );
    Ok(Json(CartView::from(&cart)))
}

/// Set a line's quantity. Zero or less removes the line.
#[instrument(skip(store), fields(item_id = %body.item_id))]
pub async fn update(mut store: CartStore, Json(body): Json<UpdateQuantity>) -> Result<Json<CartView>> {
    let cart = store
        .mutate(|cart| {
            cart.update_quantity(&body.item_id, body.quantity);
            cart.clone()
        })
        .await?;
    Ok(Json(CartView::from(&cart)))
}

/// Remove a line from the cart.
#[instrument(skip(store), fields(item_id = %body.item_id))]
pub async fn remove(mut store: CartStore, Json(body): Json<RemoveItem>) -> Result<Json<CartView>> {
    let cart = store
        .mutate(|cart| {
            cart.remove_item(&body.item_id);
            cart.clone()
        })
        .await?;
    Ok(Json(CartView::from(&cart)))
}

/// Empty the cart.
#[instrument(skip(store))]
pub async fn clear(mut store: CartStore) -> Result<Json<CartView>> {
    store.mutate(Cart::clear).await?;
    Ok(Json(CartView::from(&Cart::new())))
}
