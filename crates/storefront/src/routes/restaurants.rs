//! Restaurant listing and menu route handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use plateful_core::RestaurantId;
use plateful_core::menu::Restaurant;

use crate::db::menu::MenuRepository;
use crate::db::restaurants::RestaurantRepository;
use crate::error::{AppError, Result};
use crate::models::MenuView;
use crate::state::AppState;

/// List active restaurants.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Restaurant>>> {
    let restaurants = RestaurantRepository::new(state.pool()).list_active().await?;
    Ok(Json(restaurants))
}

/// Show a restaurant's available menu, grouped by category.
///
/// Served from a short-lived in-memory cache.
#[instrument(skip(state), fields(restaurant_id = %id))]
pub async fn menu(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Arc<MenuView>>> {
    let id = RestaurantId::parse(&id).map_err(|e| AppError::BadRequest(e.to_string()))?;

    if let Some(view) = state.menu_cache().get(&id).await {
        tracing::debug!("Cache hit for menu");
        return Ok(Json(view));
    }

    let view = Arc::new(load_menu(&state, &id).await?);
    state.menu_cache().insert(id, Arc::clone(&view)).await;
    Ok(Json(view))
}

async fn load_menu(state: &AppState, id: &RestaurantId) -> Result<MenuView> {
    let restaurant = RestaurantRepository::new(state.pool())
        .get_active(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("restaurant {id}")))?;

    let menu = MenuRepository::new(state.pool());
    let categories = menu.categories(id).await?;
    let items = menu.available_items(id).await?;

    Ok(MenuView::group(restaurant, categories, items))
}
