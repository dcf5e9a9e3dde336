//! Category and menu item route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, instrument};

use plateful_core::menu::{Category, MenuItem};
use plateful_core::{CategoryId, MenuItemId, RestaurantId};

use super::parse_id;
use crate::db::MenuRepository;
use crate::error::Result;
use crate::models::{CategoryInput, MenuItemInput};
use crate::state::AppState;

/// List a restaurant's categories by position.
#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Category>>> {
    let id: RestaurantId = parse_id(id)?;
    Ok(Json(MenuRepository::new(state.pool()).categories(&id).await?))
}

/// Add a category. Without a position it goes last.
#[instrument(skip(state, input))]
pub async fn create_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    let id: RestaurantId = parse_id(id)?;
    let new = input.validate()?;
    let category = MenuRepository::new(state.pool())
        .create_category(&id, &new)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Remove a category. Its items stay on the menu, uncategorised.
#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id: CategoryId = parse_id(id)?;
    MenuRepository::new(state.pool()).delete_category(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List every item of a restaurant, including unavailable ones.
#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MenuItem>>> {
    let id: RestaurantId = parse_id(id)?;
    Ok(Json(MenuRepository::new(state.pool()).items(&id).await?))
}

/// Add a menu item.
#[instrument(skip(state, input))]
pub async fn create_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<MenuItemInput>,
) -> Result<(StatusCode, Json<MenuItem>)> {
    let restaurant_id: RestaurantId = parse_id(id)?;
    let item = input.validate()?;
    let created = MenuRepository::new(state.pool())
        .upsert_item(&restaurant_id, &MenuItemId::generate(), &item)
        .await?;
    info!(item_id = %created.id, "Menu item created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace a menu item's editable fields.
#[instrument(skip(state, input))]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<MenuItemInput>,
) -> Result<Json<MenuItem>> {
    let id: MenuItemId = parse_id(id)?;
    let item = input.validate()?;
    Ok(Json(
        MenuRepository::new(state.pool()).update_item(&id, &item).await?,
    ))
}

/// Remove a menu item. Placed orders keep their snapshot.
#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id: MenuItemId = parse_id(id)?;
    MenuRepository::new(state.pool()).delete_item(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
