//! Restaurant onboarding route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, instrument};

use plateful_core::RestaurantId;
use plateful_core::menu::Restaurant;

use super::parse_id;
use crate::db::RestaurantRepository;
use crate::error::{AppError, Result};
use crate::models::{RestaurantInput, RestaurantPatch};
use crate::state::AppState;

/// Create a restaurant. The slug is derived from the name.
#[instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<RestaurantInput>,
) -> Result<(StatusCode, Json<Restaurant>)> {
    let new = input.validate()?;
    let restaurant = RestaurantRepository::new(state.pool()).create(&new).await?;
    info!(restaurant_id = %restaurant.id, slug = %restaurant.slug, "Restaurant created");
    Ok((StatusCode::CREATED, Json(restaurant)))
}

/// Show a restaurant.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Restaurant>> {
    let id: RestaurantId = parse_id(id)?;
    RestaurantRepository::new(state.pool())
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("restaurant {id}")))
}

/// Update the fields present in the body.
#[instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<RestaurantPatch>,
) -> Result<Json<Restaurant>> {
    let id: RestaurantId = parse_id(id)?;
    let patch = patch.validate()?;
    let restaurant = RestaurantRepository::new(state.pool())
        .update(&id, &patch)
        .await?;
    Ok(Json(restaurant))
}
