//! Push device route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use plateful_core::RestaurantId;

use super::parse_id;
use crate::error::Result;
use crate::push::{Device, PushClientConfig, RegisterDeviceRequest};
use crate::state::AppState;

/// Push settings for the client setup flow.
pub async fn push_config(State(state): State<AppState>) -> Json<PushClientConfig> {
    Json(state.push_client_config())
}

/// Register or refresh a device token.
#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RegisterDeviceRequest>,
) -> Result<Json<Device>> {
    let id: RestaurantId = parse_id(id)?;
    let registration = body.validate()?;
    let device = state
        .notifications()
        .register_device(&id, &registration)
        .await?;
    Ok(Json(device))
}

/// Opt a device out of notifications.
#[instrument(skip(state, token))]
pub async fn unregister(
    State(state): State<AppState>,
    Path((id, token)): Path<(String, String)>,
) -> Result<StatusCode> {
    let id: RestaurantId = parse_id(id)?;
    state
        .notifications()
        .unregister_device(&id, &token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
