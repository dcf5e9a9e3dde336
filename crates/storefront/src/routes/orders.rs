//! Order tracking route handler.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use plateful_core::OrderId;
use plateful_core::order::Order;

use crate::db::orders;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Show an order and its current status.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Order>> {
    let id = OrderId::parse(&id).map_err(|e| AppError::BadRequest(e.to_string()))?;
    orders::get_order(state.pool(), &id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}
