//! Order board route handlers.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, State},
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
};
use chrono::Utc;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::instrument;

use plateful_core::order::Order;
use plateful_core::{OrderId, OrderStatus, RestaurantId};

use super::parse_id;
use crate::board::BoardView;
use crate::db::orders;
use crate::error::Result;
use crate::realtime::SyncAdapter;
use crate::services::{TransitionRequest, apply_transition};
use crate::state::AppState;

/// Current board for a restaurant.
#[instrument(skip(state))]
pub async fn board(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BoardView>> {
    let id: RestaurantId = parse_id(id)?;
    let list = orders::list_for_restaurant(state.pool(), &id).await?;
    Ok(Json(BoardView::build(&list, Utc::now())))
}

/// Live board events.
///
/// The first event is the full snapshot. Closing the connection drops the
/// subscription and its listener.
#[instrument(skip(state))]
pub async fn stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let id: RestaurantId = parse_id(id)?;
    let handle = SyncAdapter::new(state.feed()).start(id);

    let sse_stream = handle.into_stream().map(|event| {
        let json = serde_json::to_string(&event).unwrap_or_else(|_| {
            r#"{"type":"error","message":"Failed to serialize event"}"#.to_string()
        });
        Ok(Event::default().event(event.name()).data(json))
    });

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

/// Body of a status change.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionBody {
    pub status: OrderStatus,
    /// Status shown on the board when the action was taken.
    #[serde(default)]
    pub expected: Option<OrderStatus>,
}

/// Move an order to a new status.
#[instrument(skip(state, body))]
pub async fn transition(
    State(state): State<AppState>,
    Path((id, order_id)): Path<(String, String)>,
    Json(body): Json<TransitionBody>,
) -> Result<Json<Order>> {
    let request = TransitionRequest {
        order_id: parse_id::<OrderId>(order_id)?,
        restaurant_id: parse_id::<RestaurantId>(id)?,
        target: body.status,
        expected: body.expected,
    };
    let order = apply_transition(state.orders(), &request).await?;
    Ok(Json(order))
}
