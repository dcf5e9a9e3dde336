//! Plateful Admin library.
//!
//! Restaurant dashboard: onboarding and menu CRUD, the Kanban order board
//! with live updates over SSE, order status transitions, and the push
//! notification lifecycle (device registration, new-order fan-out, daily
//! sweep, client setup protocol). Exposed as a library so the router and
//! background jobs can be exercised from integration tests and the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod board;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod models;
pub mod push;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the full application router (without Sentry layers).
pub fn app() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
