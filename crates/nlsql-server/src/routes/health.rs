//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_threads: usize,
    pub version: &'static str,
}

/// Reports process liveness and a cheap signal on the thread-context
/// store. Does not round-trip to Postgres or the LLM endpoint — a slow
/// upstream should not flip the load balancer's view of this process.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse { status: "healthy", active_threads: state.contexts.len(), version: env!("CARGO_PKG_VERSION") };
    (StatusCode::OK, Json(response))
}

/// Readiness probe: identical check to `/health` in this deployment.
/// `build_app_state` already fails startup outright if Postgres,
/// the template catalog, or the LLM endpoint can't be reached, so there
/// is no separate "still warming up" state a running process can be in —
/// once it's serving requests at all, it's ready to serve them.
pub async fn readyz_handler(State(state): State<AppState>) -> impl IntoResponse {
    health_handler(State(state)).await
}
