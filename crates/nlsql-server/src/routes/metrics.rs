//! Prometheus scrape endpoint (§6.4 `ENABLE_INSTRUMENTATION`).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::state::AppState;

/// Renders the process's Prometheus text exposition format, or `404` when
/// `ENABLE_INSTRUMENTATION=false` — the route exists either way so a
/// misconfigured scraper gets a clear "not enabled" rather than a
/// connection-refused-looking 503.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics_handle {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics are disabled for this deployment (set ENABLE_INSTRUMENTATION=true)").into_response(),
    }
}
