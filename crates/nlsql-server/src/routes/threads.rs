//! Thread-store proxy endpoints (§6.3).
//!
//! The coordinator and assistant never read or write thread metadata
//! themselves — conversation history and titles live in an external
//! thread store owned by the surrounding chat product. These routes hold
//! no pipeline logic: they forward the request to that store and relay
//! its response, mapping an upstream transport failure to
//! `ServiceUnavailable`. When no store is configured for this
//! deployment, they report `503 Service Unavailable` rather than
//! fabricating an in-memory store the core was never meant to own.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use nlsql_error::NlsqlError;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct NotConfigured {
    error: &'static str,
}

fn not_configured() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, Json(NotConfigured { error: "no thread store is configured for this deployment" })).into_response()
}

async fn forward(state: &AppState, method: Method, path: &str, query: &HashMap<String, String>) -> Response {
    let Some(base) = state.thread_store_url.as_deref() else {
        return not_configured();
    };

    let url = format!("{}{path}", base.trim_end_matches('/'));
    let request = state.http_client.request(method, url).query(query);

    match request.send().await {
        Ok(upstream) => {
            let status = upstream.status();
            match upstream.bytes().await {
                Ok(body) => (status, body).into_response(),
                Err(e) => NlsqlError::ServiceUnavailable { reason: e.to_string() }.into_response(),
            }
        }
        Err(e) => NlsqlError::ServiceUnavailable { reason: e.to_string() }.into_response(),
    }
}

pub async fn list_threads(State(state): State<AppState>, Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
    forward(&state, Method::GET, "/threads", &query).await
}

pub async fn get_thread(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    forward(&state, Method::GET, &format!("/threads/{id}"), &HashMap::new()).await
}

pub async fn get_thread_messages(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    forward(&state, Method::GET, &format!("/threads/{id}/messages"), &HashMap::new()).await
}

pub async fn patch_thread(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    forward(&state, Method::PATCH, &format!("/threads/{id}"), &HashMap::new()).await
}

pub async fn delete_thread(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    forward(&state, Method::DELETE, &format!("/threads/{id}"), &HashMap::new()).await
}
