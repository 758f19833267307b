//! End-to-end HTTP exercise of the router with in-memory pipeline
//! doubles, driven through `tower::ServiceExt::oneshot` rather than a
//! bound socket.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use nlsql_core::{AllowedValuesProvider, ConfidenceThresholds, Dependencies, InMemoryTemplateCatalog};
use nlsql_server::state::{AppState, ThreadContextStore};
use nlsql_server::Server;
use nlsql_test_utils::{sales_allowed_tables, sales_table_metadata, single_row, top_n_customers_template, CannedLlm, InMemoryExecutor, InMemoryTableRanker};

struct NoAllowedValues;

#[async_trait]
impl AllowedValuesProvider for NoAllowedValues {
    async fn get(&self, _table: &str, _column: &str) -> (Vec<String>, bool) {
        (Vec::new(), false)
    }
}

fn test_state() -> AppState {
    let catalog = Arc::new(InMemoryTemplateCatalog::new(vec![top_n_customers_template()]));
    let llm: Arc<dyn nlsql_core::LlmCapability> = Arc::new(CannedLlm(r#"{"parameters": {"metric": "revenue"}}"#.to_string()));
    let executor = Arc::new(InMemoryExecutor::new(single_row("CustomerName", serde_json::json!("Acme"))));

    AppState {
        pipeline: Arc::new(Dependencies {
            template_search: catalog.clone(),
            template_lookup: catalog,
            allowed_values: Arc::new(NoAllowedValues),
            param_extraction_llm: llm.clone(),
            query_builder_llm: llm.clone(),
            table_ranker: Arc::new(InMemoryTableRanker(sales_table_metadata())),
            executor,
            allowed_tables: Arc::new(sales_allowed_tables()),
            thresholds: ConfidenceThresholds::default(),
            template_match_threshold: nlsql_core::DEFAULT_TEMPLATE_MATCH_THRESHOLD,
            max_display_columns: 8,
        }),
        chat_llm: llm,
        contexts: Arc::new(ThreadContextStore::new(Duration::from_secs(3600))),
        thread_store_url: None,
        http_client: reqwest::Client::new(),
        metrics_handle: None,
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let server = Server::new("127.0.0.1:0".to_string(), test_state());
    let response = server.router().oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request builds")).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn readyz_reports_ok() {
    let server = Server::new("127.0.0.1:0".to_string(), test_state());
    let response = server.router().oneshot(Request::builder().uri("/readyz").body(Body::empty()).expect("request builds")).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_endpoint_is_404_when_instrumentation_disabled() {
    let server = Server::new("127.0.0.1:0".to_string(), test_state());
    let response = server.router().oneshot(Request::builder().uri("/metrics").body(Body::empty()).expect("request builds")).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_stream_returns_event_stream_content_type() {
    let server = Server::new("127.0.0.1:0".to_string(), test_state());
    let request = Request::builder()
        .uri("/api/chat/stream?message=top+10+customers+by+revenue&thread_id=t-1")
        .body(Body::empty())
        .expect("request builds");
    let response = server.router().oneshot(request).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").expect("content-type present");
    assert_eq!(content_type, "text/event-stream");

    let bytes = response.into_body().collect().await.expect("body collects").to_bytes();
    let body = String::from_utf8(bytes.to_vec()).expect("utf8 body");
    assert!(body.contains("\"done\":true"), "expected a terminal event in: {body}");
    assert!(body.contains("\"thread_id\":\"t-1\""));
}

#[tokio::test]
async fn unconfigured_thread_store_reports_service_unavailable() {
    let server = Server::new("127.0.0.1:0".to_string(), test_state());
    let response = server.router().oneshot(Request::builder().uri("/api/threads").body(Body::empty()).expect("request builds")).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
