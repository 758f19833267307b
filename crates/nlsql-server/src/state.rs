//! Per-request application state: the wired pipeline [`Dependencies`], the
//! chat-reply LLM, and the thread-context store backing §6.5's persisted
//! `pending_clarification`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics_exporter_prometheus::PrometheusHandle;
use nlsql_core::{ConversationContext, Dependencies, LlmCapability};

/// Everything an Axum handler needs, cloned cheaply per request (every
/// field is an `Arc` or a `DashMap` handle).
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Dependencies>,
    pub chat_llm: Arc<dyn LlmCapability>,
    pub contexts: Arc<ThreadContextStore>,
    /// Base URL of the external thread store, when configured (§6.3).
    pub thread_store_url: Option<Arc<str>>,
    /// Shared client the thread-proxy routes forward requests through.
    pub http_client: reqwest::Client,
    /// Prometheus recorder handle, present only when
    /// `ENABLE_INSTRUMENTATION=true`; `/metrics` reports 404 when absent
    /// rather than exposing an empty scrape target.
    pub metrics_handle: Option<Arc<PrometheusHandle>>,
}

/// Holds one [`ConversationContext`] per thread, evicting entries whose
/// last write is older than `ttl` — the TTL for the whole context (and,
/// transitively, any `pending_clarification` inside it, §6.5 "TTL: one
/// conversation session").
pub struct ThreadContextStore {
    entries: DashMap<String, (ConversationContext, Instant)>,
    ttl: Duration,
}

impl ThreadContextStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    /// Returns the thread's context if present and not expired, otherwise
    /// a fresh default — a missing or stale context is never an error,
    /// just the start of a new conversation.
    #[must_use]
    pub fn get(&self, thread_id: &str) -> ConversationContext {
        match self.entries.get(thread_id) {
            Some(entry) if entry.1.elapsed() < self.ttl => entry.0.clone(),
            _ => ConversationContext::default(),
        }
    }

    pub fn put(&self, thread_id: &str, context: ConversationContext) {
        self.entries.insert(thread_id.to_string(), (context, Instant::now()));
    }

    /// Drops every entry whose TTL has elapsed. Called periodically by a
    /// background task rather than on every read, so a burst of reads
    /// right after expiry doesn't all pay the sweep cost.
    pub fn sweep_expired(&self) {
        self.entries.retain(|_, (_, inserted_at)| inserted_at.elapsed() < self.ttl);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlsql_core::SchemaArea;

    #[test]
    fn missing_thread_returns_default_context() {
        let store = ThreadContextStore::new(Duration::from_secs(3600));
        assert!(store.get("unknown").pending_clarification.is_none());
    }

    #[test]
    fn stored_context_round_trips_within_ttl() {
        let store = ThreadContextStore::new(Duration::from_secs(3600));
        let context = ConversationContext { current_schema_area: Some(SchemaArea::Sales), schema_exploration_depth: 3, pending_clarification: None };
        store.put("t1", context);
        assert_eq!(store.get("t1").schema_exploration_depth, 3);
    }

    #[test]
    fn expired_entry_is_swept() {
        let store = ThreadContextStore::new(Duration::from_millis(1));
        store.put("t1", ConversationContext { schema_exploration_depth: 5, ..ConversationContext::default() });
        std::thread::sleep(Duration::from_millis(5));
        store.sweep_expired();
        assert!(store.is_empty());
    }
}
