//! The chat stream endpoint (§6.1): `GET /api/chat/stream`.
//!
//! Streams one SSE event per pipeline stage transition plus a single
//! terminal event carrying the `tool_call` payload, `done: true`, and
//! `thread_id`. Progress events are multiplexed onto the same channel the
//! turn's outcome is sent on, so ordering on the wire matches the order
//! the pipeline actually produced them in.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use nlsql_assistant::{render_progress, ChatStreamEvent, DataAssistant, ToolResult};
use nlsql_core::{ProgressEvent, ProgressReporter, QuerySource, StepStatus};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub message: String,
    pub thread_id: Option<String>,
    /// Accepted for wire compatibility with clients that always send a
    /// thread title on the first turn; the core has no use for it.
    #[serde(default)]
    #[allow(dead_code)]
    pub title: Option<String>,
}

/// Forwards stage-progress events onto the same channel the turn's
/// terminal event is sent on, rendered exactly as `render_progress`
/// would render them off the coordinator's own `QueueReporter` — the
/// channel just carries the already-wire-shaped event instead of the
/// raw one.
struct SseReporter {
    sender: mpsc::Sender<nlsql_assistant::ChatStreamEvent>,
    sequence: AtomicU64,
}

impl SseReporter {
    fn new(sender: mpsc::Sender<nlsql_assistant::ChatStreamEvent>) -> Self {
        Self { sender, sequence: AtomicU64::new(0) }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl ProgressReporter for SseReporter {
    async fn step_start(&self, name: &str, is_parent: bool) {
        let event = ProgressEvent { sequence: self.next_sequence(), step: name.to_string(), status: StepStatus::Started, duration: None, is_parent };
        self.try_send(render_progress(&event));
    }

    async fn step_end(&self, name: &str, is_parent: bool, duration: Option<Duration>) {
        let event = ProgressEvent { sequence: self.next_sequence(), step: name.to_string(), status: StepStatus::Completed, duration, is_parent };
        self.try_send(render_progress(&event));
    }
}

impl SseReporter {
    /// Step events are optional progress signals, not part of the
    /// contract (§5 backpressure): drop and warn on a full queue rather
    /// than stalling the pipeline waiting for a slow client to drain.
    fn try_send(&self, event: ChatStreamEvent) {
        if self.sender.try_send(event).is_err() {
            tracing::warn!("SSE queue full or closed; dropping step event");
        }
    }
}

/// Handles one chat turn, streaming pipeline progress and the final
/// result as Server-Sent Events.
pub async fn chat_stream(State(state): State<AppState>, Query(query): Query<ChatQuery>) -> impl IntoResponse {
    let thread_id = query.thread_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let tool_call_id = Uuid::new_v4().to_string();
    let context = state.contexts.get(&thread_id);

    let (tx, rx) = mpsc::channel(64);
    let assistant = DataAssistant::new(state.pipeline.clone(), state.chat_llm.clone());
    let contexts = state.contexts.clone();

    let metrics_handle = state.metrics_handle.clone();
    tokio::spawn(async move {
        let reporter = SseReporter::new(tx.clone());
        let started = std::time::Instant::now();
        let turn_future = assistant.handle_turn(&query.message, &thread_id, context, &reporter, &tool_call_id);

        // §5 "Cancellation": if the client disconnects, every receiver on
        // `tx` is dropped and `tx.closed()` resolves. Racing it against the
        // turn future cooperatively cancels whatever in-flight LLM call or
        // SQL execution the pipeline is suspended on at that instant —
        // dropping a `reqwest`/`sqlx` future mid-await is how each of those
        // clients cancels its outstanding I/O. No context is persisted and
        // no event is sent, so a cancelled turn leaves no residual state.
        tokio::select! {
            turn = turn_future => {
                if metrics_handle.is_some() {
                    record_turn_metrics(started.elapsed(), &turn.event);
                }
                contexts.put(&thread_id, turn.context);
                let _ = tx.send(turn.event).await;
            }
            () = tx.closed() => {
                tracing::info!(thread_id = %thread_id, "client disconnected; cancelling turn");
            }
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok::<Event, Infallible>(Event::default().data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Flattens one turn's terminal [`ChatStreamEvent`] into the counters
/// `crate::metrics` tracks. Only called when instrumentation is enabled,
/// so a disabled deployment pays nothing for this.
fn record_turn_metrics(duration: Duration, event: &ChatStreamEvent) {
    let is_error = event.error.is_some();
    let (is_clarification, query_source) = match event.tool_call.as_ref().map(|t| &t.result) {
        Some(ToolResult::Clarification(_)) => (true, None),
        Some(ToolResult::Query(response)) => (
            false,
            Some(match response.query_source {
                QuerySource::Template => "template",
                QuerySource::Dynamic => "dynamic",
            }),
        ),
        None => (false, None),
    };
    crate::metrics::record_turn(duration, is_error, is_clarification, query_source);
}
