//! Wire rendering for the chat stream (§4.9 `render_response`, §6.1-§6.2).
//!
//! One flat, mostly-optional JSON object per SSE `data:` line; never the
//! server-internal [`nlsql_core::PendingClarificationState`], which can
//! carry raw extracted parameter values and has no business reaching the
//! client.

use nlsql_core::{ClarificationRequest, Nl2SqlResponse, PipelineOutcome, ProgressEvent, StepStatus};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatStreamEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_parent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallEvent {
    pub tool_name: String,
    pub tool_call_id: String,
    pub args: serde_json::Value,
    pub result: ToolResult,
}

/// The `tool_call.result` shape from §6.2 (a completed data turn) or the
/// clarification-pill shape implied by §6.1's "renders ... clarification
/// pills" — never the raw [`nlsql_core::PendingClarificationState`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ToolResult {
    Query(Box<Nl2SqlResponse>),
    Clarification(ClarificationPayload),
}

#[derive(Debug, Clone, Serialize)]
pub struct ClarificationPayload {
    pub question: String,
    pub best_guess: Option<String>,
    pub alternatives: Vec<String>,
    pub confidence: f64,
}

impl From<&ClarificationRequest> for ClarificationPayload {
    fn from(c: &ClarificationRequest) -> Self {
        Self {
            question: c.question.clone(),
            best_guess: c.best_guess.clone(),
            alternatives: c.alternatives.clone(),
            confidence: c.confidence,
        }
    }
}

/// Renders one [`ProgressEvent`] into a `step`/`status` SSE event (§6.1
/// ordering: these appear in pipeline order as each stage starts/ends).
#[must_use]
pub fn render_progress(event: &ProgressEvent) -> ChatStreamEvent {
    ChatStreamEvent {
        step: Some(event.step.clone()),
        status: Some(match event.status {
            StepStatus::Started => "started",
            StepStatus::Completed => "completed",
        }),
        duration_ms: event.duration.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        is_parent: Some(event.is_parent),
        ..Default::default()
    }
}

/// Renders a content chunk streamed from the final narration LLM.
#[must_use]
pub fn render_content(chunk: &str) -> ChatStreamEvent {
    ChatStreamEvent { content: Some(chunk.to_string()), ..Default::default() }
}

/// Renders the terminal event for a turn: the `tool_call` payload plus
/// `done: true` and `thread_id` (§6.1 "terminal event").
#[must_use]
pub fn render_outcome(thread_id: &str, tool_call_id: &str, outcome: &PipelineOutcome) -> ChatStreamEvent {
    let result = match outcome {
        PipelineOutcome::Response(response) => ToolResult::Query(Box::new(response.clone())),
        PipelineOutcome::Clarification(clarification) => ToolResult::Clarification(clarification.into()),
    };
    ChatStreamEvent {
        tool_call: Some(ToolCallEvent {
            tool_name: "nl2sql_query".to_string(),
            tool_call_id: tool_call_id.to_string(),
            args: serde_json::json!({}),
            result,
        }),
        thread_id: Some(thread_id.to_string()),
        done: Some(true),
        ..Default::default()
    }
}

/// Renders a terminal-failure event that short-circuits before any SQL
/// work happened (e.g. the thread store is unreachable).
#[must_use]
pub fn render_error(thread_id: &str, message: &str) -> ChatStreamEvent {
    ChatStreamEvent {
        thread_id: Some(thread_id.to_string()),
        done: Some(true),
        error: Some(message.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlsql_core::{QuerySource, SchemaSuggestion};

    #[test]
    fn outcome_response_serializes_without_pending_state() {
        let response = Nl2SqlResponse {
            columns: vec!["id".to_string()],
            rows: vec![],
            sql_executed: "SELECT id FROM t".to_string(),
            tables_used: vec!["t".to_string()],
            query_source: QuerySource::Template,
            query_confidence: 1.0,
            query_summary: None,
            hidden_columns: vec![],
            needs_confirmation: false,
            suggestions: vec![SchemaSuggestion { title: "x".to_string(), prompt: "y".to_string() }],
            error_suggestions: vec![],
            error: None,
        };
        let event = render_outcome("thread-1", "call-1", &PipelineOutcome::Response(response));
        let json = serde_json::to_value(&event).expect("serializes");
        assert_eq!(json["done"], serde_json::json!(true));
        assert!(json["tool_call"]["result"].get("pending_state").is_none());
    }
}
