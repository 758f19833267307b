//! LLM capability interface (§4.2) — opaque over provider, model family,
//! and protocol. The core only ever calls `run(prompt, thread_id)`.

use async_trait::async_trait;
use nlsql_error::LlmError;
use serde::{Deserialize, Serialize};

/// The single capability the pipeline requires from an LLM backend.
/// Test doubles return canned JSON text; production implementations call
/// an external conversational-AI service (`nlsql-llm-client`).
#[async_trait]
pub trait LlmCapability: Send + Sync {
    async fn run(&self, prompt: &str, thread_id: &str) -> Result<String, LlmError>;
}

/// Parsed response from the parameter-extractor LLM (§4.2 item 1).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParameterExtractionOutcome {
    Resolved {
        parameters: std::collections::HashMap<String, serde_json::Value>,
    },
    NeedsClarification {
        needs_clarification: bool,
        missing: Vec<MissingParameter>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct MissingParameter {
    pub name: String,
    pub best_guess: Option<String>,
    pub guess_confidence: Option<f64>,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

/// Parsed response from the query-builder LLM (§4.2 item 2).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryBuilderOutcome {
    pub sql: String,
    pub reasoning: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub tables_used: Vec<String>,
}

/// Parses the parameter-extractor LLM's JSON text.
///
/// # Errors
/// Returns [`LlmError::InvalidResponse`] if the text is not valid JSON in
/// either recognized shape.
pub fn parse_extraction_response(text: &str) -> Result<ParameterExtractionOutcome, LlmError> {
    serde_json::from_str(text).map_err(|_| LlmError::InvalidResponse)
}

/// Parses the query-builder LLM's JSON text.
///
/// Per §4.5 item 3: a parse failure is recoverable upstream (the caller
/// falls back to confidence 0.5), so this returns `LlmError` and lets
/// [`crate::query_builder::build`] apply that fallback rather than
/// failing the whole request.
///
/// # Errors
/// Returns [`LlmError::InvalidResponse`] if the text is not valid JSON.
pub fn parse_query_builder_response(text: &str) -> Result<QueryBuilderOutcome, LlmError> {
    serde_json::from_str(text).map_err(|_| LlmError::InvalidResponse)
}
