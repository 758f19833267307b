//! [`ChatCompletionClient`] — the production [`LlmCapability`] implementation.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint. `thread_id` is
//! forwarded as the request's `user` field (for the upstream service's own
//! rate-limiting/abuse tracking) but otherwise carries no meaning here —
//! conversation history, if any, is already folded into `prompt` by the
//! caller (§4.2: "given a prompt ... plus the user's utterance and
//! conversation history").

use std::time::Duration;

use async_trait::async_trait;
use nlsql_core::LlmCapability;
use nlsql_error::LlmError;
use serde::{Deserialize, Serialize};

use crate::config::LlmClientConfig;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// HTTP-backed [`LlmCapability`], shared across the parameter-extractor,
/// query-builder, and chat-assistant roles (§4.2) — each role differs
/// only in the prompt it sends, not in the transport.
pub struct ChatCompletionClient {
    http: reqwest::Client,
    config: LlmClientConfig,
}

impl ChatCompletionClient {
    /// # Panics
    /// Panics if the underlying `reqwest::Client` cannot be built (e.g. an
    /// invalid TLS configuration compiled in) — a startup-time defect, not
    /// a per-request one.
    #[must_use]
    pub fn new(config: LlmClientConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client configuration is valid");
        Self { http, config }
    }
}

#[async_trait]
impl LlmCapability for ChatCompletionClient {
    async fn run(&self, prompt: &str, thread_id: &str) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            model: &self.config.model_deployment,
            messages: [ChatMessage { role: "user", content: prompt }],
            user: Some(thread_id),
            temperature: 0.0,
        };

        let mut request = self.http.post(format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::time::timeout(self.config.timeout, request.send())
            .await
            .map_err(|_| LlmError::Timeout { deadline_ms: u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX) })?
            .map_err(|e| LlmError::CallFailed { reason: e.to_string() })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(LlmError::CallFailed { reason: format!("upstream returned HTTP {status}") });
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|_| LlmError::InvalidResponse)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::InvalidResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_with_timeout_overrides_default() {
        let config = LlmClientConfig::new("https://example.test".to_string(), "gpt-nlsql".to_string(), None).with_timeout(Duration::from_secs(5));
        let client = ChatCompletionClient::new(config);
        assert_eq!(client.config.timeout, Duration::from_secs(5));
    }
}
