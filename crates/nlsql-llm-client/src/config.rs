//! Connection settings for the conversational-AI HTTP service (§6.4
//! `LLM_ENDPOINT` / `LLM_MODEL_DEPLOYMENT_NAME`).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// Base URL of an OpenAI-compatible chat-completions API.
    pub endpoint: String,
    pub model_deployment: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl LlmClientConfig {
    #[must_use]
    pub const fn new(endpoint: String, model_deployment: String, api_key: Option<String>) -> Self {
        Self { endpoint, model_deployment, api_key, timeout: Duration::from_secs(30) }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
