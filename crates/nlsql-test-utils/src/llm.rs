//! Canned [`LlmCapability`] doubles. Production code never sees these —
//! they stand in for `nlsql-llm-client::ChatCompletionClient` in tests
//! exercising the LLM-fallback paths of C3/C5 without a network call.

use async_trait::async_trait;
use nlsql_core::LlmCapability;
use nlsql_error::LlmError;
use tokio::sync::Mutex;

/// Always returns the same canned text, regardless of prompt.
pub struct CannedLlm(pub String);

#[async_trait]
impl LlmCapability for CannedLlm {
    async fn run(&self, _prompt: &str, _thread_id: &str) -> Result<String, LlmError> {
        Ok(self.0.clone())
    }
}

/// Always fails, simulating an unreachable or erroring upstream service
/// (§7 `LLMTimeout` / `LLMInvalidResponse`).
pub struct FailingLlm;

#[async_trait]
impl LlmCapability for FailingLlm {
    async fn run(&self, _prompt: &str, _thread_id: &str) -> Result<String, LlmError> {
        Err(LlmError::CallFailed { reason: "test double configured to fail".to_string() })
    }
}

/// Returns one scripted response per call, in order; panics if called
/// more times than scripted, so a test's expected call count is
/// self-checking.
pub struct ScriptedLlm {
    responses: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    #[must_use]
    pub fn new(responses: Vec<String>) -> Self {
        // Reversed so `pop()` yields them in call order.
        let mut responses = responses;
        responses.reverse();
        Self { responses: Mutex::new(responses) }
    }
}

#[async_trait]
impl LlmCapability for ScriptedLlm {
    async fn run(&self, _prompt: &str, _thread_id: &str) -> Result<String, LlmError> {
        self.responses.lock().await.pop().ok_or(LlmError::CallFailed { reason: "ScriptedLlm script exhausted".to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_llm_replays_in_order() {
        let llm = ScriptedLlm::new(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(llm.run("p", "t").await.unwrap(), "first");
        assert_eq!(llm.run("p", "t").await.unwrap(), "second");
        assert!(llm.run("p", "t").await.is_err());
    }
}
