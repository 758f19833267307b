//! Turn classification: is this message a data question, or small talk?
//! One LLM call per turn (§4.9 `classify_intent`).

use nlsql_core::LlmCapability;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Data,
    Chat,
}

#[derive(Debug, Clone)]
pub struct IntentClassification {
    pub kind: IntentKind,
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    kind: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

const fn default_confidence() -> f64 {
    0.5
}

/// Classifies whether `user_text` is asking a data question or making
/// conversation, via a single LLM call. Falls back to a keyword heuristic
/// if the LLM call fails or returns unparseable JSON, so a flaky
/// classification never blocks the turn outright.
pub async fn classify_intent(user_text: &str, llm: &dyn LlmCapability, thread_id: &str) -> IntentClassification {
    let prompt = format!(
        "Classify this chat message as a data question about the company's database, or general conversation.\n\
         Message: {user_text}\n\n\
         Respond as JSON: {{\"kind\": \"data\" | \"chat\", \"confidence\": float}}."
    );
    match llm.run(&prompt, thread_id).await {
        Ok(text) => match serde_json::from_str::<RawClassification>(&text) {
            Ok(raw) if raw.kind.eq_ignore_ascii_case("data") => IntentClassification { kind: IntentKind::Data, confidence: raw.confidence },
            Ok(raw) => IntentClassification { kind: IntentKind::Chat, confidence: raw.confidence },
            Err(_) => {
                tracing::warn!("intent classifier returned unparseable JSON; falling back to keyword heuristic");
                keyword_heuristic(user_text)
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "intent classifier LLM call failed; falling back to keyword heuristic");
            keyword_heuristic(user_text)
        }
    }
}

/// Conservative fallback: a handful of data-question cue words. Low
/// confidence either way since it's a blunt instrument.
fn keyword_heuristic(user_text: &str) -> IntentClassification {
    const DATA_CUES: &[&str] = &["how many", "show me", "list", "top", "count", "total", "average", "which", "what is", "who are"];
    let lower = user_text.to_lowercase();
    if DATA_CUES.iter().any(|cue| lower.contains(cue)) {
        IntentClassification { kind: IntentKind::Data, confidence: 0.4 }
    } else {
        IntentClassification { kind: IntentKind::Chat, confidence: 0.4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nlsql_error::LlmError;

    struct CannedLlm(&'static str);
    #[async_trait]
    impl LlmCapability for CannedLlm {
        async fn run(&self, _prompt: &str, _thread_id: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingLlm;
    #[async_trait]
    impl LlmCapability for FailingLlm {
        async fn run(&self, _prompt: &str, _thread_id: &str) -> Result<String, LlmError> {
            Err(LlmError::InvalidResponse)
        }
    }

    #[tokio::test]
    async fn parses_data_classification() {
        let result = classify_intent("how many orders today", &CannedLlm(r#"{"kind":"data","confidence":0.9}"#), "t1").await;
        assert_eq!(result.kind, IntentKind::Data);
        assert!((result.confidence - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_heuristic() {
        let result = classify_intent("how many orders today", &FailingLlm, "t1").await;
        assert_eq!(result.kind, IntentKind::Data);
    }

    #[tokio::test]
    async fn chat_heuristic_for_greeting() {
        let result = classify_intent("good morning!", &FailingLlm, "t1").await;
        assert_eq!(result.kind, IntentKind::Chat);
    }
}
