//! LLM capability (§4.2) error kinds.

/// Errors raised while invoking the parameter-extractor or query-builder
/// LLM capability.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM call timed out after {deadline_ms}ms")]
    Timeout { deadline_ms: u64 },

    #[error("LLM returned a response that could not be parsed as the expected shape")]
    InvalidResponse,

    #[error("LLM call failed: {reason}")]
    CallFailed { reason: String },
}

impl LlmError {
    pub(crate) const fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "llm_timeout",
            Self::InvalidResponse => "llm_invalid_response",
            Self::CallFailed { .. } => "llm_call_failed",
        }
    }
}
