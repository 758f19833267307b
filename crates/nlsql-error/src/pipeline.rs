//! Errors from the pipeline coordinator (C1) and its collaborating stages.

/// Errors raised while orchestrating a single `process_query` turn.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("template search returned no candidate above the match threshold")]
    TemplateMatchMiss,

    #[error("parameter validation failed for template '{template_id}'")]
    ParameterValidationFailed { template_id: String },

    #[error("query builder exhausted its retry budget")]
    QueryBuilderRetryExhausted,

    #[error("stage '{stage}' exceeded its deadline of {deadline_ms}ms")]
    Timeout { stage: String, deadline_ms: u64 },

    #[error("request was cancelled")]
    Cancelled,

    #[error("no pending clarification found for thread '{thread_id}'")]
    NoPendingClarification { thread_id: String },
}

impl PipelineError {
    pub(crate) const fn error_code(&self) -> &'static str {
        match self {
            Self::TemplateMatchMiss => "template_match_miss",
            Self::ParameterValidationFailed { .. } => "parameter_validation_failed",
            Self::QueryBuilderRetryExhausted => "query_builder_retry_exhausted",
            Self::Timeout { .. } => "stage_timeout",
            Self::Cancelled => "cancelled",
            Self::NoPendingClarification { .. } => "no_pending_clarification",
        }
    }
}
