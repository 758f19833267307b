//! Unified error types for the NL2SQL pipeline crates.
//!
//! All pipeline crates depend on this crate for error handling. Domain
//! errors never carry raw SQL, raw LLM output, or raw driver errors into
//! their `Display` text — those details are attached only via `tracing`
//! at the call site, never serialized to the wire.

// Error variants are self-documenting via their #[error(...)] messages.
#![allow(missing_docs)]

mod cache;
mod config;
mod http;
mod llm;
mod pipeline;
mod query;

pub use cache::CacheError;
pub use config::ConfigError;
pub use http::{ErrorResponse, IntoHttpResponse};
pub use llm::LlmError;
pub use pipeline::PipelineError;
pub use query::QueryValidationError;

/// Unified error type wrapping all domain errors.
#[derive(Debug, thiserror::Error)]
pub enum NlsqlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    QueryValidation(#[from] QueryValidationError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("upstream service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    #[error("thread not found: {thread_id}")]
    ThreadNotFound { thread_id: String },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl NlsqlError {
    /// Stable machine-readable error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Cache(e) => e.error_code(),
            Self::Llm(e) => e.error_code(),
            Self::Pipeline(e) => e.error_code(),
            Self::QueryValidation(e) => e.error_code(),
            Self::Database(_) => "database_error",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::ThreadNotFound { .. } => "thread_not_found",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// A short, user-safe message suitable for display in a chat client.
    ///
    /// Never includes raw SQL, raw LLM output, or raw violation detail —
    /// see §7 of the pipeline design for the taxonomy this follows.
    #[must_use]
    pub fn user_safe_message(&self) -> String {
        match self {
            Self::QueryValidation(e) => e.user_safe_message(),
            Self::Llm(_) => "I had trouble understanding that question. Could you rephrase it?".to_string(),
            Self::Cache(_) => "I'm having trouble looking up reference data right now.".to_string(),
            Self::Database(_) => "I couldn't run that query against the database.".to_string(),
            Self::ServiceUnavailable { .. } => "That service is temporarily unavailable. Please try again shortly.".to_string(),
            _ => "Something went wrong handling your request.".to_string(),
        }
    }
}
