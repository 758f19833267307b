//! Axum `IntoResponse` mapping — the single boundary where a `NlsqlError`
//! is turned into the user-safe JSON body described in §7.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

use crate::{NlsqlError, QueryValidationError};

/// Error response body (consistent shape across every endpoint).
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_description: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(error: impl Into<String>, description: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_description: description.into(),
            error_code: code.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Helper trait for converting a domain error into an HTTP response with an
/// explicit status, independent of the blanket `IntoResponse` impl below.
pub trait IntoHttpResponse {
    fn into_http_response(self, status: StatusCode) -> Response;
}

impl IntoHttpResponse for ErrorResponse {
    fn into_http_response(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for NlsqlError {
    fn into_response(self) -> Response {
        let error_code = self.error_code();
        let user_message = self.user_safe_message();

        let status = match &self {
            Self::Config(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cache(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Llm(_) => StatusCode::BAD_GATEWAY,
            Self::Pipeline(crate::PipelineError::Cancelled) => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
            Self::Pipeline(crate::PipelineError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Pipeline(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::QueryValidation(e) => match e {
                QueryValidationError::DisallowedTable { .. } => StatusCode::FORBIDDEN,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::ThreadNotFound { .. } => StatusCode::NOT_FOUND,
        };

        let body = ErrorResponse::new("nlsql_error", user_message, error_code);
        body.into_http_response(status)
    }
}
