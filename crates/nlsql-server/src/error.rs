//! Server-level errors — startup and transport failures that sit above
//! [`nlsql_error::NlsqlError`], which already covers pipeline-level
//! failure.

/// Errors that can terminate the server process.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind server: {0}")]
    Bind(String),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::SettingsError),

    #[error("startup error: {0}")]
    Startup(#[from] nlsql_error::NlsqlError),

    #[error("io error: {0}")]
    Io(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
