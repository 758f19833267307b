//! Allowed-values cache (S1) error kinds.

/// Errors raised by the allowed-values cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to load distinct values for {table}.{column}")]
    LoadFailed { table: String, column: String },

    #[error("cache unavailable")]
    Unavailable,
}

impl CacheError {
    pub(crate) const fn error_code(&self) -> &'static str {
        match self {
            Self::LoadFailed { .. } => "cache_load_failed",
            Self::Unavailable => "cache_unavailable",
        }
    }
}
