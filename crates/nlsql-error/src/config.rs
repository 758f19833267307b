//! Configuration load/validation error kinds.

use std::path::PathBuf;

/// Errors raised loading `nlsql-server`'s `Settings`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {name}")]
    MissingVar { name: String },

    #[error("invalid value for environment variable {name}: {value}")]
    InvalidVar { name: String, value: String },

    #[error("failed to read config file at {path}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file")]
    ParseError {
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub(crate) const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingVar { .. } => "config_missing_var",
            Self::InvalidVar { .. } => "config_invalid_var",
            Self::ReadError { .. } => "config_read_error",
            Self::ParseError { .. } => "config_parse_error",
        }
    }
}
