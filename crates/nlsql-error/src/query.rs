//! Query validator (C6) violation kinds and user-safe messaging.

/// A single SQL-safety violation kind, per §6 of the query validator design.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryValidationError {
    #[error("statement is not a top-level SELECT")]
    DisallowedStatementType,

    #[error("more than one statement found in the draft")]
    MultipleStatements,

    #[error("injection pattern detected: {pattern}")]
    InjectionPattern { pattern: String },

    #[error("referenced table(s) not in the allowlist: {tables:?}")]
    DisallowedTable { tables: Vec<String> },

    #[error("data-modification token found at top level: {token}")]
    DataModification { token: String },
}

impl QueryValidationError {
    pub(crate) const fn error_code(&self) -> &'static str {
        match self {
            Self::DisallowedStatementType => "disallowed_statement_type",
            Self::MultipleStatements => "multiple_statements",
            Self::InjectionPattern { .. } => "injection_pattern",
            Self::DisallowedTable { .. } => "disallowed_table",
            Self::DataModification { .. } => "data_modification",
        }
    }

    /// User-safe message per §7 — never includes the raw violation detail.
    #[must_use]
    pub fn user_safe_message(&self) -> String {
        match self {
            Self::DisallowedTable { .. } => {
                "I couldn't find the right tables for that question.".to_string()
            }
            Self::MultipleStatements | Self::DisallowedStatementType => {
                "Try narrowing your question to a single table.".to_string()
            }
            Self::InjectionPattern { .. } | Self::DataModification { .. } => {
                "I couldn't produce a safe query for that question.".to_string()
            }
        }
    }
}
