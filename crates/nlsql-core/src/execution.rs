//! Execution-adjacent traits the coordinator depends on but does not
//! implement: running the final SQL, and ranking table metadata for the
//! dynamic path. Concrete implementations live in `nlsql-db`.

use async_trait::async_trait;
use std::collections::HashMap;

use nlsql_error::NlsqlError;

use crate::model::TableMetadata;

/// One executed query's result set, in column-major presentation order
/// plus row-major data.
#[derive(Debug, Clone, Default)]
pub struct QueryResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, serde_json::Value>>,
}

/// Executes a validated, substituted SQL string against the curated
/// database. The executor performs its own parameterized-execution pass
/// on top of the substituted literal SQL (§4.3).
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<QueryResultSet, NlsqlError>;
}

/// Ranks table metadata by relevance to a user's utterance for the
/// dynamic query-builder path (C5 input).
#[async_trait]
pub trait TableRanker: Send + Sync {
    async fn rank_tables(&self, user_text: &str) -> Vec<TableMetadata>;
}

/// Looks a [`crate::model::QueryTemplate`] up by id, used to resume a
/// clarification without re-running template search (§4.1 "Clarification
/// resumption").
#[async_trait]
pub trait TemplateLookup: Send + Sync {
    async fn get(&self, template_id: &str) -> Option<crate::model::QueryTemplate>;
}

/// Splits `columns` into the visible prefix (capped at
/// `max_display_columns`) and the remainder, preserving original order in
/// both, per §6.2 / §8 boundary tests.
#[must_use]
pub fn split_visible_columns(columns: &[String], max_display_columns: usize) -> (Vec<String>, Vec<String>) {
    if columns.len() <= max_display_columns {
        (columns.to_vec(), Vec::new())
    } else {
        (columns[..max_display_columns].to_vec(), columns[max_display_columns..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_at_cap_has_no_hidden_columns() {
        let cols: Vec<String> = (0..8).map(|i| format!("c{i}")).collect();
        let (visible, hidden) = split_visible_columns(&cols, 8);
        assert_eq!(visible.len(), 8);
        assert!(hidden.is_empty());
    }

    #[test]
    fn one_over_cap_hides_exactly_one() {
        let cols: Vec<String> = (0..9).map(|i| format!("c{i}")).collect();
        let (visible, hidden) = split_visible_columns(&cols, 8);
        assert_eq!(visible.len(), 8);
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0], "c8");
    }
}
