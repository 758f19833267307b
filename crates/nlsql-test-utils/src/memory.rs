//! In-memory [`SqlExecutor`]/[`TableRanker`] doubles standing in for
//! `nlsql-db`'s Postgres-backed implementations.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use nlsql_core::{QueryResultSet, SqlExecutor, TableMetadata, TableRanker};
use nlsql_error::NlsqlError;

/// Returns a fixed [`QueryResultSet`] for every `execute` call, and
/// records every SQL string it was asked to run so a test can assert on
/// the final substituted/validated query (§8 "executed SQL" properties).
pub struct InMemoryExecutor {
    result: QueryResultSet,
    executed: Mutex<Vec<String>>,
}

impl InMemoryExecutor {
    #[must_use]
    pub fn new(result: QueryResultSet) -> Self {
        Self { result, executed: Mutex::new(Vec::new()) }
    }

    #[must_use]
    pub fn executed_statements(&self) -> Vec<String> {
        self.executed.lock().expect("lock not poisoned").clone()
    }
}

#[async_trait]
impl SqlExecutor for InMemoryExecutor {
    async fn execute(&self, sql: &str) -> Result<QueryResultSet, NlsqlError> {
        self.executed.lock().expect("lock not poisoned").push(sql.to_string());
        Ok(self.result.clone())
    }
}

/// Builds a one-row, one-column result set — the common case for fixture
/// tests that only care about pipeline routing, not result shape.
#[must_use]
pub fn single_row(column: &str, value: serde_json::Value) -> QueryResultSet {
    let mut row = HashMap::new();
    row.insert(column.to_string(), value);
    QueryResultSet { columns: vec![column.to_string()], rows: vec![row] }
}

/// Ranks by returning the whole fixed catalog regardless of `user_text`,
/// for tests that only care about what happens downstream of ranking.
pub struct InMemoryTableRanker(pub Vec<TableMetadata>);

#[async_trait]
impl TableRanker for InMemoryTableRanker {
    async fn rank_tables(&self, _user_text: &str) -> Vec<TableMetadata> {
        self.0.clone()
    }
}
