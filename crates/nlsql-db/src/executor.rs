//! Postgres-backed [`SqlExecutor`]: runs a validated, substituted SQL
//! string and turns the result set into JSON-friendly rows.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row, TypeInfo};
use std::collections::HashMap;

use nlsql_core::{QueryResultSet, SqlExecutor};
use nlsql_error::NlsqlError;

pub struct PostgresExecutor {
    pool: PgPool,
    /// Upper bound on rows returned to the pipeline, applied as a
    /// server-side `LIMIT` wrapper rather than trusting every template or
    /// dynamically-built query to bound itself.
    row_cap: u32,
}

const DEFAULT_ROW_CAP: u32 = 1000;

impl PostgresExecutor {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool, row_cap: DEFAULT_ROW_CAP }
    }

    #[must_use]
    pub const fn with_row_cap(pool: PgPool, row_cap: u32) -> Self {
        Self { pool, row_cap }
    }
}

#[async_trait]
impl SqlExecutor for PostgresExecutor {
    async fn execute(&self, sql: &str) -> Result<QueryResultSet, NlsqlError> {
        let trimmed = sql.trim();
        let body = trimmed.strip_suffix(';').unwrap_or(trimmed);
        let wrapped = format!("SELECT * FROM ({body}) AS nlsql_bounded LIMIT {}", self.row_cap);
        let rows = sqlx::query(&wrapped).fetch_all(&self.pool).await?;

        let columns = rows.first().map(|row| row.columns().iter().map(|c| c.name().to_string()).collect()).unwrap_or_default();

        let result_rows = rows.iter().map(row_to_map).collect();

        Ok(QueryResultSet { columns, rows: result_rows })
    }
}

fn row_to_map(row: &PgRow) -> HashMap<String, serde_json::Value> {
    row.columns().iter().enumerate().map(|(idx, col)| (col.name().to_string(), column_to_json(row, idx))).collect()
}

/// Decodes one column into a JSON value based on its Postgres type name.
/// Unrecognized or exotic types fall back to a text decode so the
/// executor degrades gracefully rather than dropping the column.
fn column_to_json(row: &PgRow, idx: usize) -> serde_json::Value {
    let type_name = row.column(idx).type_info().name();
    match type_name {
        "BOOL" => opt(row, idx, |v: bool| serde_json::Value::Bool(v)),
        "INT2" => opt(row, idx, |v: i16| serde_json::Value::from(v)),
        "INT4" => opt(row, idx, |v: i32| serde_json::Value::from(v)),
        "INT8" => opt(row, idx, |v: i64| serde_json::Value::from(v)),
        "FLOAT4" => opt(row, idx, |v: f32| serde_json::Value::from(v)),
        "FLOAT8" => opt(row, idx, |v: f64| serde_json::Value::from(v)),
        "NUMERIC" => opt(row, idx, |v: Decimal| serde_json::Value::String(v.to_string())),
        "JSON" | "JSONB" => row.try_get::<Option<serde_json::Value>, _>(idx).ok().flatten().unwrap_or(serde_json::Value::Null),
        "TIMESTAMP" => opt(row, idx, |v: chrono::NaiveDateTime| serde_json::Value::String(v.to_string())),
        "TIMESTAMPTZ" => opt(row, idx, |v: chrono::DateTime<chrono::Utc>| serde_json::Value::String(v.to_rfc3339())),
        "DATE" => opt(row, idx, |v: chrono::NaiveDate| serde_json::Value::String(v.to_string())),
        "UUID" => opt(row, idx, |v: uuid::Uuid| serde_json::Value::String(v.to_string())),
        _ => opt(row, idx, serde_json::Value::String),
    }
}

fn opt<'r, T, F>(row: &'r PgRow, idx: usize, to_json: F) -> serde_json::Value
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    F: FnOnce(T) -> serde_json::Value,
{
    row.try_get::<Option<T>, _>(idx).ok().flatten().map_or(serde_json::Value::Null, to_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires a running PostgreSQL instance; run with `cargo test -- --ignored`.

    #[tokio::test]
    #[ignore]
    async fn executes_and_caps_rows() {
        let pool = PgPool::connect("postgres://localhost/nlsql_test").await.expect("connect");
        let executor = PostgresExecutor::with_row_cap(pool, 2);
        let result = executor.execute("SELECT generate_series(1, 10) AS n").await.expect("execute");
        assert_eq!(result.columns, vec!["n".to_string()]);
        assert_eq!(result.rows.len(), 2);
    }
}
