//! Postgres-backed [`AllowedValuesLoader`] (S1's persistence side).

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use nlsql_core::AllowedValuesLoader;
use nlsql_error::CacheError;

use crate::identifier::{is_safe, quote};

pub struct PostgresAllowedValuesLoader {
    pool: PgPool,
}

impl PostgresAllowedValuesLoader {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AllowedValuesLoader for PostgresAllowedValuesLoader {
    /// `SELECT DISTINCT column FROM table ORDER BY column LIMIT limit + 1`,
    /// stringifying every value so the cache stays type-agnostic; the
    /// `+1` lets [`nlsql_core::AllowedValuesCache`] detect truncation
    /// without a separate `COUNT(*)` round trip.
    async fn load(&self, table: &str, column: &str, limit: usize) -> Result<Vec<String>, CacheError> {
        if !is_safe(table) || !is_safe(column) {
            tracing::error!(table, column, "refusing to load allowed values for unsafe identifier");
            return Err(CacheError::LoadFailed { table: table.to_string(), column: column.to_string() });
        }

        let sql = format!(
            "SELECT DISTINCT {column}::text AS value FROM {table} WHERE {column} IS NOT NULL ORDER BY {column} LIMIT $1",
            column = quote(column),
            table = quote(table),
        );

        let fetch_limit = i64::try_from(limit.saturating_add(1)).unwrap_or(i64::MAX);
        let rows = sqlx::query(&sql).bind(fetch_limit).fetch_all(&self.pool).await.map_err(|e| {
            tracing::warn!(table, column, error = %e, "allowed-values query failed");
            CacheError::LoadFailed { table: table.to_string(), column: column.to_string() }
        })?;

        Ok(rows.into_iter().map(|row| row.get::<String, _>("value")).collect())
    }
}
