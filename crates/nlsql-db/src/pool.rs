//! Connection pool construction and startup checks.

use sqlx::postgres::{PgPool, PgPoolOptions};

use nlsql_error::NlsqlError;

/// Creates a pool with a default size and verifies connectivity with a
/// trivial round trip before returning it, so a bad connection string
/// fails at startup rather than on the first user request.
///
/// # Errors
/// Returns [`NlsqlError::Database`] if the pool cannot be created or the
/// connectivity check fails.
pub async fn connect(database_url: &str) -> Result<PgPool, NlsqlError> {
    connect_with_pool_size(database_url, 10).await
}

/// Same as [`connect`] with an explicit maximum pool size.
///
/// # Errors
/// Returns [`NlsqlError::Database`] if the pool cannot be created or the
/// connectivity check fails.
pub async fn connect_with_pool_size(database_url: &str, max_connections: u32) -> Result<PgPool, NlsqlError> {
    let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}
