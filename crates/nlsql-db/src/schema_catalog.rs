//! Startup schema introspection: loads the curated table-and-column
//! metadata the dynamic query-builder path ranks against, and the
//! allowlist the query validator checks against (§4.5, §4.6).

use sqlx::postgres::PgPool;
use sqlx::Row;
use std::collections::HashMap;

use nlsql_core::{AllowedTables, ColumnMetadata, TableMetadata};
use nlsql_error::NlsqlError;

/// Schemas considered part of the application's curated surface;
/// anything outside these is never exposed to the query builder or
/// validator, independent of what else lives in the database.
const DEFAULT_SCHEMAS: &[&str] = &["public"];

/// Loads table and column metadata for every table in `schemas`, using
/// `information_schema` plus `pg_catalog` comments for descriptions.
///
/// # Errors
/// Returns [`NlsqlError::Database`] on query failure.
pub async fn load_table_metadata(pool: &PgPool, schemas: &[&str]) -> Result<Vec<TableMetadata>, NlsqlError> {
    let schemas = if schemas.is_empty() { DEFAULT_SCHEMAS } else { schemas };

    let column_rows = sqlx::query(
        r"
        SELECT
            c.table_schema,
            c.table_name,
            c.column_name,
            c.data_type,
            c.is_nullable = 'YES' AS nullable,
            COALESCE(pgd.description, '') AS column_description,
            EXISTS (
                SELECT 1 FROM information_schema.table_constraints tc
                JOIN information_schema.key_column_usage kcu
                    ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
                WHERE tc.constraint_type = 'PRIMARY KEY'
                    AND tc.table_schema = c.table_schema
                    AND tc.table_name = c.table_name
                    AND kcu.column_name = c.column_name
            ) AS is_primary_key,
            (
                SELECT ccu.table_schema || '.' || ccu.table_name
                FROM information_schema.key_column_usage kcu
                JOIN information_schema.table_constraints tc
                    ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
                JOIN information_schema.constraint_column_usage ccu
                    ON ccu.constraint_name = tc.constraint_name AND ccu.table_schema = tc.table_schema
                WHERE tc.constraint_type = 'FOREIGN KEY'
                    AND kcu.table_schema = c.table_schema
                    AND kcu.table_name = c.table_name
                    AND kcu.column_name = c.column_name
                LIMIT 1
            ) AS references_table
        FROM information_schema.columns c
        LEFT JOIN pg_catalog.pg_statio_all_tables st
            ON st.schemaname = c.table_schema AND st.relname = c.table_name
        LEFT JOIN pg_catalog.pg_description pgd
            ON pgd.objoid = st.relid AND pgd.objsubid = c.ordinal_position
        WHERE c.table_schema = ANY($1)
        ORDER BY c.table_schema, c.table_name, c.ordinal_position
        ",
    )
    .bind(schemas)
    .fetch_all(pool)
    .await?;

    let table_descriptions = sqlx::query(
        r"
        SELECT
            n.nspname AS table_schema,
            cl.relname AS table_name,
            COALESCE(obj_description(cl.oid, 'pg_class'), '') AS description
        FROM pg_catalog.pg_class cl
        JOIN pg_catalog.pg_namespace n ON n.oid = cl.relnamespace
        WHERE cl.relkind = 'r' AND n.nspname = ANY($1)
        ",
    )
    .bind(schemas)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| {
        let schema: String = row.get("table_schema");
        let table: String = row.get("table_name");
        let description: String = row.get("description");
        (format!("{schema}.{table}"), description)
    })
    .collect::<HashMap<_, _>>();

    let mut tables: HashMap<String, TableMetadata> = HashMap::new();
    for row in &column_rows {
        let schema: String = row.get("table_schema");
        let table: String = row.get("table_name");
        let full_name = format!("{schema}.{table}");

        let entry = tables.entry(full_name.clone()).or_insert_with(|| TableMetadata {
            name: full_name.clone(),
            description: table_descriptions.get(&full_name).cloned().unwrap_or_default(),
            columns: Vec::new(),
        });

        entry.columns.push(ColumnMetadata {
            name: row.get("column_name"),
            data_type: row.get("data_type"),
            nullable: row.get("nullable"),
            is_primary_key: row.get("is_primary_key"),
            references: row.get("references_table"),
            description: row.get("column_description"),
        });
    }

    let mut tables: Vec<TableMetadata> = tables.into_values().collect();
    tables.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tables)
}

/// Builds the query validator's allowlist directly from the same
/// introspected tables, so a table only becomes queryable once it's
/// actually present in the curated schemas — no separately-maintained
/// allowlist to drift out of sync with the database.
#[must_use]
pub fn allowed_tables_from(tables: &[TableMetadata]) -> AllowedTables {
    AllowedTables::new(tables.iter().map(|t| t.name.clone()))
}
