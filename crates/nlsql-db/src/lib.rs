//! PostgreSQL-backed implementations of the execution-adjacent traits
//! `nlsql-core` depends on: the allowed-values loader, the final SQL
//! executor, the dynamic-path table ranker, and startup schema
//! introspection.

pub mod allowed_values;
pub mod executor;
pub mod identifier;
pub mod pool;
pub mod schema_catalog;
pub mod table_ranker;

pub use allowed_values::PostgresAllowedValuesLoader;
pub use executor::PostgresExecutor;
pub use pool::{connect, connect_with_pool_size};
pub use schema_catalog::{allowed_tables_from, load_table_metadata};
pub use table_ranker::CatalogTableRanker;
