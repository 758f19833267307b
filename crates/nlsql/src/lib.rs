//! NL2SQL pipeline — umbrella crate.
//!
//! Converts natural-language questions from authenticated users into
//! safe, parameterized SQL executed against a curated business database,
//! then streams structured results and intermediate progress back to a
//! chat client.
//!
//! This crate carries no logic of its own; it re-exports the pipeline
//! crates so a consumer depending only on `nlsql` gets the whole stack:
//!
//! - [`nlsql_core`] — the pipeline core (C1-C6, S1, S2): template search,
//!   parameter extraction/validation, dynamic query synthesis, query
//!   validation, the allowed-values cache, and the progress reporter.
//! - [`nlsql_db`] — Postgres-backed implementations of the execution-
//!   adjacent traits `nlsql-core` depends on.
//! - [`nlsql_llm_client`] — the HTTP client for the conversational-AI
//!   service backing the two LLM capability roles (§4.2).
//! - [`nlsql_assistant`] — the stateful per-thread data assistant (S3)
//!   that drives the coordinator and renders the chat-stream contract.
//! - [`nlsql_error`] — the unified error types shared by all of the above.
//!
//! The HTTP edge (identity, SSE transport, thread-store proxying) lives
//! one layer up, in `nlsql-server`.

pub use nlsql_assistant as assistant;
pub use nlsql_core as core;
pub use nlsql_db as db;
pub use nlsql_error as error;
pub use nlsql_llm_client as llm_client;
