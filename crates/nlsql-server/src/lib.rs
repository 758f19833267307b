//! HTTP edge for the NL2SQL pipeline (§6): the SSE chat-stream endpoint,
//! thread-store proxy stubs, health check, and the startup wiring that
//! turns environment configuration into a running [`Server`].
//!
//! This crate owns no pipeline logic — every data turn is delegated to
//! `nlsql-assistant`'s `DataAssistant`, which in turn delegates to
//! `nlsql-core`. This layer's job is identity-adjacent plumbing: parsing
//! the request, rendering progress onto an SSE channel, and persisting
//! per-thread conversational state between turns.

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod operational;
pub mod routes;
pub mod server;
pub mod startup;
pub mod state;

pub use config::Settings;
pub use error::{Result, ServerError};
pub use server::Server;
pub use startup::build_app_state;
pub use state::AppState;
