//! HTTP client for the conversational-AI service backing the parameter
//! extractor, query builder, and chat assistant (§4.2).
//!
//! This crate is the only place the core's opaque `run(prompt, thread_id)`
//! capability touches a real network boundary. `nlsql-core` never learns
//! the model family, provider, or wire protocol — it only sees
//! [`nlsql_core::LlmCapability`].

pub mod client;
pub mod config;

pub use client::ChatCompletionClient;
pub use config::LlmClientConfig;
