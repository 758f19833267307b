//! HTTP routes.

pub mod chat;
pub mod health;
pub mod metrics;
pub mod threads;

pub use chat::chat_stream;
pub use health::{health_handler, readyz_handler};
pub use metrics::metrics_handler;
pub use threads::{delete_thread, get_thread, get_thread_messages, list_threads, patch_thread};
