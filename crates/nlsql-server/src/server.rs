//! HTTP server assembly and lifecycle.

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::middleware::{cors_layer, trace_layer};
use crate::operational::shutdown_signal;
use crate::routes;
use crate::state::AppState;
use crate::{Result, ServerError};

/// The NL2SQL HTTP server.
pub struct Server {
    bind_addr: String,
    state: AppState,
}

impl Server {
    #[must_use]
    pub const fn new(bind_addr: String, state: AppState) -> Self {
        Self { bind_addr, state }
    }

    /// Builds the Axum router, exposed for tests that drive it directly
    /// with `tower::ServiceExt::oneshot` instead of binding a real socket.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/chat/stream", get(routes::chat_stream))
            .route("/health", get(routes::health_handler))
            .route("/readyz", get(routes::readyz_handler))
            .route("/metrics", get(routes::metrics_handler))
            .route("/api/threads", get(routes::list_threads))
            .route("/api/threads/{id}", get(routes::get_thread).patch(routes::patch_thread).delete(routes::delete_thread))
            .route("/api/threads/{id}/messages", get(routes::get_thread_messages))
            .with_state(self.state.clone())
            .layer(trace_layer())
            .layer(cors_layer())
    }

    /// Binds and serves until the process is terminated.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if the configured address cannot be
    /// bound, or [`ServerError::Io`] on a runtime accept-loop failure.
    pub async fn serve(self) -> Result<()> {
        let bind_addr = self.bind_addr.clone();
        let app = self.router();

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| ServerError::Bind(e.to_string()))?;
        info!(%bind_addr, "nlsql-server listening");

        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.map_err(ServerError::Io)?;
        Ok(())
    }
}
