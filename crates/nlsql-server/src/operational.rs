//! Process lifecycle: the graceful-shutdown signal future `serve` waits
//! on (§5 "Cancellation" is per-request; this is the whole-process
//! analogue — finish in-flight SSE streams, then stop accepting new
//! connections).

use tokio::signal;

/// Resolves on the first `SIGINT`/`Ctrl-C` or `SIGTERM`, whichever comes
/// first. Passed to `axum::serve(...).with_graceful_shutdown(...)`.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl-C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
