//! Progress Reporter (S2) — an injectable sink for stage-start/stage-end
//! events. Production instances write to a per-request SSE queue; tests
//! use [`NoOpReporter`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

/// One stage-start or stage-end event, carrying a per-request monotonic
/// sequence number (§4.8).
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub sequence: u64,
    pub step: String,
    pub status: StepStatus,
    pub duration: Option<Duration>,
    /// True for the outer stage envelope; false for a nested tool event
    /// (§6.1 `is_parent`).
    pub is_parent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Started,
    Completed,
}

/// Injected sink for stage progress. Implementations must not block the
/// calling stage — production queues are bounded and drop events under
/// backpressure (§5) rather than stalling the pipeline.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn step_start(&self, name: &str, is_parent: bool);
    async fn step_end(&self, name: &str, is_parent: bool, duration: Option<Duration>);
}

/// Silent reporter used by tests and any non-streaming caller.
#[derive(Debug, Default)]
pub struct NoOpReporter;

#[async_trait]
impl ProgressReporter for NoOpReporter {
    async fn step_start(&self, _name: &str, _is_parent: bool) {}
    async fn step_end(&self, _name: &str, _is_parent: bool, _duration: Option<Duration>) {}
}

/// Reporter that writes events into a bounded `tokio::sync::mpsc` channel,
/// the queue the HTTP edge drains into the SSE stream (§4.8, §6.1).
pub struct QueueReporter {
    sender: tokio::sync::mpsc::Sender<ProgressEvent>,
    sequence: AtomicU64,
}

impl QueueReporter {
    #[must_use]
    pub fn new(sender: tokio::sync::mpsc::Sender<ProgressEvent>) -> Self {
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Send without blocking; drop and warn on a full queue rather than
    /// stalling the pipeline (§5 backpressure).
    fn try_send(&self, event: ProgressEvent) {
        if self.sender.try_send(event).is_err() {
            tracing::warn!("progress queue full or closed; dropping step event");
        }
    }
}

#[async_trait]
impl ProgressReporter for QueueReporter {
    async fn step_start(&self, name: &str, is_parent: bool) {
        self.try_send(ProgressEvent {
            sequence: self.next_sequence(),
            step: name.to_string(),
            status: StepStatus::Started,
            duration: None,
            is_parent,
        });
    }

    async fn step_end(&self, name: &str, is_parent: bool, duration: Option<Duration>) {
        self.try_send(ProgressEvent {
            sequence: self.next_sequence(),
            step: name.to_string(),
            status: StepStatus::Completed,
            duration,
            is_parent,
        });
    }
}

/// Times a stage, reporting start/end around the given async block.
///
/// Tools nested inside a stage (template search, SQL execute) report their
/// own pair marked `is_parent = false` so the UI can nest them under the
/// stage's `is_parent = true` envelope.
pub async fn with_progress<F, T>(reporter: &dyn ProgressReporter, name: &str, is_parent: bool, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    reporter.step_start(name, is_parent).await;
    let start = std::time::Instant::now();
    let result = fut.await;
    reporter.step_end(name, is_parent, Some(start.elapsed())).await;
    result
}
