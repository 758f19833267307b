//! Prometheus instrumentation, gated behind `ENABLE_INSTRUMENTATION`
//! (§6.4). Installed once at startup; the recorder handle is stashed in
//! [`crate::state::AppState`] so `/metrics` can render it on demand.
//!
//! Counters/histograms are recorded at the same two points the progress
//! reporter already brackets (`execute_query` for the whole turn,
//! per-stage durations via the coordinator's `with_progress`), so no new
//! instrumentation points are threaded through the pipeline — the chat
//! route records turn-level counters from the outcome it already renders.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installs the global Prometheus recorder and registers metric
/// descriptions. Returns the handle used to render `/metrics` text.
///
/// # Panics
/// Panics if a recorder is already installed for this process — callers
/// must call this at most once, from startup wiring.
#[must_use]
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new().install_recorder().expect("failed to install Prometheus recorder");

    describe_counter!("nlsql_chat_turns_total", "Total chat turns handled");
    describe_counter!("nlsql_chat_turns_error_total", "Chat turns that ended with an error response");
    describe_counter!("nlsql_chat_turns_clarification_total", "Chat turns that ended in a clarification request");
    describe_counter!("nlsql_query_source_template_total", "Turns answered via the template path");
    describe_counter!("nlsql_query_source_dynamic_total", "Turns answered via the dynamic query-builder path");
    describe_histogram!("nlsql_turn_duration_seconds", "Wall-clock time to handle one chat turn");

    handle
}

/// Records the outcome of one chat turn (§4.1's `PipelineOutcome`,
/// flattened to the three counters above) plus its wall-clock duration.
pub fn record_turn(duration: std::time::Duration, is_error: bool, is_clarification: bool, query_source: Option<&str>) {
    counter!("nlsql_chat_turns_total").increment(1);
    if is_error {
        counter!("nlsql_chat_turns_error_total").increment(1);
    }
    if is_clarification {
        counter!("nlsql_chat_turns_clarification_total").increment(1);
    }
    match query_source {
        Some("template") => counter!("nlsql_query_source_template_total").increment(1),
        Some("dynamic") => counter!("nlsql_query_source_dynamic_total").increment(1),
        _ => {}
    }
    histogram!("nlsql_turn_duration_seconds").record(duration.as_secs_f64());
}
