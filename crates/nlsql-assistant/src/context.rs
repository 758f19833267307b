//! Per-thread schema-area context maintenance (§4.1 "Schema-area
//! suggestions", §4.9 `update_context`/`enrich_response`).
//!
//! These operate on a bare [`Nl2SqlResponse`] and [`ConversationContext`],
//! independent of whether the pipeline coordinator already touched them —
//! safe to call standalone (e.g. re-rendering a stored turn) as long as
//! it's only called once per turn, since it's not idempotent by design
//! (each call advances `schema_exploration_depth`).

use nlsql_core::{schema_suggestions, ConversationContext, Nl2SqlResponse};

/// Updates `current_schema_area` and `schema_exploration_depth` from a
/// just-executed response's `tables_used`, and clears any pending
/// clarification now that the turn resolved. Never called for a turn that
/// ended in a [`nlsql_core::ClarificationRequest`] — clarification turns
/// never change schema-area context (invariant 7).
pub fn update_context(context: &mut ConversationContext, response: &Nl2SqlResponse) {
    context.pending_clarification = None;
    let area = schema_suggestions::primary_area(&response.tables_used);
    context.schema_exploration_depth = if area.is_some() && area == context.current_schema_area {
        context.schema_exploration_depth.saturating_add(1)
    } else {
        1
    };
    if area.is_some() {
        context.current_schema_area = area;
    }
}

/// Attaches follow-up suggestion pills to a response: `suggestions` on
/// success, `error_suggestions` on failure, using the thread's current
/// schema area (or the generic catalog when none is known).
pub fn enrich_response(response: &mut Nl2SqlResponse, context: &ConversationContext) {
    let suggestions = schema_suggestions::suggestions_for(context.current_schema_area, context.schema_exploration_depth);
    if response.error.is_some() {
        response.error_suggestions = suggestions;
    } else {
        response.suggestions = suggestions;
    }
}
