//! Builds pipeline input from a chat message (§4.9 `build_request`).

use nlsql_core::{ConversationContext, ProcessQueryRequest};

/// Constructs the coordinator's request for a fresh (non-resumed) turn.
///
/// `is_refinement` is derived from context rather than passed by the
/// caller, per the two-argument contract in §4.9: a thread that has
/// already established a schema area is treated as refining that line of
/// questioning, which skips the dynamic-path confidence gate for this
/// turn (GLOSSARY "Refinement turn"). A brand-new thread is never a
/// refinement.
#[must_use]
pub fn build_request(user_text: &str, thread_id: &str, context: &ConversationContext) -> ProcessQueryRequest {
    ProcessQueryRequest {
        user_text: user_text.to_string(),
        thread_id: thread_id.to_string(),
        is_refinement: context.current_schema_area.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlsql_core::SchemaArea;

    #[test]
    fn fresh_thread_is_not_a_refinement() {
        let context = ConversationContext::default();
        let request = build_request("how many orders", "t1", &context);
        assert!(!request.is_refinement);
    }

    #[test]
    fn established_area_marks_refinement() {
        let context = ConversationContext { current_schema_area: Some(SchemaArea::Sales), schema_exploration_depth: 2, pending_clarification: None };
        let request = build_request("now by region", "t1", &context);
        assert!(request.is_refinement);
    }
}
