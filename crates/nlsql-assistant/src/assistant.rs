//! Data Assistant (S3) — the stateful per-thread object described in §4.9.
//!
//! Holds no SQL logic itself: every data turn is delegated to
//! [`nlsql_core::process_query`]/[`nlsql_core::resume`]. This layer only
//! classifies intent, tracks `ConversationContext`, and renders the wire
//! events the chat stream sends down.

use std::sync::Arc;

use nlsql_core::{
    ConversationContext, Dependencies, LlmCapability, Nl2SqlResponse, PipelineOutcome, PipelineResult, ProgressReporter, ResumeInput, ResumeStage,
};

use crate::context::{enrich_response, update_context};
use crate::intent::{classify_intent, IntentKind};
use crate::render::{render_content, render_error, render_outcome, ChatStreamEvent};
use crate::request::build_request;

/// The outcome of handling one chat message: the wire event to stream
/// back, and the context to persist for the thread's next turn.
pub struct AssistantTurn {
    pub event: ChatStreamEvent,
    pub context: ConversationContext,
}

pub struct DataAssistant {
    pipeline: Arc<Dependencies>,
    /// Reused for both intent classification and small-talk replies — a
    /// general conversational capability distinct from the pipeline's
    /// parameter-extraction and query-builder LLM roles (§4.2).
    chat_llm: Arc<dyn LlmCapability>,
}

impl DataAssistant {
    #[must_use]
    pub fn new(pipeline: Arc<Dependencies>, chat_llm: Arc<dyn LlmCapability>) -> Self {
        Self { pipeline, chat_llm }
    }

    /// Handles one incoming chat message for `thread_id`, given the
    /// thread's persisted context. Resumes a pending clarification when
    /// one exists; otherwise classifies intent and either replies
    /// conversationally or runs the full pipeline.
    pub async fn handle_turn(
        &self,
        user_text: &str,
        thread_id: &str,
        context: ConversationContext,
        reporter: &dyn ProgressReporter,
        tool_call_id: &str,
    ) -> AssistantTurn {
        if let Some(pending) = context.pending_clarification.clone() {
            let input = match pending.stage {
                ResumeStage::ParameterExtraction => ResumeInput::ClarificationAnswer(user_text.to_string()),
                ResumeStage::DynamicConfirmation => resume_input_for_dynamic(user_text),
            };
            return match nlsql_core::resume(pending, input, thread_id, context, &self.pipeline, reporter).await {
                Ok(result) => self.finish(result, thread_id, tool_call_id),
                Err(e) => {
                    tracing::error!(error = %e, thread_id, "failed to resume pending clarification");
                    AssistantTurn {
                        event: render_error(thread_id, &e.user_safe_message()),
                        context: ConversationContext::default(),
                    }
                }
            };
        }

        let classification = classify_intent(user_text, self.chat_llm.as_ref(), thread_id).await;
        if classification.kind == IntentKind::Chat {
            let reply = self.chat_reply(user_text, thread_id).await;
            return AssistantTurn {
                event: render_content(&reply),
                context,
            };
        }

        let request = build_request(user_text, thread_id, &context);
        let result = nlsql_core::process_query(&request, context, &self.pipeline, reporter).await;
        self.finish(result, thread_id, tool_call_id)
    }

    async fn chat_reply(&self, user_text: &str, thread_id: &str) -> String {
        let prompt = format!("Reply conversationally and briefly to: {user_text}");
        match self.chat_llm.run(&prompt, thread_id).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "chat reply LLM call failed");
                "I'm not sure how to respond to that right now.".to_string()
            }
        }
    }

    fn finish(&self, result: PipelineResult, thread_id: &str, tool_call_id: &str) -> AssistantTurn {
        let PipelineResult { outcome, mut context } = result;
        let outcome = match outcome {
            PipelineOutcome::Response(mut response) => {
                finalize_response(&mut response, &mut context);
                PipelineOutcome::Response(response)
            }
            other => other,
        };
        let event = render_outcome(thread_id, tool_call_id, &outcome);
        AssistantTurn { event, context }
    }
}

fn finalize_response(response: &mut Nl2SqlResponse, context: &mut ConversationContext) {
    update_context(context, response);
    enrich_response(response, context);
}

/// Interprets the user's free-text reply to a dynamic-path confirmation
/// question as accept or revise. A short affirmative is an accept;
/// anything else is treated as revised intent and re-enters the query
/// builder (§4.1 "Transitions on failure").
fn resume_input_for_dynamic(user_text: &str) -> ResumeInput {
    const AFFIRMATIVE: &[&str] = &["yes", "yep", "yeah", "correct", "right", "that's right", "confirm", "go ahead", "sounds good"];
    let normalized = user_text.trim().trim_end_matches(['.', '!']).to_lowercase();
    if AFFIRMATIVE.contains(&normalized.as_str()) {
        ResumeInput::AcceptDynamicDraft
    } else {
        ResumeInput::ReviseDynamicDraft(user_text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_yes_is_an_accept() {
        assert!(matches!(resume_input_for_dynamic("Yes!"), ResumeInput::AcceptDynamicDraft));
    }

    #[test]
    fn other_text_is_a_revision() {
        assert!(matches!(resume_input_for_dynamic("no, group by region instead"), ResumeInput::ReviseDynamicDraft(_)));
    }
}
