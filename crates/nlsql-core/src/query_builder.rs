//! Query Builder (C5) — dynamic SQL synthesis from ranked table metadata
//! when no template matches (§4.5).

use crate::llm::{parse_query_builder_response, LlmCapability};
use crate::model::{SqlDraft, TableMetadata};
use crate::progress::{with_progress, ProgressReporter};

/// Default cap on visible columns unless the user explicitly asks for all
/// (§4.2, §6.4).
pub const DEFAULT_MAX_DISPLAY_COLUMNS: usize = 8;

/// Inputs to the query builder: the user's utterance plus ranked table
/// metadata, and optional feedback from a prior validation failure
/// (§4.1 "Transitions on failure").
pub struct QueryBuilderRequest<'a> {
    pub user_text: &'a str,
    pub ranked_tables: &'a [TableMetadata],
    pub prior_violation_context: Option<&'a str>,
    pub max_display_columns: usize,
}

/// Builds a prompt instructing the LLM to produce a single-statement
/// `SELECT`, per §4.5 steps 1-2.
fn build_prompt(request: &QueryBuilderRequest<'_>) -> String {
    let mut prompt = String::new();
    prompt.push_str("You are generating a single read-only SQL SELECT statement from the following table metadata.\n\n");
    for table in request.ranked_tables {
        prompt.push_str(&format!("Table {} — {}\n", table.name, table.description));
        for col in &table.columns {
            prompt.push_str(&format!(
                "  - {} ({}{}{}){}\n",
                col.name,
                col.data_type,
                if col.nullable { ", nullable" } else { "" },
                if col.is_primary_key { ", PK" } else { "" },
                col.references.as_ref().map(|r| format!(" -> {r}")).unwrap_or_default(),
            ));
        }
    }
    prompt.push_str(&format!(
        "\nSelect at most {} relevant columns unless the user explicitly asks for all columns. \
         Prefer identity/name columns and columns the user referenced.\n",
        request.max_display_columns
    ));
    if let Some(violation) = request.prior_violation_context {
        prompt.push_str(&format!(
            "\nA previous attempt was rejected for this reason: {violation}. Produce a corrected query.\n"
        ));
    }
    prompt.push_str(&format!(
        "\nUser question: {}\n\n\
         Respond as JSON: {{\"sql\": str, \"reasoning\": str, \"confidence\": float, \"tables_used\": [str]}}. \
         Calibrate confidence: >= 0.8 for clear intent, 0.5-0.8 for inferred intent, < 0.5 for vague intent.\n",
        request.user_text
    ));
    prompt
}

/// Invokes the query-builder LLM and returns an [`SqlDraft`] on the
/// dynamic path. A parse failure or missing `confidence` defaults
/// confidence to 0.5 (§4.5 step 3) rather than failing the request.
pub async fn build(
    request: &QueryBuilderRequest<'_>,
    llm: &dyn LlmCapability,
    reporter: &dyn ProgressReporter,
    thread_id: &str,
) -> SqlDraft {
    let prompt = build_prompt(request);
    let raw = with_progress(reporter, "query_builder", true, llm.run(&prompt, thread_id)).await;

    let outcome = match raw {
        Ok(text) => parse_query_builder_response(&text).ok(),
        Err(e) => {
            tracing::warn!(error = %e, "query-builder LLM call failed");
            None
        }
    };

    match outcome {
        Some(parsed) => {
            let confidence = parsed.confidence.unwrap_or(0.5);
            let tables = if parsed.tables_used.is_empty() {
                crate::query_validator::tables_referenced_in(&parsed.sql)
            } else {
                parsed.tables_used
            };
            SqlDraft::from_dynamic(parsed.sql, tables, confidence, parsed.reasoning)
        }
        None => {
            // LLM error or unparseable response: confidence 0.5 lets the
            // coordinator's dynamic gate drive clarification (§4.5, §7).
            SqlDraft::from_dynamic(String::new(), Vec::new(), 0.5, "I couldn't synthesize a query for that question.".to_string())
        }
    }
}
