//! Pipeline Coordinator (C1) — the single orchestrator every user turn
//! passes through (§4.1).
//!
//! `process_query` is deliberately infallible at the Rust level: every
//! terminal failure becomes an [`Nl2SqlResponse`] with `error` set rather
//! than a `Result::Err`, matching §7's rule that the chat client always
//! receives a renderable turn. The one exception is [`resume`] being asked
//! to resume a thread with no pending state, which is a caller bug, not a
//! pipeline outcome.

use std::sync::Arc;

use nlsql_error::{NlsqlError, PipelineError};

use crate::cache::AllowedValuesProvider;
use crate::confidence::{classify, ConfidenceThresholds, ConfidenceTier};
use crate::execution::{split_visible_columns, SqlExecutor, TableRanker, TemplateLookup};
use crate::llm::LlmCapability;
use crate::model::{
    ClarificationRequest, ConversationContext, Nl2SqlResponse, ParameterExtractionRequest, PendingClarificationState,
    QuerySource, ResumeStage, SqlDraft,
};
use crate::progress::{with_progress, ProgressReporter};
use crate::query_validator::AllowedTables;
use crate::template_search::TemplateSearch;
use crate::{param_extractor, param_validator, query_builder, query_validator, schema_suggestions};

/// Minimum template-search score to treat a candidate as a usable match;
/// below this, the coordinator falls through to the dynamic path (§4.2).
pub const DEFAULT_TEMPLATE_MATCH_THRESHOLD: f64 = 0.3;

/// The collaborators `process_query` needs, wired once at startup and
/// shared across requests via `Arc` (§9 "Shared clients and cache
/// lifetimes").
pub struct Dependencies {
    pub template_search: Arc<dyn TemplateSearch>,
    pub template_lookup: Arc<dyn TemplateLookup>,
    pub allowed_values: Arc<dyn AllowedValuesProvider>,
    pub param_extraction_llm: Arc<dyn LlmCapability>,
    pub query_builder_llm: Arc<dyn LlmCapability>,
    pub table_ranker: Arc<dyn TableRanker>,
    pub executor: Arc<dyn SqlExecutor>,
    pub allowed_tables: Arc<AllowedTables>,
    pub thresholds: ConfidenceThresholds,
    pub template_match_threshold: f64,
    pub max_display_columns: usize,
}

/// One user turn: either a fresh question or a resumed clarification.
pub struct ProcessQueryRequest {
    pub user_text: String,
    pub thread_id: String,
    /// True when this turn revises an earlier accepted answer rather than
    /// asking something new; skips the dynamic-path confidence gate (§4.1,
    /// GLOSSARY "Refinement turn").
    pub is_refinement: bool,
}

/// What answering the user's new message produces.
pub enum PipelineOutcome {
    Response(Nl2SqlResponse),
    Clarification(ClarificationRequest),
}

/// `process_query`/`resume`'s result: the turn's outcome plus the
/// [`ConversationContext`] to persist for the thread (§4.9, invariant 7).
pub struct PipelineResult {
    pub outcome: PipelineOutcome,
    pub context: ConversationContext,
}

/// How the user answered a pending clarification, used by [`resume`].
pub enum ResumeInput {
    /// Free-text answer to a parameter-extraction clarification question.
    ClarificationAnswer(String),
    /// Accepts a previously-surfaced dynamic-path draft as-is.
    AcceptDynamicDraft,
    /// Asks the query builder to retry with revised intent.
    ReviseDynamicDraft(String),
}

/// Runs a fresh turn: template search, then either parameter extraction or
/// dynamic synthesis, then validation, execution, and response assembly.
pub async fn process_query(
    request: &ProcessQueryRequest,
    context: ConversationContext,
    deps: &Dependencies,
    reporter: &dyn ProgressReporter,
) -> PipelineResult {
    let matches = with_progress(reporter, "template_search", true, deps.template_search.search(&request.user_text)).await;
    let best = matches.into_iter().find(|m| m.score >= deps.template_match_threshold);

    match best {
        Some(candidate) => run_template_path(request, candidate.template, context, deps, reporter).await,
        None => run_dynamic_path(request, context, deps, reporter, None).await,
    }
}

/// Resumes a thread with a previously-persisted [`PendingClarificationState`]
/// (§4.1 "Clarification resumption", §6.5).
///
/// # Errors
/// Returns [`NlsqlError::Pipeline`] with [`PipelineError::NoPendingClarification`]
/// if `input` doesn't match `pending.stage` (a caller bug: the HTTP edge
/// should never route a revise/accept onto a parameter-extraction pending
/// state or vice versa).
pub async fn resume(
    pending: PendingClarificationState,
    input: ResumeInput,
    thread_id: &str,
    context: ConversationContext,
    deps: &Dependencies,
    reporter: &dyn ProgressReporter,
) -> Result<PipelineResult, NlsqlError> {
    match (pending.stage, &input) {
        (ResumeStage::ParameterExtraction, ResumeInput::ClarificationAnswer(answer)) => {
            Ok(resume_parameter_extraction(pending, answer, context, deps, reporter).await)
        }
        (ResumeStage::DynamicConfirmation, ResumeInput::AcceptDynamicDraft) => {
            Ok(resume_accept_dynamic(pending, context, deps, reporter).await)
        }
        (ResumeStage::DynamicConfirmation, ResumeInput::ReviseDynamicDraft(revised_text)) => {
            let request = ProcessQueryRequest {
                user_text: revised_text.clone(),
                thread_id: thread_id.to_string(),
                is_refinement: true,
            };
            Ok(run_dynamic_path(&request, context, deps, reporter, None).await)
        }
        _ => Err(PipelineError::NoPendingClarification { thread_id: thread_id.to_string() }.into()),
    }
}

async fn run_template_path(
    request: &ProcessQueryRequest,
    template: crate::model::QueryTemplate,
    context: ConversationContext,
    deps: &Dependencies,
    reporter: &dyn ProgressReporter,
) -> PipelineResult {
    let extraction_request = ParameterExtractionRequest {
        user_text: request.user_text.clone(),
        template: template.clone(),
        prior_context: None,
        is_refinement: request.is_refinement,
    };

    let extracted = param_extractor::extract(
        &extraction_request,
        deps.param_extraction_llm.as_ref(),
        reporter,
        deps.allowed_values.as_ref(),
        &request.thread_id,
    )
    .await;

    let output = match extracted {
        Ok(output) => output,
        Err(clarification) => return clarify(clarification, context),
    };

    finish_template_turn(output, &template, context, deps, reporter).await
}

async fn finish_template_turn(
    output: param_extractor::ExtractionOutput,
    template: &crate::model::QueryTemplate,
    context: ConversationContext,
    deps: &Dependencies,
    reporter: &dyn ProgressReporter,
) -> PipelineResult {
    let partial = param_validator::PartialFlags::new(&output.partial_parameters);
    let draft = param_validator::validate(output.draft, &template.parameters, &partial);

    let tier = draft
        .min_effective_confidence()
        .map_or(ConfidenceTier::Clarify, |min| classify(min, deps.thresholds));

    if !draft.params_validated || tier == ConfidenceTier::Clarify {
        let clarification = coordinator_clarification(&draft, template);
        return clarify(clarification, context);
    }

    let mut draft = query_validator::validate(draft, &deps.allowed_tables);
    if !draft.query_validated {
        // A vetted template failing the safety check at runtime is a C6
        // violation, not a parameter problem — build the error from the
        // actual violations, same as the dynamic path does (§7).
        let response = error_response(NlsqlError::QueryValidation(to_query_validation_error(&draft)), draft.tables_referenced.clone());
        return terminal(response, context);
    }

    draft.needs_confirmation = tier == ConfidenceTier::Confirm;
    execute_and_respond(draft, context, deps, reporter).await
}

async fn run_dynamic_path(
    request: &ProcessQueryRequest,
    context: ConversationContext,
    deps: &Dependencies,
    reporter: &dyn ProgressReporter,
    prior_violation: Option<String>,
) -> PipelineResult {
    let ranked_tables = deps.table_ranker.rank_tables(&request.user_text).await;
    let builder_request = query_builder::QueryBuilderRequest {
        user_text: &request.user_text,
        ranked_tables: &ranked_tables,
        prior_violation_context: prior_violation.as_deref(),
        max_display_columns: deps.max_display_columns,
    };
    let draft = query_builder::build(&builder_request, deps.query_builder_llm.as_ref(), reporter, &request.thread_id).await;
    let validated = query_validator::validate(draft, &deps.allowed_tables);

    if !validated.query_validated {
        // Only a disallowed-table violation gets one corrective retry
        // (§4.1 "Transitions on failure"); injection/shape/modification
        // violations fail the turn outright.
        let disallowed_detail = validated.violations.iter().find(|v| v.kind == "DisallowedTable").map(|v| v.detail.clone());
        if let Some(detail) = disallowed_detail {
            if prior_violation.is_none() {
                return Box::pin(run_dynamic_path(request, context, deps, reporter, Some(detail))).await;
            }
            let response = error_response(NlsqlError::Pipeline(PipelineError::QueryBuilderRetryExhausted), validated.tables_referenced.clone());
            return terminal(response, context);
        }
        let response = error_response(
            NlsqlError::QueryValidation(to_query_validation_error(&validated)),
            Vec::new(),
        );
        return terminal(response, context);
    }

    if !request.is_refinement {
        let confidence = validated.confidence.unwrap_or(0.0);
        if confidence < deps.thresholds.dynamic_confidence_threshold {
            let question = validated
                .reasoning
                .clone()
                .unwrap_or_else(|| "I'm not confident I understood that question. Could you rephrase it?".to_string());
            let clarification = ClarificationRequest {
                question,
                pending_state: PendingClarificationState {
                    stage: ResumeStage::DynamicConfirmation,
                    template_id: None,
                    extracted_so_far: std::collections::HashMap::new(),
                    confidences_so_far: std::collections::HashMap::new(),
                    raw_user_text: request.user_text.clone(),
                    created_at: chrono::Utc::now(),
                    dynamic_draft: Some(validated),
                },
                best_guess: None,
                alternatives: Vec::new(),
                confidence,
            };
            return clarify(clarification, context);
        }
    }

    let mut draft = validated;
    draft.needs_confirmation = draft.confidence.is_some_and(|c| c < deps.thresholds.confirm_high);
    execute_and_respond(draft, context, deps, reporter).await
}

async fn resume_parameter_extraction(
    pending: PendingClarificationState,
    answer: &str,
    context: ConversationContext,
    deps: &Dependencies,
    reporter: &dyn ProgressReporter,
) -> PipelineResult {
    let Some(template_id) = &pending.template_id else {
        let response = error_response(NlsqlError::Internal { message: "pending parameter-extraction state missing a template id".to_string(), source: None }, Vec::new());
        return terminal(response, context);
    };
    let Some(template) = deps.template_lookup.get(template_id).await else {
        let response = error_response(NlsqlError::Internal { message: format!("template '{template_id}' no longer exists"), source: None }, Vec::new());
        return terminal(response, context);
    };

    // Already-confirmed parameters are not re-extracted (§4.1): only the
    // slots still missing from `extracted_so_far` go through the
    // extractor again, seeded by the user's new answer.
    let remaining_defs: Vec<_> = template
        .parameters
        .iter()
        .filter(|d| !pending.extracted_so_far.contains_key(&d.name))
        .cloned()
        .collect();
    let mut remaining_template = template.clone();
    remaining_template.parameters = remaining_defs;

    let extraction_request = ParameterExtractionRequest {
        user_text: answer.to_string(),
        template: remaining_template,
        prior_context: Some(pending.raw_user_text.clone()),
        is_refinement: false,
    };

    let extracted = param_extractor::extract(
        &extraction_request,
        deps.param_extraction_llm.as_ref(),
        reporter,
        deps.allowed_values.as_ref(),
        "resumed",
    )
    .await;

    let mut output = match extracted {
        Ok(output) => output,
        Err(mut clarification) => {
            // Merge prior resolutions into the re-raised clarification so a
            // second unresolved slot doesn't forget the first answer.
            clarification.pending_state.extracted_so_far.extend(pending.extracted_so_far);
            clarification.pending_state.confidences_so_far.extend(pending.confidences_so_far);
            clarification.pending_state.raw_user_text = pending.raw_user_text;
            return clarify(clarification, context);
        }
    };

    output.draft.parameters_extracted.extend(pending.extracted_so_far);
    output.draft.parameter_confidences.extend(pending.confidences_so_far);
    output.draft.sql_text = param_extractor::substitute(&template.sql_text_with_tokens, &output.draft.parameters_extracted);

    finish_template_turn(output, &template, context, deps, reporter).await
}

async fn resume_accept_dynamic(
    pending: PendingClarificationState,
    context: ConversationContext,
    deps: &Dependencies,
    reporter: &dyn ProgressReporter,
) -> PipelineResult {
    let Some(mut draft) = pending.dynamic_draft else {
        let response = error_response(NlsqlError::Internal { message: "pending dynamic-confirmation state missing its draft".to_string(), source: None }, Vec::new());
        return terminal(response, context);
    };
    draft.needs_confirmation = false;
    execute_and_respond(draft, context, deps, reporter).await
}

async fn execute_and_respond(draft: SqlDraft, context: ConversationContext, deps: &Dependencies, reporter: &dyn ProgressReporter) -> PipelineResult {
    let executed = with_progress(reporter, "execute_query", true, deps.executor.execute(&draft.sql_text)).await;
    match executed {
        Ok(result_set) => {
            let (visible, hidden) = split_visible_columns(&result_set.columns, deps.max_display_columns);
            let query_confidence = draft.confidence.unwrap_or_else(|| draft.min_effective_confidence().unwrap_or(1.0));
            let query_summary = matches!(draft.query_source, QuerySource::Dynamic).then(|| draft.reasoning.clone()).flatten();

            // Schema-area tracking and follow-up suggestions are the data
            // assistant's concern (§4.9 `update_context`/`enrich_response`,
            // owned by `nlsql-assistant`); this layer only resolves the
            // pending-clarification flag for the thread.
            let mut next_context = context;
            next_context.pending_clarification = None;

            let response = Nl2SqlResponse {
                columns: visible,
                rows: result_set.rows,
                sql_executed: draft.sql_text,
                tables_used: draft.tables_referenced,
                query_source: draft.query_source,
                query_confidence,
                query_summary,
                hidden_columns: hidden,
                needs_confirmation: draft.needs_confirmation,
                suggestions: Vec::new(),
                error_suggestions: Vec::new(),
                error: None,
            };
            PipelineResult { outcome: PipelineOutcome::Response(response), context: next_context }
        }
        Err(e) => {
            tracing::error!(error = %e, sql = %draft.sql_text, "query execution failed");
            let response = error_response(e, draft.tables_referenced);
            terminal(response, context)
        }
    }
}

fn clarify(clarification: ClarificationRequest, mut context: ConversationContext) -> PipelineResult {
    context.pending_clarification = Some(clarification.pending_state.clone());
    PipelineResult { outcome: PipelineOutcome::Clarification(clarification), context }
}

fn terminal(response: Nl2SqlResponse, mut context: ConversationContext) -> PipelineResult {
    context.pending_clarification = None;
    PipelineResult { outcome: PipelineOutcome::Response(response), context }
}

/// Builds a user-safe error turn (§7): never leaks raw SQL, LLM text, or
/// violation detail; attaches schema-area suggestions when any attempted
/// tables resolve to a known area, to help the user redirect.
fn error_response(error: NlsqlError, attempted_tables: Vec<String>) -> Nl2SqlResponse {
    let area = schema_suggestions::primary_area(&attempted_tables);
    let error_suggestions = if area.is_some() {
        schema_suggestions::suggestions_for(area, 0)
    } else {
        schema_suggestions::generic_suggestions()
    };
    Nl2SqlResponse {
        columns: Vec::new(),
        rows: Vec::new(),
        sql_executed: String::new(),
        tables_used: Vec::new(),
        query_source: QuerySource::Template,
        query_confidence: 0.0,
        query_summary: None,
        hidden_columns: Vec::new(),
        needs_confirmation: false,
        suggestions: Vec::new(),
        error_suggestions,
        error: Some(error.user_safe_message()),
    }
}

/// Picks the first violation's kind to rebuild a coarse
/// [`nlsql_error::QueryValidationError`] for message purposes (the
/// validator already recorded the user-safe string in `violations`, but
/// `NlsqlError`'s `IntoResponse` expects a typed error to classify the
/// HTTP status).
fn to_query_validation_error(draft: &SqlDraft) -> nlsql_error::QueryValidationError {
    use nlsql_error::QueryValidationError as E;
    match draft.violations.first().map(|v| v.kind.as_str()) {
        Some("MultipleStatements") => E::MultipleStatements,
        Some("InjectionPattern") => E::InjectionPattern { pattern: String::new() },
        Some("DataModification") => E::DataModification { token: String::new() },
        Some("DisallowedTable") => E::DisallowedTable { tables: draft.tables_referenced.clone() },
        _ => E::DisallowedStatementType,
    }
}

/// Builds a coordinator-level hypothesis-first clarification for the
/// lowest-confidence parameter when the gate fires after extraction
/// already returned a draft rather than a clarification error (e.g. an
/// LLM-resolved value landed in the `llm_failed_validation` tier).
fn coordinator_clarification(draft: &SqlDraft, template: &crate::model::QueryTemplate) -> ClarificationRequest {
    let chosen_name = draft.lowest_confidence_parameter(&template.parameters);
    let confidence = draft.min_effective_confidence().unwrap_or(0.0);

    let Some(name) = chosen_name else {
        return ClarificationRequest {
            question: "Could you give me a bit more detail about what you're looking for?".to_string(),
            pending_state: fallback_pending_state(template, draft),
            best_guess: None,
            alternatives: Vec::new(),
            confidence,
        };
    };

    let def = template.parameters.iter().find(|d| d.name == name);
    let best_guess = draft.parameters_extracted.get(name).and_then(|v| v.as_str().map(ToString::to_string));
    let allowed: Vec<String> = def.and_then(|d| d.validation.as_ref()).and_then(|v| v.allowed_values.clone()).unwrap_or_default();
    let alternatives: Vec<String> = allowed.into_iter().filter(|a| Some(a) != best_guess.as_ref()).take(4).collect();

    let question = match &best_guess {
        Some(guess) if !alternatives.is_empty() => {
            format!("It looks like you want {guess}. Is that right, or did you mean {}?", alternatives.join(" or "))
        }
        Some(guess) => format!("It looks like you want {guess}. Is that right?"),
        None => format!("Could you clarify the value for {name}?"),
    };

    ClarificationRequest {
        question,
        pending_state: fallback_pending_state(template, draft),
        best_guess,
        alternatives,
        confidence,
    }
}

fn fallback_pending_state(template: &crate::model::QueryTemplate, draft: &SqlDraft) -> PendingClarificationState {
    PendingClarificationState {
        stage: ResumeStage::ParameterExtraction,
        template_id: Some(template.id.clone()),
        extracted_so_far: draft.parameters_extracted.clone(),
        confidences_so_far: draft.parameter_confidences.clone(),
        raw_user_text: String::new(),
        created_at: chrono::Utc::now(),
        dynamic_draft: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::AllowedValuesProvider;
    use crate::execution::QueryResultSet;
    use crate::llm::LlmCapability;
    use crate::model::{AllowedValuesSource, ParameterDefinition, ParameterType, ParameterValidation, QueryTemplate, TableMetadata};
    use crate::progress::NoOpReporter;
    use crate::template_search::InMemoryTemplateCatalog;
    use async_trait::async_trait;
    use nlsql_error::{CacheError, LlmError};
    use std::collections::HashMap;

    struct EmptyCache;
    #[async_trait]
    impl AllowedValuesProvider for EmptyCache {
        async fn get(&self, _table: &str, _column: &str) -> (Vec<String>, bool) {
            (vec![], false)
        }
    }
    #[async_trait]
    impl crate::cache::AllowedValuesLoader for EmptyCache {
        async fn load(&self, _table: &str, _column: &str, _limit: usize) -> Result<Vec<String>, CacheError> {
            Ok(vec![])
        }
    }

    struct PanicLlm;
    #[async_trait]
    impl LlmCapability for PanicLlm {
        async fn run(&self, _prompt: &str, _thread_id: &str) -> Result<String, LlmError> {
            panic!("LLM should not be invoked on the fast path")
        }
    }

    struct FailingLlm;
    #[async_trait]
    impl LlmCapability for FailingLlm {
        async fn run(&self, _prompt: &str, _thread_id: &str) -> Result<String, LlmError> {
            Err(LlmError::CallFailed { reason: "synthetic failure for tests".to_string() })
        }
    }

    struct NoTablesRanker;
    #[async_trait]
    impl TableRanker for NoTablesRanker {
        async fn rank_tables(&self, _user_text: &str) -> Vec<TableMetadata> {
            Vec::new()
        }
    }

    struct StubExecutor;
    #[async_trait]
    impl SqlExecutor for StubExecutor {
        async fn execute(&self, _sql: &str) -> Result<QueryResultSet, NlsqlError> {
            let mut row = HashMap::new();
            row.insert("id".to_string(), serde_json::json!(1));
            Ok(QueryResultSet { columns: vec!["id".to_string()], rows: vec![row] })
        }
    }

    fn count_param() -> ParameterDefinition {
        ParameterDefinition {
            name: "count".to_string(),
            column: None,
            table: None,
            description: "row count".to_string(),
            ask_if_missing: false,
            confidence_weight: 1.0,
            default_value: Some(serde_json::json!(10)),
            default_policy: None,
            allowed_values_source: AllowedValuesSource::Null,
            validation: Some(ParameterValidation { kind: ParameterType::Int, min: Some(1), max: Some(1000), regex: None, allowed_values: None }),
        }
    }

    fn template() -> QueryTemplate {
        QueryTemplate {
            id: "top_n_customers".to_string(),
            natural_language_exemplar: "top N customers by order count".to_string(),
            sql_text_with_tokens: "SELECT TOP %{count}% id FROM Sales.Customer".to_string(),
            tables_referenced: vec!["Sales.Customer".to_string()],
            parameters: vec![count_param()],
        }
    }

    fn deps(catalog: Arc<InMemoryTemplateCatalog>) -> Dependencies {
        Dependencies {
            template_search: catalog.clone(),
            template_lookup: catalog,
            allowed_values: Arc::new(EmptyCache),
            param_extraction_llm: Arc::new(PanicLlm),
            query_builder_llm: Arc::new(PanicLlm),
            table_ranker: Arc::new(NoTablesRanker),
            executor: Arc::new(StubExecutor),
            allowed_tables: Arc::new(AllowedTables::new(vec!["Sales.Customer".to_string()])),
            thresholds: ConfidenceThresholds::default(),
            template_match_threshold: DEFAULT_TEMPLATE_MATCH_THRESHOLD,
            max_display_columns: query_builder::DEFAULT_MAX_DISPLAY_COLUMNS,
        }
    }

    #[tokio::test]
    async fn exact_match_template_turn_auto_applies_and_executes() {
        let catalog = Arc::new(InMemoryTemplateCatalog::new(vec![template()]));
        let deps = deps(catalog);
        let request = ProcessQueryRequest { user_text: "top 10 customers by order count".to_string(), thread_id: "t1".to_string(), is_refinement: false };

        let result = process_query(&request, ConversationContext::default(), &deps, &NoOpReporter).await;
        match result.outcome {
            PipelineOutcome::Response(response) => {
                assert!(response.error.is_none());
                assert_eq!(response.tables_used, vec!["Sales.Customer".to_string()]);
                assert!(response.suggestions.is_empty(), "suggestion enrichment belongs to nlsql-assistant, not the coordinator");
            }
            PipelineOutcome::Clarification(c) => panic!("expected a direct response, got a clarification: {}", c.question),
        }
    }

    #[tokio::test]
    async fn unmatched_template_search_with_failing_llm_surfaces_terminal_error() {
        let catalog = Arc::new(InMemoryTemplateCatalog::new(vec![]));
        let mut deps = deps(catalog);
        deps.query_builder_llm = Arc::new(FailingLlm);
        let request = ProcessQueryRequest { user_text: "zzz qqq nonsense".to_string(), thread_id: "t1".to_string(), is_refinement: false };

        // No template matches and the query-builder LLM call fails: the
        // builder falls back to an empty-SQL draft (confidence 0.5), which
        // then fails query validation's shape check (not a table-allowlist
        // violation), so the coordinator surfaces a terminal error rather
        // than reaching the confidence gate at all (§7 LLMInvalidResponse).
        let result = process_query(&request, ConversationContext::default(), &deps, &NoOpReporter).await;
        match result.outcome {
            PipelineOutcome::Response(response) => assert!(response.error.is_some()),
            PipelineOutcome::Clarification(c) => panic!("expected a terminal error response, got a clarification: {}", c.question),
        }
    }

    struct LowConfidenceDynamicLlm;
    #[async_trait]
    impl LlmCapability for LowConfidenceDynamicLlm {
        async fn run(&self, _prompt: &str, _thread_id: &str) -> Result<String, LlmError> {
            Ok(r#"{"sql": "SELECT id FROM Sales.Customer", "reasoning": "Guessing you want customer ids", "confidence": 0.5, "tables_used": ["Sales.Customer"]}"#.to_string())
        }
    }

    #[tokio::test]
    async fn dynamic_path_low_confidence_gate_clarifies_with_reasoning() {
        let catalog = Arc::new(InMemoryTemplateCatalog::new(vec![]));
        let mut deps = deps(catalog);
        deps.query_builder_llm = Arc::new(LowConfidenceDynamicLlm);
        let request = ProcessQueryRequest { user_text: "show me the important customer data".to_string(), thread_id: "t1".to_string(), is_refinement: false };

        // §4.1 dynamic-path confidence gate: a validated, allowlisted draft
        // with confidence 0.5 < 0.70 clarifies with the builder's own
        // reasoning as the question (§8 scenario 4), rather than erroring.
        let result = process_query(&request, ConversationContext::default(), &deps, &NoOpReporter).await;
        match result.outcome {
            PipelineOutcome::Clarification(c) => {
                assert_eq!(c.question, "Guessing you want customer ids");
                assert!((c.confidence - 0.5).abs() < 1e-9);
            }
            PipelineOutcome::Response(r) => panic!("expected a clarification, got a response: error={:?}", r.error),
        }
    }

    #[tokio::test]
    async fn resuming_unknown_stage_combination_errors() {
        let catalog = Arc::new(InMemoryTemplateCatalog::new(vec![template()]));
        let deps = deps(catalog);
        let pending = PendingClarificationState {
            stage: ResumeStage::DynamicConfirmation,
            template_id: None,
            extracted_so_far: HashMap::new(),
            confidences_so_far: HashMap::new(),
            raw_user_text: String::new(),
            created_at: chrono::Utc::now(),
            dynamic_draft: None,
        };
        let result = resume(pending, ResumeInput::ClarificationAnswer("no".to_string()), "t1", ConversationContext::default(), &deps, &NoOpReporter).await;
        assert!(result.is_err());
    }
}
