//! Parameter Extractor (C3) — deterministic fast-path (exact + fuzzy +
//! default) followed by LLM-assisted extraction for unresolved slots
//! (§4.3).

use std::collections::HashMap;

use nlsql_error::LlmError;
use serde_json::Value;

use crate::cache::AllowedValuesProvider;
use crate::confidence::effective_confidence;
use crate::llm::{parse_extraction_response, LlmCapability, ParameterExtractionOutcome};
use crate::model::{
    ClarificationRequest, ParameterDefinition, ParameterExtractionRequest, ParameterType, PendingClarificationState,
    ResolutionMethod, ResumeStage, SqlDraft,
};
use crate::progress::{with_progress, ProgressReporter};
use crate::util::normalize_tokens;

/// Parameters resolved by `allowed_values_source = "database"` whose
/// cache entry came back `is_partial`; the validator must skip the strict
/// membership check for these (invariant 5).
#[derive(Debug, Default)]
pub struct ExtractionOutput {
    pub draft: SqlDraft,
    pub partial_parameters: Vec<String>,
}

struct Resolution {
    value: Value,
    method: ResolutionMethod,
}

/// Runs the full extraction algorithm for one template against one
/// utterance.
///
/// # Errors
/// Returns a [`ClarificationRequest`] — not a Rust error — when the user
/// needs to answer a question before the pipeline can continue. This is a
/// normal, expected outcome, not a failure (§4.3 "Clarification output").
pub async fn extract(
    request: &ParameterExtractionRequest,
    llm: &dyn LlmCapability,
    reporter: &dyn ProgressReporter,
    cache: &dyn AllowedValuesProvider,
    thread_id: &str,
) -> Result<ExtractionOutput, ClarificationRequest> {
    let template = &request.template;
    let user_tokens = normalize_tokens(&request.user_text);

    let mut resolutions: HashMap<String, Resolution> = HashMap::new();
    let mut hydrated_allowed: HashMap<String, Vec<String>> = HashMap::new();
    let mut partial_parameters: Vec<String> = Vec::new();
    let mut unresolved: Vec<&ParameterDefinition> = Vec::new();

    for def in &template.parameters {
        // Step 1: hydrate allowed values for database-sourced parameters.
        let allowed_values: Option<Vec<String>> = if def.allowed_values_source == crate::model::AllowedValuesSource::Database {
            if let (Some(table), Some(column)) = (&def.table, &def.column) {
                let (values, is_partial) = with_progress(reporter, "hydrate_allowed_values", false, cache.get(table, column)).await;
                if is_partial {
                    partial_parameters.push(def.name.clone());
                }
                hydrated_allowed.insert(def.name.clone(), values.clone());
                Some(values)
            } else {
                None // misconfigured template; runtime hydration has nothing to hydrate from
            }
        } else {
            def.validation.as_ref().and_then(|v| v.allowed_values.clone())
        };

        // Steps 2-3: exact then fuzzy fast-path match.
        if let Some(allowed) = &allowed_values {
            if let Some(value) = exact_match(&user_tokens, allowed) {
                resolutions.insert(def.name.clone(), Resolution { value: Value::String(value), method: ResolutionMethod::ExactMatch });
                continue;
            }
            if let Some(value) = fuzzy_match(&user_tokens, allowed) {
                resolutions.insert(def.name.clone(), Resolution { value: Value::String(value), method: ResolutionMethod::FuzzyMatch });
                continue;
            }
        }

        // Step 4: defaults.
        if let Some(default) = &def.default_value {
            resolutions.insert(def.name.clone(), Resolution { value: default.clone(), method: ResolutionMethod::DefaultValue });
            continue;
        }
        if let Some(policy) = def.default_policy {
            let value = apply_default_policy(policy);
            resolutions.insert(def.name.clone(), Resolution { value, method: ResolutionMethod::DefaultPolicy });
            continue;
        }

        unresolved.push(def);
    }

    // A deterministic ask_if_missing parameter with no resolution and a
    // known allowed-values set clarifies directly — no LLM round trip for
    // a fully enumerable slot (§4.3 "Clarification output").
    for def in &unresolved {
        if def.ask_if_missing {
            if let Some(allowed) = allowed_values_for(def, &hydrated_allowed) {
                if !allowed.is_empty() {
                    return Err(hypothesis_first_clarification(
                        def,
                        &user_tokens,
                        allowed,
                        request,
                        &resolutions,
                    ));
                }
            }
        }
    }

    if !unresolved.is_empty() {
        let llm_result = run_llm_extraction(&unresolved, request, llm, reporter, thread_id, &hydrated_allowed).await;
        match llm_result {
            LlmExtractionResult::Resolved(values) => {
                for def in &unresolved {
                    let Some(raw) = values.get(&def.name) else { continue };
                    let passes = def.validation.as_ref().map_or(true, |v| passes_validation(raw, v));
                    let method = if def.validation.is_none() {
                        ResolutionMethod::LlmUnvalidated
                    } else if passes {
                        ResolutionMethod::LlmValidated
                    } else {
                        ResolutionMethod::LlmFailedValidation
                    };
                    resolutions.insert(def.name.clone(), Resolution { value: raw.clone(), method });
                }
            }
            LlmExtractionResult::NeedsClarification(missing) => {
                if let Some(clarification) = clarification_from_missing(&unresolved, &missing, request, &resolutions) {
                    return Err(clarification);
                }
            }
            LlmExtractionResult::Failed => {
                // Recoverable: fall through to llm_failed confidence so the
                // coordinator's gate drives clarification (§4.3 Failure
                // semantics, §7 LLMTimeout/LLMInvalidResponse).
                for def in &unresolved {
                    resolutions.insert(
                        def.name.clone(),
                        Resolution { value: Value::Null, method: ResolutionMethod::LlmFailedValidation },
                    );
                }
            }
        }
    }

    let mut draft = SqlDraft::from_template(template.id.clone(), template.sql_text_with_tokens.clone(), template.tables_referenced.clone());
    for (name, resolution) in &resolutions {
        draft.parameters_extracted.insert(name.clone(), resolution.value.clone());
    }
    for def in &template.parameters {
        if let Some(resolution) = resolutions.get(&def.name) {
            draft.parameter_confidences.insert(def.name.clone(), effective_confidence(resolution.method, def));
        }
    }
    draft.sql_text = substitute(&template.sql_text_with_tokens, &draft.parameters_extracted);

    Ok(ExtractionOutput { draft, partial_parameters })
}

fn allowed_values_for<'a>(def: &'a ParameterDefinition, hydrated: &'a HashMap<String, Vec<String>>) -> Option<&'a [String]> {
    hydrated
        .get(&def.name)
        .map(Vec::as_slice)
        .or_else(|| def.validation.as_ref().and_then(|v| v.allowed_values.as_deref()))
}

/// Case-insensitive literal match of any user-text token against an
/// allowed value (§4.3 step 2).
fn exact_match(user_tokens: &[String], allowed: &[String]) -> Option<String> {
    allowed.iter().find(|candidate| {
        let candidate_norm = candidate.to_lowercase();
        user_tokens.iter().any(|t| *t == candidate_norm)
    }).cloned()
}

/// Normalized prefix/equality match, accepted only if unambiguous — no
/// other allowed value shares the match (§4.3 step 3).
fn fuzzy_match(user_tokens: &[String], allowed: &[String]) -> Option<String> {
    let normalized_allowed: Vec<String> = allowed.iter().map(|a| crate::util::normalize_word(a)).collect();

    let mut winner: Option<usize> = None;
    for token in user_tokens {
        let matches: Vec<usize> = normalized_allowed
            .iter()
            .enumerate()
            .filter(|(_, candidate)| *candidate == token || candidate.starts_with(token.as_str()))
            .map(|(i, _)| i)
            .collect();
        if matches.len() == 1 {
            let idx = matches[0];
            if winner.is_some_and(|w| w != idx) {
                return None; // different tokens matched different candidates: ambiguous
            }
            winner = Some(idx);
        }
    }
    winner.map(|i| allowed[i].clone())
}

fn apply_default_policy(policy: crate::model::DefaultPolicy) -> Value {
    match policy {
        crate::model::DefaultPolicy::Today => Value::String(chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()),
    }
}

enum LlmExtractionResult {
    Resolved(HashMap<String, Value>),
    NeedsClarification(Vec<crate::llm::MissingParameter>),
    Failed,
}

async fn run_llm_extraction(
    unresolved: &[&ParameterDefinition],
    request: &ParameterExtractionRequest,
    llm: &dyn LlmCapability,
    reporter: &dyn ProgressReporter,
    thread_id: &str,
    hydrated: &HashMap<String, Vec<String>>,
) -> LlmExtractionResult {
    let prompt = build_extraction_prompt(unresolved, request, hydrated);
    let raw = with_progress(reporter, "parameter_extraction_llm", false, llm.run(&prompt, thread_id)).await;
    match raw {
        Ok(text) => match parse_extraction_response(&text) {
            Ok(ParameterExtractionOutcome::Resolved { parameters }) => LlmExtractionResult::Resolved(parameters),
            Ok(ParameterExtractionOutcome::NeedsClarification { missing, .. }) => LlmExtractionResult::NeedsClarification(missing),
            Err(_) => LlmExtractionResult::Failed,
        },
        Err(e) => {
            tracing::warn!(error = %e, "parameter-extractor LLM call failed");
            LlmExtractionResult::Failed
        }
    }
}

fn build_extraction_prompt(
    unresolved: &[&ParameterDefinition],
    request: &ParameterExtractionRequest,
    hydrated: &HashMap<String, Vec<String>>,
) -> String {
    let mut prompt = format!(
        "Template: {}\nUser utterance: {}\n",
        request.template.natural_language_exemplar, request.user_text
    );
    if let Some(context) = &request.prior_context {
        prompt.push_str(&format!("Conversation context: {context}\n"));
    }
    prompt.push_str("\nResolve the following parameters:\n");
    for def in unresolved {
        let allowed = allowed_values_for(def, hydrated);
        prompt.push_str(&format!("- {}: {}", def.name, def.description));
        if let Some(values) = allowed {
            prompt.push_str(&format!(" (allowed values: {})", values.join(", ")));
        }
        prompt.push('\n');
    }
    prompt.push_str(
        "\nRespond as JSON: either {\"parameters\": {name: value, ...}} or \
         {\"needs_clarification\": true, \"missing\": [{\"name\", \"best_guess\", \"guess_confidence\", \"alternatives\"}]}.\n",
    );
    prompt
}

/// Runs a lightweight validator stub over one LLM-returned value, per
/// §4.3 step 5 ("run through validator stubs"). This mirrors
/// `param_validator::validate`'s rules but operates on a single value so
/// the extractor can pick a resolution method before the full validator
/// stage runs.
fn passes_validation(value: &Value, validation: &crate::model::ParameterValidation) -> bool {
    match validation.kind {
        ParameterType::Int => {
            let Some(n) = value.as_i64() else { return false };
            !(validation.min.is_some_and(|min| n < min) || validation.max.is_some_and(|max| n > max))
        }
        ParameterType::String => {
            let Some(s) = value.as_str() else { return false };
            if let Some(pattern) = &validation.regex {
                let anchored = if pattern.starts_with('^') { pattern.clone() } else { format!("^{pattern}$") };
                if regex::Regex::new(&anchored).is_ok_and(|re| !re.is_match(s)) {
                    return false;
                }
            }
            if let Some(allowed) = &validation.allowed_values {
                let lower = s.to_lowercase();
                if !allowed.iter().any(|a| a.to_lowercase() == lower) {
                    return false;
                }
            }
            true
        }
        ParameterType::Date => value.as_str().is_some_and(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
    }
}

/// Builds a hypothesis-first clarification for a deterministic
/// `ask_if_missing` parameter with a known allowed-values set (§4.3).
fn hypothesis_first_clarification(
    def: &ParameterDefinition,
    user_tokens: &[String],
    allowed: &[String],
    request: &ParameterExtractionRequest,
    resolved_so_far: &HashMap<String, Resolution>,
) -> ClarificationRequest {
    let best_guess = fuzzy_match(user_tokens, allowed).or_else(|| allowed.first().cloned());
    let alternatives: Vec<String> = allowed
        .iter()
        .filter(|v| Some(*v) != best_guess.as_ref())
        .take(4)
        .cloned()
        .collect();

    let question = match &best_guess {
        Some(guess) => format!(
            "It looks like you want {guess} for {}. Is that right, or did you mean {}?",
            def.description,
            alternatives.join(" or ")
        ),
        None => format!("Which {} did you mean: {}?", def.description, allowed.join(", ")),
    };

    ClarificationRequest {
        question,
        pending_state: pending_state(request, resolved_so_far),
        best_guess,
        alternatives,
        confidence: 0.0,
    }
}

fn clarification_from_missing(
    unresolved: &[&ParameterDefinition],
    missing: &[crate::llm::MissingParameter],
    request: &ParameterExtractionRequest,
    resolved_so_far: &HashMap<String, Resolution>,
) -> Option<ClarificationRequest> {
    // Single question per turn: ask_if_missing first, then declaration
    // order, matching the coordinator's tie-break rule (§4.1).
    let chosen = unresolved
        .iter()
        .filter(|d| d.ask_if_missing)
        .find_map(|d| missing.iter().find(|m| m.name == d.name))
        .or_else(|| unresolved.iter().find_map(|d| missing.iter().find(|m| m.name == d.name)))?;

    let alternatives: Vec<String> = chosen.alternatives.iter().take(4).cloned().collect();
    let question = match &chosen.best_guess {
        Some(guess) if !alternatives.is_empty() => {
            format!("It looks like you want {guess} for {}. Is that right, or did you mean {}?", chosen.name, alternatives.join(" or "))
        }
        Some(guess) => format!("It looks like you want {guess} for {}. Is that right?", chosen.name),
        None => format!("Could you clarify {}?", chosen.name),
    };

    Some(ClarificationRequest {
        question,
        pending_state: pending_state(request, resolved_so_far),
        best_guess: chosen.best_guess.clone(),
        alternatives,
        confidence: chosen.guess_confidence.unwrap_or(0.0),
    })
}

fn pending_state(request: &ParameterExtractionRequest, resolved_so_far: &HashMap<String, Resolution>) -> PendingClarificationState {
    PendingClarificationState {
        stage: ResumeStage::ParameterExtraction,
        template_id: Some(request.template.id.clone()),
        extracted_so_far: resolved_so_far.iter().map(|(k, v)| (k.clone(), v.value.clone())).collect(),
        confidences_so_far: resolved_so_far
            .iter()
            .filter_map(|(k, v)| {
                request
                    .template
                    .parameters
                    .iter()
                    .find(|d| &d.name == k)
                    .map(|d| (k.clone(), effective_confidence(v.method, d)))
            })
            .collect(),
        raw_user_text: request.user_text.clone(),
        created_at: chrono::Utc::now(),
        dynamic_draft: None,
    }
}

/// Substitutes `%{name}%` tokens in template SQL with properly escaped
/// literals (§4.3 "Parameter substitution into SQL"). Pure string
/// replacement — the executor performs its own parameterized-execution
/// pass on top of this.
#[must_use]
pub fn substitute(sql_with_tokens: &str, values: &HashMap<String, Value>) -> String {
    let mut sql = sql_with_tokens.to_string();
    for (name, value) in values {
        let token = format!("%{{{name}}}%");
        let literal = escape_literal(value);
        sql = sql.replace(&token, &literal);
    }
    sql
}

fn escape_literal(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Bool(b) => b.to_string(),
        Value::Null => "NULL".to_string(),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AllowedValuesSource, ParameterValidation, QueryTemplate};
    use crate::progress::NoOpReporter;
    use async_trait::async_trait;

    struct StaticCache;
    #[async_trait]
    impl AllowedValuesProvider for StaticCache {
        async fn get(&self, _table: &str, _column: &str) -> (Vec<String>, bool) {
            (vec![], false)
        }
    }

    struct PanicLlm;
    #[async_trait]
    impl LlmCapability for PanicLlm {
        async fn run(&self, _prompt: &str, _thread_id: &str) -> Result<String, LlmError> {
            panic!("LLM should not be called for this test")
        }
    }

    fn metric_param() -> ParameterDefinition {
        ParameterDefinition {
            name: "metric".to_string(),
            column: None,
            table: None,
            description: "ranking metric".to_string(),
            ask_if_missing: true,
            confidence_weight: 1.0,
            default_value: None,
            default_policy: None,
            allowed_values_source: AllowedValuesSource::Null,
            validation: Some(ParameterValidation {
                kind: ParameterType::String,
                min: None,
                max: None,
                regex: None,
                allowed_values: Some(vec!["order_count".to_string(), "revenue".to_string(), "profit".to_string()]),
            }),
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

    fn template(params: Vec<ParameterDefinition>) -> QueryTemplate {
        QueryTemplate {
            id: "top_n_customers".to_string(),
            natural_language_exemplar: "top N customers by metric".to_string(),
            sql_text_with_tokens: "SELECT TOP %{count}% * FROM Sales.Customer ORDER BY %{metric}% DESC".to_string(),
            tables_referenced: vec!["Sales.Customer".to_string()],
            parameters: params,
        }
    }

    #[tokio::test]
    async fn exact_match_yields_full_confidence() {
        let req = ParameterExtractionRequest {
            user_text: "top 10 customers by order count".to_string(),
            template: template(vec![count_param(), metric_param()]),
            prior_context: None,
            is_refinement: false,
        };
        let out = extract(&req, &PanicLlm, &NoOpReporter, &StaticCache, "thread-1").await.expect("should resolve");
        assert_eq!(out.draft.parameter_confidences["metric"], 1.0);
        assert_eq!(out.draft.parameters_extracted["metric"], serde_json::json!("order_count"));
        assert!(!out.draft.sql_text.contains("%{"));
    }

    #[tokio::test]
    async fn fuzzy_match_falls_back_from_exact() {
        let req = ParameterExtractionRequest {
            user_text: "top products by revenues".to_string(),
            template: template(vec![count_param(), metric_param()]),
            prior_context: None,
            is_refinement: false,
        };
        let out = extract(&req, &PanicLlm, &NoOpReporter, &StaticCache, "thread-1").await.expect("should resolve");
        assert_eq!(out.draft.parameters_extracted["metric"], serde_json::json!("revenue"));
        assert!((out.draft.parameter_confidences["metric"] - 0.85).abs() < 1e-9);
    }

    #[tokio::test]
    async fn ask_if_missing_with_allowed_values_clarifies_directly() {
        let req = ParameterExtractionRequest {
            user_text: "top 10 customers".to_string(),
            template: template(vec![count_param(), metric_param()]),
            prior_context: None,
            is_refinement: false,
        };
        let err = extract(&req, &PanicLlm, &NoOpReporter, &StaticCache, "thread-1").await.expect_err("should clarify");
        assert!(err.alternatives.len() <= 4);
        assert!(err.best_guess.is_some());
    }

    #[test]
    fn substitution_escapes_quotes_and_leaves_no_tokens() {
        let mut values = HashMap::new();
        values.insert("name".to_string(), Value::String("O'Brien".to_string()));
        values.insert("limit".to_string(), Value::Number(5.into()));
        let sql = substitute("SELECT * FROM t WHERE name = %{name}% LIMIT %{limit}%", &values);
        assert_eq!(sql, "SELECT * FROM t WHERE name = 'O''Brien' LIMIT 5");
        assert!(!sql.contains("%{"));
    }
}
