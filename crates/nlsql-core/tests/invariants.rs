//! Property-based tests for the "Universal invariants" in §8. Each
//! `proptest!` block exercises one invariant against arbitrary inputs
//! rather than a handful of hand-picked examples.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nlsql_core::{
    validate_query, AllowedTables, AllowedValuesCache, AllowedValuesLoader, CacheConfig, ConfidenceThresholds,
};
use nlsql_error::CacheError;
use proptest::prelude::*;

fn resolution_method(i: u8) -> nlsql_core::ResolutionMethod {
    use nlsql_core::ResolutionMethod::*;
    match i % 7 {
        0 => ExactMatch,
        1 => FuzzyMatch,
        2 => LlmValidated,
        3 => DefaultValue,
        4 => DefaultPolicy,
        5 => LlmUnvalidated,
        _ => LlmFailedValidation,
    }
}

fn param_def(weight: f64) -> nlsql_core::ParameterDefinition {
    nlsql_core::ParameterDefinition {
        name: "p".to_string(),
        column: None,
        table: None,
        description: String::new(),
        ask_if_missing: false,
        confidence_weight: weight,
        default_value: None,
        default_policy: None,
        allowed_values_source: nlsql_core::AllowedValuesSource::Null,
        validation: None,
    }
}

proptest! {
    /// §3 invariant 6 / §4.3: `effective_confidence = base(method) * max(weight, 0.3)`,
    /// for every resolution method and any weight a template author could set.
    #[test]
    fn effective_confidence_matches_formula(method_idx in 0u8..7, weight in -1.0f64..2.0) {
        let method = resolution_method(method_idx);
        let def = param_def(weight);
        let expected = method.base_confidence() * weight.max(0.3);
        let actual = nlsql_core::effective_confidence(method, &def);
        prop_assert!((actual - expected).abs() < 1e-9);
    }

    /// The weight floor means effective confidence never falls below
    /// `base * 0.3`, no matter how low `confidence_weight` is configured.
    #[test]
    fn effective_confidence_never_below_weight_floor(method_idx in 0u8..7, weight in -10.0f64..0.3) {
        let method = resolution_method(method_idx);
        let def = param_def(weight);
        let actual = nlsql_core::effective_confidence(method, &def);
        prop_assert!(actual >= method.base_confidence() * 0.3 - 1e-9);
    }

    /// §4.1 boundary behavior: `classify` is monotonic in its input — a
    /// strictly higher minimum effective confidence never drops to a lower
    /// tier.
    #[test]
    fn classify_is_monotonic(low in 0.0f64..1.0, delta in 0.0f64..1.0) {
        let high = (low + delta).min(1.0);
        let thresholds = ConfidenceThresholds::default();
        let tier_low = nlsql_core::classify(low, thresholds);
        let tier_high = nlsql_core::classify(high, thresholds);
        let rank = |t: nlsql_core::ConfidenceTier| match t {
            nlsql_core::ConfidenceTier::Clarify => 0,
            nlsql_core::ConfidenceTier::Confirm => 1,
            nlsql_core::ConfidenceTier::AutoApply => 2,
        };
        prop_assert!(rank(tier_high) >= rank(tier_low));
    }
}

struct FixedRowLoader {
    rows: Vec<String>,
    calls: AtomicUsize,
}

#[async_trait]
impl AllowedValuesLoader for FixedRowLoader {
    async fn load(&self, _table: &str, _column: &str, _limit: usize) -> Result<Vec<String>, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.clone())
    }
}

proptest! {
    /// §4.7 / §8: `is_partial == true` if and only if the cache clamped the
    /// loaded row count down to `max_values` — so whenever `is_partial` is
    /// set, the returned length is exactly `max_values`, across arbitrary
    /// row counts and cache sizes.
    #[test]
    fn cache_is_partial_implies_clamped_length(row_count in 0usize..50, max_values in 1usize..20) {
        let rows: Vec<String> = (0..row_count).map(|i| i.to_string()).collect();
        let loader = Arc::new(FixedRowLoader { rows, calls: AtomicUsize::new(0) });
        let cache = AllowedValuesCache::new(loader, CacheConfig { ttl: Duration::from_secs(600), max_values });

        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().expect("runtime builds");
        let (values, is_partial) = rt.block_on(cache.get("t", "c"));

        if is_partial {
            prop_assert_eq!(values.len(), max_values);
            prop_assert!(row_count > max_values);
        } else {
            prop_assert_eq!(values.len(), row_count.min(max_values));
        }
    }
}

fn allowed_tables() -> AllowedTables {
    AllowedTables::new(vec!["sales.customer".to_string(), "sales.orders".to_string()])
}

fn draft_for(sql: &str) -> nlsql_core::SqlDraft {
    nlsql_core::SqlDraft {
        sql_text: sql.to_string(),
        parameters_extracted: std::collections::HashMap::new(),
        parameter_confidences: std::collections::HashMap::new(),
        tables_referenced: vec![],
        query_source: nlsql_core::QuerySource::Dynamic,
        confidence: Some(0.9),
        reasoning: None,
        params_validated: true,
        query_validated: false,
        needs_confirmation: false,
        violations: vec![],
        template_id: None,
    }
}

proptest! {
    /// §4.6 / §8: a clean single-`SELECT` over only allowed tables always
    /// validates, regardless of which allowed table or column name is used.
    #[test]
    fn clean_select_over_allowed_table_always_validates(
        table in prop::sample::select(vec!["Sales.Customer", "Sales.Orders"]),
        column in "[a-zA-Z_][a-zA-Z0-9_]{0,12}",
    ) {
        let sql = format!("SELECT {column} FROM {table}");
        let d = validate_query(draft_for(&sql), &allowed_tables());
        prop_assert!(d.query_validated, "violations: {:?}", d.violations);
    }

    /// §4.6 / §8: stacking a second statement after a clean `SELECT` is
    /// always rejected, whatever that second statement is.
    #[test]
    fn stacked_second_statement_never_validates(tail in "[A-Za-z ]{1,20}") {
        let sql = format!("SELECT id FROM Sales.Customer; {tail}");
        let d = validate_query(draft_for(&sql), &allowed_tables());
        prop_assert!(!d.query_validated);
        prop_assert!(d.violations.iter().any(|v| v.kind == "MultipleStatements"));
    }

    /// §8: `query_validator::validate` is pure and idempotent — running it
    /// twice on the same starting SQL text yields the same verdict.
    #[test]
    fn query_validator_is_idempotent(sql in "(SELECT|DELETE|WITH) [A-Za-z0-9_., ()*]{0,40}") {
        let once = validate_query(draft_for(&sql), &allowed_tables());
        let twice = validate_query(draft_for(&sql), &allowed_tables());
        prop_assert_eq!(once.query_validated, twice.query_validated);
        prop_assert_eq!(once.violations.len(), twice.violations.len());
    }
}
