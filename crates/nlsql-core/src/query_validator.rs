//! Query Validator (C6) — pure, deterministic SQL safety check: table
//! allowlist, statement-type allowlist, injection-pattern denylist, syntax
//! shape (§4.6).
//!
//! Policy decision (§9 open question, recorded in DESIGN.md): `WITH ...
//! SELECT` (CTEs) are permitted as long as the final top-level statement
//! is a `SELECT`; this deployment chooses to allow CTEs because the
//! dynamic query builder routinely uses them for window-function
//! aggregates.

use std::collections::HashSet;

use nlsql_error::QueryValidationError;
use regex::Regex;

use crate::model::{SqlDraft, Violation};

/// Table identifiers are matched schema-qualified (`Sales.Customer`) or
/// bare (`Customer`); both forms must appear in the allowlist.
pub struct AllowedTables(HashSet<String>);

impl AllowedTables {
    #[must_use]
    pub fn new(tables: impl IntoIterator<Item = String>) -> Self {
        Self(tables.into_iter().map(|t| t.to_lowercase()).collect())
    }

    fn contains(&self, table: &str) -> bool {
        self.0.contains(&table.to_lowercase())
    }
}

const DATA_MODIFICATION_TOKENS: &[&str] = &["DELETE", "INSERT", "UPDATE", "ALTER", "DROP", "TRUNCATE", "MERGE"];

const INJECTION_DENYLIST: &[&str] = &[
    "--", "/*", "*/", ";", "XP_", "SP_", "EXEC ", "EXECUTE ",
];

/// Validates the draft's `sql_text` and returns a new draft with
/// `query_validated` and `violations` set. Pure and deterministic: running
/// this twice on the same draft yields the same result (§8).
#[must_use]
pub fn validate(mut draft: SqlDraft, allowed_tables: &AllowedTables) -> SqlDraft {
    let sql = draft.sql_text.trim();
    let mut violations = Vec::new();

    // Statement count: at most one terminating statement. A single
    // trailing semicolon is tolerated; anything after it is not.
    let body = sql.strip_suffix(';').unwrap_or(sql);
    if body.contains(';') {
        violations.push(mk_violation(&QueryValidationError::MultipleStatements));
    }

    // Shape: top-level verb is SELECT, optionally preceded by one or more
    // CTEs (`WITH ... SELECT`).
    let upper = body.to_uppercase();
    let is_select_shaped = upper.trim_start().starts_with("SELECT") || upper.trim_start().starts_with("WITH");
    let ends_in_select_body = top_level_verb_is_select(&upper);
    if !is_select_shaped || !ends_in_select_body {
        violations.push(mk_violation(&QueryValidationError::DisallowedStatementType));
    }

    // Injection denylist.
    for pattern in INJECTION_DENYLIST {
        // The lone ';' check is handled above as MultipleStatements; skip
        // it here to avoid a duplicate, less specific violation.
        if *pattern == ";" {
            continue;
        }
        if upper.contains(&pattern.to_uppercase()) {
            violations.push(Violation {
                parameter: None,
                kind: "InjectionPattern".to_string(),
                detail: QueryValidationError::InjectionPattern { pattern: (*pattern).to_string() }.to_string(),
            });
        }
    }

    // Data-modification tokens at top level.
    for token in DATA_MODIFICATION_TOKENS {
        if contains_word(&upper, token) {
            violations.push(Violation {
                parameter: None,
                kind: "DataModification".to_string(),
                detail: QueryValidationError::DataModification { token: (*token).to_string() }.to_string(),
            });
        }
    }

    // Table allowlist: every FROM/JOIN referent must be allowed, except
    // references to this statement's own CTE aliases.
    let cte_names = extract_cte_names(body);
    let referenced: Vec<String> = extract_table_references(body)
        .into_iter()
        .filter(|t| !cte_names.iter().any(|c| c.eq_ignore_ascii_case(t)))
        .collect();
    let disallowed: Vec<String> = referenced.iter().filter(|t| !allowed_tables.contains(t)).cloned().collect();
    if !disallowed.is_empty() {
        violations.push(Violation {
            parameter: None,
            kind: "DisallowedTable".to_string(),
            detail: QueryValidationError::DisallowedTable { tables: disallowed.clone() }.to_string(),
        });
    }
    draft.tables_referenced = referenced;

    draft.query_validated = violations.is_empty();
    draft.violations = violations;
    draft
}

fn mk_violation(err: &QueryValidationError) -> Violation {
    Violation {
        parameter: None,
        kind: err.error_code_str(),
        detail: err.to_string(),
    }
}

// Small helper so `query_validator` doesn't need `nlsql_error`'s private
// error_code(); the string form is stable and used only for the
// `violations[].kind` field.
trait ErrorCodeStr {
    fn error_code_str(&self) -> String;
}
impl ErrorCodeStr for QueryValidationError {
    fn error_code_str(&self) -> String {
        match self {
            Self::DisallowedStatementType => "DisallowedStatementType",
            Self::MultipleStatements => "MultipleStatements",
            Self::InjectionPattern { .. } => "InjectionPattern",
            Self::DisallowedTable { .. } => "DisallowedTable",
            Self::DataModification { .. } => "DataModification",
        }
        .to_string()
    }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    let word = word.trim();
    let pattern = format!(r"(?:^|[^A-Za-z0-9_]){}(?:[^A-Za-z0-9_]|$)", regex::escape(word));
    Regex::new(&pattern).is_ok_and(|re| re.is_match(haystack))
}

/// True if, after stripping leading CTEs (`WITH name AS (...), name2 AS
/// (...)`), the remaining top-level statement starts with `SELECT`.
fn top_level_verb_is_select(upper: &str) -> bool {
    let trimmed = upper.trim_start();
    if trimmed.starts_with("SELECT") {
        return true;
    }
    if !trimmed.starts_with("WITH") {
        return false;
    }
    // Walk past the CTE list by tracking paren depth; the final SELECT
    // after the last top-level ')' is the statement's real verb.
    let bytes = trimmed.as_bytes();
    let mut depth: i32 = 0;
    let mut last_top_level_close = None;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    last_top_level_close = Some(i);
                }
            }
            _ => {}
        }
    }
    match last_top_level_close {
        Some(idx) => trimmed[idx + 1..].trim_start().starts_with("SELECT"),
        None => false,
    }
}

/// Extracts the alias names this statement's own `WITH ... AS (...)`
/// clauses define, so they aren't mistaken for real tables by the
/// allowlist check.
fn extract_cte_names(sql: &str) -> Vec<String> {
    let re = Regex::new(r"(?i)(?:WITH|,)\s*([A-Za-z_][A-Za-z0-9_]*)\s+AS\s*\(").expect("static pattern is valid");
    re.captures_iter(sql).map(|cap| cap[1].to_string()).collect()
}

/// Extracts table identifiers following `FROM` or `JOIN`, for callers
/// outside this module that need a best-effort table list before
/// validation runs (e.g. the query builder's fallback when the LLM
/// omitted `tables_used`).
#[must_use]
pub fn tables_referenced_in(sql: &str) -> Vec<String> {
    extract_table_references(sql)
}

/// Extracts table identifiers following `FROM` or `JOIN`, schema-qualified
/// or bare.
fn extract_table_references(sql: &str) -> Vec<String> {
    let re = Regex::new(r"(?i)\b(?:FROM|JOIN)\s+([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?)")
        .expect("static pattern is valid");
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for cap in re.captures_iter(sql) {
        let table = cap[1].to_string();
        if seen.insert(table.clone()) {
            out.push(table);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuerySource;
    use std::collections::HashMap;

    fn draft(sql: &str) -> SqlDraft {
        SqlDraft {
            sql_text: sql.to_string(),
            parameters_extracted: HashMap::new(),
            parameter_confidences: HashMap::new(),
            tables_referenced: vec![],
            query_source: QuerySource::Dynamic,
            confidence: Some(0.9),
            reasoning: None,
            params_validated: true,
            query_validated: false,
            needs_confirmation: false,
            violations: vec![],
            template_id: None,
        }
    }

    fn allowed() -> AllowedTables {
        AllowedTables::new(vec!["sales.customer".to_string(), "sales.orders".to_string()])
    }

    #[test]
    fn clean_select_passes() {
        let d = validate(draft("SELECT id FROM Sales.Customer"), &allowed());
        assert!(d.query_validated);
        assert!(d.violations.is_empty());
        assert_eq!(d.tables_referenced, vec!["Sales.Customer".to_string()]);
    }

    #[test]
    fn disallowed_table_is_caught() {
        let d = validate(draft("SELECT * FROM HR.Salaries"), &allowed());
        assert!(!d.query_validated);
        assert!(d.violations.iter().any(|v| v.kind == "DisallowedTable"));
    }

    #[test]
    fn stacked_query_is_multiple_statements() {
        let d = validate(draft("SELECT 1 FROM Sales.Customer; DROP TABLE Sales.Customer"), &allowed());
        assert!(!d.query_validated);
        assert!(d.violations.iter().any(|v| v.kind == "MultipleStatements"));
    }

    #[test]
    fn comment_injection_is_caught() {
        let d = validate(draft("SELECT 1 FROM Sales.Customer -- DROP TABLE x"), &allowed());
        assert!(!d.query_validated);
        assert!(d.violations.iter().any(|v| v.kind == "InjectionPattern"));
    }

    #[test]
    fn delete_token_is_caught() {
        let d = validate(draft("DELETE FROM Sales.Customer"), &allowed());
        assert!(!d.query_validated);
        assert!(d.violations.iter().any(|v| v.kind == "DataModification"));
    }

    #[test]
    fn cte_select_is_allowed() {
        let d = validate(
            draft("WITH recent AS (SELECT id FROM Sales.Orders) SELECT id FROM recent"),
            &allowed(),
        );
        assert!(d.query_validated, "violations: {:?}", d.violations);
    }

    #[test]
    fn is_idempotent() {
        let once = validate(draft("SELECT 1 FROM HR.Salaries"), &allowed());
        let twice = validate(draft("SELECT 1 FROM HR.Salaries"), &allowed());
        assert_eq!(once.query_validated, twice.query_validated);
        assert_eq!(once.violations.len(), twice.violations.len());
    }
}
