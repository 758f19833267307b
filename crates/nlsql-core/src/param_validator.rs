//! Parameter Validator (C4) — pure, deterministic, no I/O (§4.4).

use regex::Regex;

use crate::model::{ParameterDefinition, ParameterType, SqlDraft, Violation};

/// Set by the extractor (§4.3 step 1) when the allowed-values cache
/// reported `is_partial`; the validator must skip the strict membership
/// check for that parameter (invariant 5).
pub struct PartialFlags<'a> {
    partial_params: &'a [String],
}

impl<'a> PartialFlags<'a> {
    #[must_use]
    pub const fn new(partial_params: &'a [String]) -> Self {
        Self { partial_params }
    }

    fn is_partial(&self, name: &str) -> bool {
        self.partial_params.iter().any(|p| p == name)
    }
}

impl Default for PartialFlags<'static> {
    fn default() -> Self {
        Self { partial_params: &[] }
    }
}

/// Validates every extracted parameter against its declared rule and
/// returns a new draft with `params_validated` and `violations` set.
///
/// Pure and deterministic: running this twice on the same draft yields
/// the same result (§8 round-trip property).
#[must_use]
pub fn validate(mut draft: SqlDraft, parameter_defs: &[ParameterDefinition], partial: &PartialFlags<'_>) -> SqlDraft {
    let mut violations = Vec::new();

    for def in parameter_defs {
        let Some(value) = draft.parameters_extracted.get(&def.name) else {
            continue; // unresolved-but-optional parameters are not this stage's concern
        };
        let Some(validation) = &def.validation else {
            continue; // no declared rule
        };

        match validation.kind {
            ParameterType::Int => {
                let Some(n) = value.as_i64() else {
                    violations.push(Violation {
                        parameter: Some(def.name.clone()),
                        kind: "TypeMismatch".to_string(),
                        detail: "expected an integer".to_string(),
                    });
                    continue;
                };
                if validation.min.is_some_and(|min| n < min) || validation.max.is_some_and(|max| n > max) {
                    violations.push(Violation {
                        parameter: Some(def.name.clone()),
                        kind: "OutOfRange".to_string(),
                        detail: format!("{n} is outside the allowed range"),
                    });
                }
            }
            ParameterType::String => {
                let Some(s) = value.as_str() else {
                    violations.push(Violation {
                        parameter: Some(def.name.clone()),
                        kind: "TypeMismatch".to_string(),
                        detail: "expected a string".to_string(),
                    });
                    continue;
                };
                if let Some(pattern) = &validation.regex {
                    let anchored = if pattern.starts_with('^') { pattern.clone() } else { format!("^{pattern}$") };
                    match Regex::new(&anchored) {
                        Ok(re) if !re.is_match(s) => {
                            violations.push(Violation {
                                parameter: Some(def.name.clone()),
                                kind: "PatternMismatch".to_string(),
                                detail: "value did not match the required pattern".to_string(),
                            });
                        }
                        Err(_) => {
                            violations.push(Violation {
                                parameter: Some(def.name.clone()),
                                kind: "InvalidRule".to_string(),
                                detail: "parameter regex failed to compile".to_string(),
                            });
                        }
                        Ok(_) => {}
                    }
                }
                if !partial.is_partial(&def.name) {
                    if let Some(allowed) = &validation.allowed_values {
                        let lower = s.to_lowercase();
                        if !allowed.iter().any(|a| a.to_lowercase() == lower) {
                            violations.push(Violation {
                                parameter: Some(def.name.clone()),
                                kind: "NotAllowed".to_string(),
                                detail: "value is not one of the allowed values".to_string(),
                            });
                        }
                    }
                }
            }
            ParameterType::Date => {
                let Some(s) = value.as_str() else {
                    violations.push(Violation {
                        parameter: Some(def.name.clone()),
                        kind: "TypeMismatch".to_string(),
                        detail: "expected an ISO date string".to_string(),
                    });
                    continue;
                };
                if chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_err() {
                    violations.push(Violation {
                        parameter: Some(def.name.clone()),
                        kind: "InvalidDate".to_string(),
                        detail: "value is not a parseable ISO date".to_string(),
                    });
                }
            }
        }
    }

    draft.params_validated = violations.is_empty();
    draft.violations = violations;
    draft
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AllowedValuesSource, ParameterValidation, QuerySource};
    use std::collections::HashMap;

    fn int_param(name: &str, min: Option<i64>, max: Option<i64>) -> ParameterDefinition {
        ParameterDefinition {
            name: name.to_string(),
            column: None,
            table: None,
            description: String::new(),
            ask_if_missing: false,
            confidence_weight: 1.0,
            default_value: None,
            default_policy: None,
            allowed_values_source: AllowedValuesSource::Null,
            validation: Some(ParameterValidation {
                kind: ParameterType::Int,
                min,
                max,
                regex: None,
                allowed_values: None,
            }),
        }
    }

    fn draft_with(values: HashMap<String, serde_json::Value>) -> SqlDraft {
        SqlDraft {
            sql_text: "SELECT 1".to_string(),
            parameters_extracted: values,
            parameter_confidences: HashMap::new(),
            tables_referenced: vec![],
            query_source: QuerySource::Template,
            confidence: None,
            reasoning: None,
            params_validated: false,
            query_validated: false,
            needs_confirmation: false,
            violations: vec![],
            template_id: Some("t1".to_string()),
        }
    }

    #[test]
    fn int_out_of_range_fails() {
        let defs = vec![int_param("count", Some(1), Some(100))];
        let mut values = HashMap::new();
        values.insert("count".to_string(), serde_json::json!(500));
        let result = validate(draft_with(values), &defs, &PartialFlags::default());
        assert!(!result.params_validated);
        assert_eq!(result.violations[0].kind, "OutOfRange");
    }

    #[test]
    fn int_in_range_passes() {
        let defs = vec![int_param("count", Some(1), Some(100))];
        let mut values = HashMap::new();
        values.insert("count".to_string(), serde_json::json!(10));
        let result = validate(draft_with(values), &defs, &PartialFlags::default());
        assert!(result.params_validated);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn is_idempotent() {
        let defs = vec![int_param("count", Some(1), Some(100))];
        let mut values = HashMap::new();
        values.insert("count".to_string(), serde_json::json!(500));
        let once = validate(draft_with(values.clone()), &defs, &PartialFlags::default());
        let twice = validate(draft_with(values), &defs, &PartialFlags::default());
        assert_eq!(once.params_validated, twice.params_validated);
        assert_eq!(once.violations.len(), twice.violations.len());
    }

    #[test]
    fn partial_flag_skips_allowed_values_check() {
        let defs = vec![ParameterDefinition {
            name: "metric".to_string(),
            column: None,
            table: None,
            description: String::new(),
            ask_if_missing: false,
            confidence_weight: 1.0,
            default_value: None,
            default_policy: None,
            allowed_values_source: AllowedValuesSource::Database,
            validation: Some(ParameterValidation {
                kind: ParameterType::String,
                min: None,
                max: None,
                regex: None,
                allowed_values: Some(vec!["revenue".to_string()]),
            }),
        }];
        let mut values = HashMap::new();
        values.insert("metric".to_string(), serde_json::json!("not_in_list"));
        let partial_names = vec!["metric".to_string()];
        let result = validate(draft_with(values), &defs, &PartialFlags::new(&partial_names));
        assert!(result.params_validated);
    }
}
