//! Data model shared by every pipeline stage.
//!
//! Entities here are treated as immutable at component boundaries: a stage
//! returns a new value rather than mutating the one it was given (§9,
//! "Shared clients and cache lifetimes").

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One vetted parameterized query, indexed out-of-band and never mutated
/// at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryTemplate {
    pub id: String,
    pub natural_language_exemplar: String,
    /// SQL text containing tokens of shape `%{name}%`.
    pub sql_text_with_tokens: String,
    pub tables_referenced: Vec<String>,
    pub parameters: Vec<ParameterDefinition>,
}

/// Declares one slot in a [`QueryTemplate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Unique within the owning template.
    pub name: String,
    pub column: Option<String>,
    /// Fully-qualified, e.g. `Sales.Customer`.
    pub table: Option<String>,
    pub description: String,
    #[serde(default)]
    pub ask_if_missing: bool,
    #[serde(default = "default_confidence_weight")]
    pub confidence_weight: f64,
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
    #[serde(default)]
    pub default_policy: Option<DefaultPolicy>,
    #[serde(default)]
    pub allowed_values_source: AllowedValuesSource,
    #[serde(default)]
    pub validation: Option<ParameterValidation>,
}

const fn default_confidence_weight() -> f64 {
    1.0
}

impl ParameterDefinition {
    /// `confidence_weight` below 1.0 forces this parameter into a lower
    /// confidence tier even on an exact match (§3 invariant on
    /// `ParameterDefinition`).
    #[must_use]
    pub fn effective_weight(&self) -> f64 {
        self.confidence_weight.max(0.3)
    }
}

/// A computed default a parameter falls back to when unresolved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPolicy {
    Today,
}

/// Where a parameter's `allowed_values` are sourced from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AllowedValuesSource {
    #[default]
    Null,
    Database,
}

/// Declared validation rule for one parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterValidation {
    #[serde(rename = "type")]
    pub kind: ParameterType,
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
    #[serde(default)]
    pub regex: Option<String>,
    /// Hydrated at extraction time when `allowed_values_source = database`;
    /// a permanent structural enum otherwise (e.g. `["ASC", "DESC"]`).
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Int,
    String,
    Date,
}

/// Schema for one table, indexed out-of-band; used only on the dynamic
/// synthesis path (C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub description: String,
    pub columns: Vec<ColumnMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub references: Option<String>,
    pub description: String,
}

/// The resolution method used to fill one parameter slot, driving the base
/// confidence table in §4.3.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    ExactMatch,
    FuzzyMatch,
    LlmValidated,
    DefaultValue,
    DefaultPolicy,
    LlmUnvalidated,
    LlmFailedValidation,
}

impl ResolutionMethod {
    /// Base confidence score per the table in §4.3.
    #[must_use]
    pub const fn base_confidence(self) -> f64 {
        match self {
            Self::ExactMatch => 1.00,
            Self::FuzzyMatch => 0.85,
            Self::LlmValidated => 0.75,
            Self::DefaultValue | Self::DefaultPolicy => 0.70,
            Self::LlmUnvalidated => 0.65,
            Self::LlmFailedValidation => 0.30,
        }
    }
}

/// Where the final SQL came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuerySource {
    Template,
    Dynamic,
}

/// The carrier passed between pipeline stages, mutated only by replacing
/// fields during successive stages and finalized at execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlDraft {
    pub sql_text: String,
    pub parameters_extracted: HashMap<String, serde_json::Value>,
    pub parameter_confidences: HashMap<String, f64>,
    pub tables_referenced: Vec<String>,
    pub query_source: QuerySource,
    /// QueryBuilder-assessed scalar confidence; only meaningful on the
    /// dynamic path.
    pub confidence: Option<f64>,
    /// Natural-language reasoning from the query-builder LLM, carried only
    /// for the dynamic-path confirmation gate (§4.1, §4.5).
    pub reasoning: Option<String>,
    pub params_validated: bool,
    pub query_validated: bool,
    pub needs_confirmation: bool,
    pub violations: Vec<Violation>,
    /// Template this draft was built from, if any (template path only).
    pub template_id: Option<String>,
}

impl SqlDraft {
    /// A fresh draft from the template path, pre-validation.
    #[must_use]
    pub fn from_template(template_id: impl Into<String>, sql_text: String, tables_referenced: Vec<String>) -> Self {
        Self {
            sql_text,
            parameters_extracted: HashMap::new(),
            parameter_confidences: HashMap::new(),
            tables_referenced,
            query_source: QuerySource::Template,
            confidence: None,
            reasoning: None,
            params_validated: false,
            query_validated: false,
            needs_confirmation: false,
            violations: Vec::new(),
            template_id: Some(template_id.into()),
        }
    }

    /// A fresh draft from the dynamic path, pre-validation.
    #[must_use]
    pub fn from_dynamic(sql_text: String, tables_referenced: Vec<String>, confidence: f64, reasoning: String) -> Self {
        Self {
            sql_text,
            parameters_extracted: HashMap::new(),
            parameter_confidences: HashMap::new(),
            tables_referenced,
            query_source: QuerySource::Dynamic,
            confidence: Some(confidence),
            reasoning: Some(reasoning),
            params_validated: true, // no declared parameters on the dynamic path
            query_validated: false,
            needs_confirmation: false,
            violations: Vec::new(),
            template_id: None,
        }
    }

    /// Smallest effective confidence across all extracted parameters.
    /// Per invariant 6, every parameter in the final draft has a defined
    /// confidence.
    #[must_use]
    pub fn min_effective_confidence(&self) -> Option<f64> {
        self.parameter_confidences
            .values()
            .copied()
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v))))
    }

    /// Returns the parameter name holding the smallest effective
    /// confidence, tie-broken per §4.1: `ask_if_missing` first, then
    /// declaration order (earliest in `ordered_defs` wins).
    #[must_use]
    pub fn lowest_confidence_parameter<'a>(&self, ordered_defs: &'a [ParameterDefinition]) -> Option<&'a str> {
        let min = self.min_effective_confidence()?;
        let tied: Vec<&ParameterDefinition> = ordered_defs
            .iter()
            .filter(|d| {
                self.parameter_confidences
                    .get(&d.name)
                    .is_some_and(|c| (*c - min).abs() < f64::EPSILON)
            })
            .collect();
        tied.iter()
            .find(|d| d.ask_if_missing)
            .or_else(|| tied.first())
            .map(|d| d.name.as_str())
    }
}

/// One validation or safety violation accumulated during C4/C6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub parameter: Option<String>,
    pub kind: String,
    pub detail: String,
}

/// Inputs to the parameter extractor (C3).
#[derive(Debug, Clone)]
pub struct ParameterExtractionRequest {
    pub user_text: String,
    pub template: QueryTemplate,
    /// Conversation context carried across a refinement turn.
    pub prior_context: Option<String>,
    pub is_refinement: bool,
}

/// Terminal-for-a-turn request for more information from the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClarificationRequest {
    pub question: String,
    pub pending_state: PendingClarificationState,
    pub best_guess: Option<String>,
    #[serde(default)]
    pub alternatives: Vec<String>,
    pub confidence: f64,
}

/// Serialized context needed to resume the same pipeline on the next turn
/// (§4.1, §6.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingClarificationState {
    pub stage: ResumeStage,
    pub template_id: Option<String>,
    pub extracted_so_far: HashMap<String, serde_json::Value>,
    pub confidences_so_far: HashMap<String, f64>,
    pub raw_user_text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Present only when resuming a dynamic-path confirmation.
    pub dynamic_draft: Option<SqlDraft>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResumeStage {
    ParameterExtraction,
    DynamicConfirmation,
}

/// Terminal-for-a-turn successful response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nl2SqlResponse {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, serde_json::Value>>,
    pub sql_executed: String,
    pub tables_used: Vec<String>,
    pub query_source: QuerySource,
    pub query_confidence: f64,
    pub query_summary: Option<String>,
    pub hidden_columns: Vec<String>,
    pub needs_confirmation: bool,
    pub suggestions: Vec<SchemaSuggestion>,
    pub error_suggestions: Vec<SchemaSuggestion>,
    pub error: Option<String>,
}

/// A clickable follow-up pill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaSuggestion {
    pub title: String,
    pub prompt: String,
}

/// The coarse schema-area groupings used by the suggestion engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SchemaArea {
    Sales,
    Warehouse,
    Purchasing,
    Application,
}

/// Per-thread conversational state the core owns (§3, §4.9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    pub current_schema_area: Option<SchemaArea>,
    pub schema_exploration_depth: u32,
    pub pending_clarification: Option<PendingClarificationState>,
}

/// One entry in the allowed-values cache, cache-internal.
#[derive(Debug, Clone)]
pub struct AllowedValuesEntry {
    pub values: Vec<String>,
    pub loaded_at: std::time::Instant,
    pub is_partial: bool,
}
