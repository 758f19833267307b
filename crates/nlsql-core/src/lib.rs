//! Core NL2SQL pipeline: data model, confidence math, and the six pipeline
//! components (C1-C6) plus the two shared services owned at this layer
//! (S1 allowed-values cache, S2 progress reporter). S3 (the data
//! assistant) and concrete I/O (database, LLM transport, HTTP) live in
//! their own crates and depend on this one.

pub mod cache;
pub mod confidence;
pub mod coordinator;
pub mod execution;
pub mod llm;
pub mod model;
pub mod param_extractor;
pub mod param_validator;
pub mod progress;
pub mod query_builder;
pub mod query_validator;
pub mod schema_suggestions;
pub mod template_search;
mod util;

pub use cache::{AllowedValuesCache, AllowedValuesLoader, AllowedValuesProvider, CacheConfig};
pub use confidence::{classify, effective_confidence, ConfidenceThresholds, ConfidenceTier};
pub use coordinator::{process_query, resume, Dependencies, PipelineOutcome, PipelineResult, ProcessQueryRequest, ResumeInput, DEFAULT_TEMPLATE_MATCH_THRESHOLD};
pub use execution::{split_visible_columns, QueryResultSet, SqlExecutor, TableRanker, TemplateLookup};
pub use llm::{parse_extraction_response, parse_query_builder_response, LlmCapability, MissingParameter, ParameterExtractionOutcome, QueryBuilderOutcome};
pub use model::*;
pub use param_extractor::{extract, substitute, ExtractionOutput};
pub use param_validator::{validate as validate_parameters, PartialFlags};
pub use progress::{with_progress, NoOpReporter, ProgressEvent, ProgressReporter, QueueReporter, StepStatus};
pub use query_builder::{QueryBuilderRequest, DEFAULT_MAX_DISPLAY_COLUMNS};
pub use query_validator::{tables_referenced_in, validate as validate_query, AllowedTables};
pub use template_search::{InMemoryTemplateCatalog, TemplateMatch, TemplateSearch};
