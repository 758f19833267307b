//! Startup wiring: turns [`Settings`] into a fully constructed
//! [`AppState`] — connects to Postgres, introspects the curated schema,
//! fetches the template catalog, and builds the two LLM clients.

use std::sync::Arc;
use std::time::Duration;

use nlsql_core::{AllowedValuesCache, CacheConfig, Dependencies, InMemoryTemplateCatalog, QueryTemplate};
use nlsql_db::{allowed_tables_from, load_table_metadata, CatalogTableRanker, PostgresAllowedValuesLoader, PostgresExecutor};
use nlsql_error::NlsqlError;
use nlsql_llm_client::{ChatCompletionClient, LlmClientConfig};

use crate::config::Settings;
use crate::state::{AppState, ThreadContextStore};

/// Builds the full dependency graph the chat-stream handler needs.
///
/// # Errors
/// Returns [`NlsqlError`] if the database is unreachable, schema
/// introspection fails, or the template catalog cannot be fetched.
pub async fn build_app_state(settings: &Settings) -> Result<AppState, NlsqlError> {
    let pool = nlsql_db::connect(&settings.database_url()).await?;

    let tables = load_table_metadata(&pool, &[]).await?;
    let allowed_tables = Arc::new(allowed_tables_from(&tables));
    let table_ranker = Arc::new(CatalogTableRanker::new(tables));

    let templates = fetch_template_catalog(&settings.search_endpoint).await?;
    let template_catalog = Arc::new(InMemoryTemplateCatalog::new(templates));

    let allowed_values_loader = Arc::new(PostgresAllowedValuesLoader::new(pool.clone()));
    let allowed_values = Arc::new(AllowedValuesCache::new(
        allowed_values_loader,
        CacheConfig { ttl: settings.allowed_values_ttl(), max_values: settings.allowed_values_max },
    ));

    let llm_config = LlmClientConfig::new(settings.llm_endpoint.clone(), settings.llm_model_deployment_name.clone(), settings.llm_api_key.clone());
    let llm_client: Arc<dyn nlsql_core::LlmCapability> = Arc::new(ChatCompletionClient::new(llm_config));

    let pipeline = Arc::new(Dependencies {
        template_search: template_catalog.clone(),
        template_lookup: template_catalog,
        allowed_values,
        param_extraction_llm: llm_client.clone(),
        query_builder_llm: llm_client.clone(),
        table_ranker,
        executor: Arc::new(PostgresExecutor::new(pool)),
        allowed_tables,
        thresholds: settings.thresholds(),
        template_match_threshold: settings.template_match_threshold,
        max_display_columns: settings.max_display_columns,
    });

    let metrics_handle = settings.enable_instrumentation.then(|| Arc::new(crate::metrics::init_metrics()));

    Ok(AppState {
        pipeline,
        chat_llm: llm_client,
        contexts: Arc::new(ThreadContextStore::new(Duration::from_secs(3600))),
        thread_store_url: settings.thread_store_url.clone().map(Arc::from),
        http_client: reqwest::Client::new(),
        metrics_handle,
    })
}

/// Fetches the indexed template catalog as a JSON array of
/// [`QueryTemplate`] from the configured search backend.
async fn fetch_template_catalog(search_endpoint: &str) -> Result<Vec<QueryTemplate>, NlsqlError> {
    let response = reqwest::get(search_endpoint).await.map_err(|e| NlsqlError::ServiceUnavailable { reason: e.to_string() })?;
    response.json::<Vec<QueryTemplate>>().await.map_err(|e| NlsqlError::ServiceUnavailable { reason: e.to_string() })
}
