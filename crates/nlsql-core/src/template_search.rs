//! Template Search (C2) — ranked lookup over a pre-indexed catalog of
//! parameterized SQL templates.
//!
//! The trait abstracts over the backing search technology (vector index,
//! lexical index, or — as shipped here — an in-memory catalog loaded from
//! JSON) so a real search backend can replace [`InMemoryTemplateCatalog`]
//! without touching the coordinator (§9 "Supplemented features").

use async_trait::async_trait;
use serde::Deserialize;

use crate::model::QueryTemplate;
use crate::util::normalize_tokens;

/// One ranked candidate returned by a template search.
#[derive(Debug, Clone)]
pub struct TemplateMatch {
    pub template: QueryTemplate,
    /// Similarity score in `[0, 1]`.
    pub score: f64,
}

#[async_trait]
pub trait TemplateSearch: Send + Sync {
    /// Returns candidates ranked by descending score; empty when nothing
    /// in the catalog is plausibly related.
    async fn search(&self, user_text: &str) -> Vec<TemplateMatch>;
}

/// A simple lexical-overlap catalog: scores a template by the fraction of
/// its exemplar's normalized tokens that also appear in the user's text.
/// Adequate for tests and small deployments; real deployments inject a
/// vector-search-backed [`TemplateSearch`] instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InMemoryTemplateCatalog {
    templates: Vec<QueryTemplate>,
}

impl InMemoryTemplateCatalog {
    #[must_use]
    pub fn new(templates: Vec<QueryTemplate>) -> Self {
        Self { templates }
    }

    /// Loads a catalog from a JSON file, the concrete startup path named
    /// in SPEC_FULL.md's "Template catalog loader" supplement.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or does not parse as a
    /// JSON array of [`QueryTemplate`].
    pub fn from_json(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let templates: Vec<QueryTemplate> = serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Self { templates })
    }
}

#[async_trait]
impl crate::execution::TemplateLookup for InMemoryTemplateCatalog {
    async fn get(&self, template_id: &str) -> Option<QueryTemplate> {
        self.templates.iter().find(|t| t.id == template_id).cloned()
    }
}

#[async_trait]
impl TemplateSearch for InMemoryTemplateCatalog {
    async fn search(&self, user_text: &str) -> Vec<TemplateMatch> {
        let query_tokens = normalize_tokens(user_text);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<TemplateMatch> = self
            .templates
            .iter()
            .filter_map(|template| {
                let exemplar_tokens = normalize_tokens(&template.natural_language_exemplar);
                if exemplar_tokens.is_empty() {
                    return None;
                }
                let overlap = exemplar_tokens
                    .iter()
                    .filter(|t| query_tokens.contains(t))
                    .count();
                let score = overlap as f64 / exemplar_tokens.len() as f64;
                (score > 0.0).then_some(TemplateMatch {
                    template: template.clone(),
                    score,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParameterDefinition;

    fn template(id: &str, exemplar: &str) -> QueryTemplate {
        QueryTemplate {
            id: id.to_string(),
            natural_language_exemplar: exemplar.to_string(),
            sql_text_with_tokens: "SELECT 1".to_string(),
            tables_referenced: vec![],
            parameters: Vec::<ParameterDefinition>::new(),
        }
    }

    #[tokio::test]
    async fn exact_phrase_ranks_first() {
        let catalog = InMemoryTemplateCatalog::new(vec![
            template("t1", "top N customers by metric"),
            template("t2", "list all warehouse locations"),
        ]);
        let results = catalog.search("top 10 customers by order count").await;
        assert_eq!(results[0].template.id, "t1");
        assert!(results[0].score > 0.0);
    }

    #[tokio::test]
    async fn unrelated_text_returns_empty() {
        let catalog = InMemoryTemplateCatalog::new(vec![template("t1", "top N customers by metric")]);
        let results = catalog.search("zzz qqq xyz").await;
        assert!(results.is_empty());
    }
}
