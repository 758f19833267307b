//! Keyword-overlap [`TableRanker`] over a startup-loaded table catalog.
//!
//! No embedding model is wired into this deployment (§9 Non-goals exclude
//! semantic search infrastructure); this ranks by how many of the user's
//! words appear in a table's name, description, or column names, which is
//! enough signal for the dynamic path to narrow a handful of curated
//! tables down to the handful actually relevant to one question.

use async_trait::async_trait;

use nlsql_core::{TableMetadata, TableRanker};

pub struct CatalogTableRanker {
    tables: Vec<TableMetadata>,
    /// Maximum number of ranked tables handed to the query builder; kept
    /// small so the dynamic-path prompt stays within a reasonable size.
    top_n: usize,
}

const DEFAULT_TOP_N: usize = 8;

impl CatalogTableRanker {
    #[must_use]
    pub const fn new(tables: Vec<TableMetadata>) -> Self {
        Self { tables, top_n: DEFAULT_TOP_N }
    }

    #[must_use]
    pub const fn with_top_n(tables: Vec<TableMetadata>, top_n: usize) -> Self {
        Self { tables, top_n }
    }
}

#[async_trait]
impl TableRanker for CatalogTableRanker {
    async fn rank_tables(&self, user_text: &str) -> Vec<TableMetadata> {
        let query_words = words(user_text);
        if query_words.is_empty() {
            return self.tables.iter().take(self.top_n).cloned().collect();
        }

        let mut scored: Vec<(usize, &TableMetadata)> = self.tables.iter().map(|t| (score(t, &query_words), t)).collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().filter(|(score, _)| *score > 0).take(self.top_n).map(|(_, t)| t.clone()).collect()
    }
}

fn score(table: &TableMetadata, query_words: &[String]) -> usize {
    let haystack = words(&format!(
        "{} {} {}",
        table.name,
        table.description,
        table.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(" ")
    ));
    query_words.iter().filter(|w| haystack.contains(*w)).count()
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase().split(|c: char| !c.is_alphanumeric()).filter(|w| w.len() > 2).map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlsql_core::ColumnMetadata;

    fn table(name: &str, description: &str, columns: &[&str]) -> TableMetadata {
        TableMetadata {
            name: name.to_string(),
            description: description.to_string(),
            columns: columns
                .iter()
                .map(|c| ColumnMetadata {
                    name: (*c).to_string(),
                    data_type: "text".to_string(),
                    nullable: true,
                    is_primary_key: false,
                    references: None,
                    description: String::new(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn ranks_matching_table_first() {
        let ranker = CatalogTableRanker::new(vec![
            table("Sales.Orders", "customer orders", &["order_id", "customer_id"]),
            table("Warehouse.Stock", "inventory levels", &["sku", "quantity"]),
        ]);
        let ranked = ranker.rank_tables("how many orders did each customer place").await;
        assert_eq!(ranked[0].name, "Sales.Orders");
    }

    #[tokio::test]
    async fn unmatched_query_falls_back_to_whole_catalog() {
        let ranker = CatalogTableRanker::with_top_n(vec![table("Sales.Orders", "customer orders", &["order_id"])], 5);
        let ranked = ranker.rank_tables("???").await;
        assert_eq!(ranked.len(), 1);
    }
}
