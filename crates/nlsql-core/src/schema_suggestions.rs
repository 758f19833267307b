//! Schema-area suggestion engine (§4.1 "Schema-area suggestions", §4.9).
//!
//! After a successful execution, the coordinator extracts the
//! fully-qualified tables referenced in the executed SQL, determines the
//! primary schema area from the `FROM` clause (not from joined lookup
//! tables), and selects 2-3 follow-up suggestions from a static map.

use crate::model::{SchemaArea, SchemaSuggestion};

/// Static suggestion catalog, keyed by schema area. A real deployment
/// would source this from configuration; it is a fixed table here because
/// the areas themselves (sales/warehouse/purchasing/application) are a
/// closed set per the data model (§3).
fn catalog(area: SchemaArea) -> &'static [(&'static str, &'static str)] {
    match area {
        SchemaArea::Sales => &[
            ("Top customers", "Who are our top 10 customers by order count this year?"),
            ("Recent orders", "Show me the 20 most recent orders."),
            ("Revenue by region", "What's our revenue broken down by region?"),
        ],
        SchemaArea::Warehouse => &[
            ("Low stock items", "Which items are below their reorder threshold?"),
            ("Inventory by location", "Show inventory counts by warehouse location."),
            ("Recent stock movements", "What stock movements happened in the last 7 days?"),
        ],
        SchemaArea::Purchasing => &[
            ("Open purchase orders", "List all open purchase orders."),
            ("Supplier spend", "Which suppliers did we spend the most with this quarter?"),
            ("Pending deliveries", "What deliveries are still pending?"),
        ],
        SchemaArea::Application => &[
            ("Active users", "How many users were active in the last 30 days?"),
            ("Recent sign-ups", "Show the most recent sign-ups."),
            ("Error rates", "What are the most common application errors this week?"),
        ],
    }
}

const ALL_AREAS: [SchemaArea; 4] = [SchemaArea::Sales, SchemaArea::Warehouse, SchemaArea::Purchasing, SchemaArea::Application];

/// Generic fallback suggestions, used when table search returned zero
/// candidates and no schema area could be determined (§7).
#[must_use]
pub fn generic_suggestions() -> Vec<SchemaSuggestion> {
    vec![
        SchemaSuggestion { title: "Ask about customers".to_string(), prompt: "Tell me about our customers.".to_string() },
        SchemaSuggestion { title: "Ask about orders".to_string(), prompt: "Show me recent orders.".to_string() },
        SchemaSuggestion { title: "Ask about products".to_string(), prompt: "What products do we sell?".to_string() },
    ]
}

/// Maps a fully-qualified table name's schema prefix to a [`SchemaArea`].
#[must_use]
pub fn area_for_table(table: &str) -> Option<SchemaArea> {
    let schema = table.split('.').next()?.to_lowercase();
    match schema.as_str() {
        "sales" => Some(SchemaArea::Sales),
        "warehouse" => Some(SchemaArea::Warehouse),
        "purchasing" => Some(SchemaArea::Purchasing),
        "application" => Some(SchemaArea::Application),
        _ => None,
    }
}

/// Determines the primary schema area from the executed SQL's `FROM`
/// clause table (the first one — not from `JOIN`ed lookup tables).
#[must_use]
pub fn primary_area(tables_used: &[String]) -> Option<SchemaArea> {
    tables_used.iter().find_map(|t| area_for_table(t))
}

/// Selects 2-3 suggestions for the given area, appending one cross-area
/// suggestion when `schema_exploration_depth >= 3` to broaden exploration
/// (§4.1).
#[must_use]
pub fn suggestions_for(area: Option<SchemaArea>, schema_exploration_depth: u32) -> Vec<SchemaSuggestion> {
    let Some(area) = area else { return generic_suggestions() };

    let mut out: Vec<SchemaSuggestion> = catalog(area)
        .iter()
        .take(3)
        .map(|(title, prompt)| SchemaSuggestion { title: (*title).to_string(), prompt: (*prompt).to_string() })
        .collect();

    if schema_exploration_depth >= 3 {
        if let Some(cross_area) = ALL_AREAS.iter().find(|a| **a != area) {
            if let Some((title, prompt)) = catalog(*cross_area).first() {
                out.push(SchemaSuggestion { title: (*title).to_string(), prompt: (*prompt).to_string() });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_area_from_first_table_only() {
        let tables = vec!["Sales.Customer".to_string(), "Warehouse.Location".to_string()];
        assert_eq!(primary_area(&tables), Some(SchemaArea::Sales));
    }

    #[test]
    fn deep_exploration_adds_cross_area_suggestion() {
        let shallow = suggestions_for(Some(SchemaArea::Sales), 1);
        let deep = suggestions_for(Some(SchemaArea::Sales), 3);
        assert_eq!(shallow.len(), 3);
        assert_eq!(deep.len(), 4);
    }

    #[test]
    fn no_area_falls_back_to_generic() {
        let suggestions = suggestions_for(None, 0);
        assert!(!suggestions.is_empty());
    }
}
