//! Fixture templates and table metadata matching the end-to-end scenarios
//! in §8: the "top N customers by metric" template used by scenarios 1-3,
//! and a small Sales-schema table catalog for the dynamic-path scenarios.

use nlsql_core::{
    AllowedTables, AllowedValuesSource, ColumnMetadata, ParameterDefinition, ParameterType, ParameterValidation, QueryTemplate, TableMetadata,
};

/// The template exercised by §8 scenarios 1-3: `count` defaults to 10 and
/// validates as an int in `[1, 1000]`; `metric` is a structural enum with
/// no database hydration, `ask_if_missing = true`.
#[must_use]
pub fn top_n_customers_template() -> QueryTemplate {
    QueryTemplate {
        id: "top_n_customers".to_string(),
        natural_language_exemplar: "top N customers by metric".to_string(),
        sql_text_with_tokens: "SELECT TOP %{count}% CustomerId, CustomerName FROM Sales.Customer ORDER BY %{metric}% DESC".to_string(),
        tables_referenced: vec!["Sales.Customer".to_string()],
        parameters: vec![
            ParameterDefinition {
                name: "count".to_string(),
                column: None,
                table: None,
                description: "how many customers to return".to_string(),
                ask_if_missing: false,
                confidence_weight: 1.0,
                default_value: Some(serde_json::json!(10)),
                default_policy: None,
                allowed_values_source: AllowedValuesSource::Null,
                validation: Some(ParameterValidation { kind: ParameterType::Int, min: Some(1), max: Some(1000), regex: None, allowed_values: None }),
            },
            ParameterDefinition {
                name: "metric".to_string(),
                column: None,
                table: None,
                description: "the metric to rank customers by".to_string(),
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
            },
        ],
    }
}

/// A minimal curated Sales-schema catalog for the dynamic-path scenarios
/// (§8 scenarios 4-6): enough columns to let the query builder and
/// table ranker reason about the question, deliberately small so fixture
/// tests stay legible.
#[must_use]
pub fn sales_table_metadata() -> Vec<TableMetadata> {
    vec![
        TableMetadata {
            name: "Sales.Customer".to_string(),
            description: "customer accounts".to_string(),
            columns: vec![
                col("CustomerId", "int4", false, true, None),
                col("CustomerName", "text", false, false, None),
                col("Region", "text", true, false, None),
            ],
        },
        TableMetadata {
            name: "Sales.Orders".to_string(),
            description: "customer purchase orders".to_string(),
            columns: vec![
                col("OrderId", "int4", false, true, None),
                col("CustomerId", "int4", false, false, Some("Sales.Customer")),
                col("OrderDate", "date", false, false, None),
                col("TotalAmount", "numeric", false, false, None),
            ],
        },
        TableMetadata {
            name: "Purchasing.Supplier".to_string(),
            description: "upstream suppliers".to_string(),
            columns: vec![col("SupplierId", "int4", false, true, None), col("SupplierName", "text", false, false, None)],
        },
    ]
}

fn col(name: &str, data_type: &str, nullable: bool, is_primary_key: bool, references: Option<&str>) -> ColumnMetadata {
    ColumnMetadata {
        name: name.to_string(),
        data_type: data_type.to_string(),
        nullable,
        is_primary_key,
        references: references.map(ToString::to_string),
        description: String::new(),
    }
}

/// The allowlist matching [`sales_table_metadata`] — deliberately excludes
/// any HR-schema table, the disallowed-table scenario's premise (§8
/// scenario 5).
#[must_use]
pub fn sales_allowed_tables() -> AllowedTables {
    AllowedTables::new(sales_table_metadata().into_iter().map(|t| t.name))
}
