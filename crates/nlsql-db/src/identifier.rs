//! PostgreSQL identifier quoting.
//!
//! Table and column names reaching this crate come from curated template
//! and table-metadata catalogs, never directly from user or LLM text, but
//! SQL has no parameter-binding syntax for identifiers — they still have
//! to be quoted before interpolation.

/// Quotes a possibly schema-qualified identifier (`Sales.Customer`) with
/// double quotes per component.
#[must_use]
pub fn quote(identifier: &str) -> String {
    identifier.split('.').map(|part| format!("\"{part}\"")).collect::<Vec<_>>().join(".")
}

/// True if `identifier` (optionally schema-qualified) contains only
/// characters valid in an unquoted or simply-quoted Postgres identifier.
/// Defends [`quote`] against a malformed catalog entry smuggling
/// statement-breaking characters into an interpolated identifier.
#[must_use]
pub fn is_safe(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_each_component() {
        assert_eq!(quote("Sales.Customer"), "\"Sales\".\"Customer\"");
        assert_eq!(quote("Customer"), "\"Customer\"");
    }

    #[test]
    fn rejects_quote_characters() {
        assert!(!is_safe("Sales\".Customer; DROP TABLE x --"));
        assert!(is_safe("Sales.Customer"));
        assert!(is_safe("customer_id"));
    }
}
