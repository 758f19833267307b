//! Small text-normalization helpers shared by template search and
//! parameter extraction fast-path matching.

/// Lowercases and strips a trailing plural `s` (naive; good enough for the
/// catalog of short business nouns this system deals with — "customers"
/// -> "customer", "orders" -> "order"). Leaves short words alone to avoid
/// mangling things like "gas" -> "ga".
#[must_use]
pub fn normalize_word(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.len() > 3 && lower.ends_with('s') && !lower.ends_with("ss") {
        lower[..lower.len() - 1].to_string()
    } else {
        lower
    }
}

/// Splits on non-alphanumeric boundaries and normalizes each token.
#[must_use]
pub fn normalize_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(normalize_word)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_simple_plural() {
        assert_eq!(normalize_word("Customers"), "customer");
    }

    #[test]
    fn leaves_short_words_alone() {
        assert_eq!(normalize_word("gas"), "gas");
    }
}
