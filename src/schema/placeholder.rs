//! Placeholder scanning shared by custom-method and SQL-subquery templates.

use std::collections::BTreeSet;

use regex::Regex;

lazy_static::lazy_static! {
    static ref PLACEHOLDER_PATTERN: Regex =
        Regex::new(r"\{(\w+)\}").expect("static placeholder regex is valid");
}

/// Scans a template string for `{identifier}` placeholders, returning the
/// distinct set of names found (order-independent — callers compare this
/// against a declared parameter set via symmetric difference).
pub fn extract_placeholders(template: &str) -> BTreeSet<String> {
    PLACEHOLDER_PATTERN
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// `true` iff `declared` and `found` contain exactly the same names.
pub fn names_match<'a>(
    declared: impl Iterator<Item = &'a String>,
    found: &BTreeSet<String>,
) -> bool {
    let declared: BTreeSet<&String> = declared.collect();
    let found_refs: BTreeSet<&String> = found.iter().collect();
    declared == found_refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_distinct_placeholder_names() {
        let found = extract_placeholders("foo({x}) and bar({x}, {y})");
        assert_eq!(found.len(), 2);
        assert!(found.contains("x"));
        assert!(found.contains("y"));
    }

    #[test]
    fn no_placeholders_yields_empty_set() {
        assert!(extract_placeholders("foo()").is_empty());
    }
}
