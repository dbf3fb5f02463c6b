//! Multi-valued fields.

use std::collections::HashSet;

use super::clean_text;

const DELIMITERS: &[char] = &[',', ';', '/', '\n', '\u{2022}', '\u{25CF}', '\u{25AA}', '\u{00B7}'];

/// Split on commas, semicolons, slashes, newlines and bullets. Items are
/// cleaned, empty ones dropped, exact repeats removed; order is kept.
pub fn split_list(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(DELIMITERS)
        .filter_map(|item| clean_text(item.trim_start_matches(|c: char| c == '*' || c.is_whitespace())))
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
