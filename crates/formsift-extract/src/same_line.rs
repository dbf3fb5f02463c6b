//! Same-line capture: the value written after a label on its own line.

use crate::dictionary::find_bounded;

const SEPARATORS: &[char] = &[':', '-', '\u{2013}', '\u{2014}', '='];
const RESIDUAL: &[char] = &[':', '-', '\u{2013}', '\u{2014}', '=', '.', ',', ';', '|', '_'];

pub fn is_separator(c: char) -> bool {
    SEPARATORS.contains(&c)
}

/// Byte offset just past the separator that follows a label, if any.
///
/// Whitespace, dots and one parenthetical qualifier such as `(in years)` may
/// sit between the label and its separator.
pub fn separator_end(rest: &str) -> Option<usize> {
    let mut index = skip_filler(rest, 0);
    if rest[index..].starts_with('(') {
        let close = rest[index..].find(')')?;
        index = skip_filler(rest, index + close + 1);
    }
    let c = rest[index..].chars().next()?;
    is_separator(c).then(|| index + c.len_utf8())
}

fn skip_filler(s: &str, from: usize) -> usize {
    s[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace() && *c != '.')
        .map_or(s.len(), |(i, _)| from + i)
}

/// Value after `variant` within a segment, or `None` when nothing follows it.
///
/// With a separator the value is everything after it, trimmed. Without one
/// the label is dropped and stray punctuation trimmed from what remains.
pub fn extract_same_line(segment: &str, variant: &str) -> Option<String> {
    let needle = variant
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();
    if needle.is_empty() {
        return None;
    }
    let lower = segment.to_ascii_lowercase();
    let start = find_bounded(&lower, &needle).next()?;
    let rest = &segment[start + needle.len()..];

    let value = match separator_end(rest) {
        Some(end) => rest[end..].trim(),
        None => rest.trim_matches(|c: char| c.is_whitespace() || RESIDUAL.contains(&c)),
    };
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
