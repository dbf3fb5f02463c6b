//! Normalization — raw captures into typed, well-formed values.
//!
//! Every function here is pure. A capture that is empty after cleaning is
//! "not found"; one that is present but cannot be coerced into its field's
//! kind is rejected and reported as `invalid_format`.

pub mod dates;
pub mod lists;
pub mod numbers;

use formsift_core::{FieldRole, FieldValue, LabelSpec, ValueKind};

/// Outcome of normalizing one capture.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Value(FieldValue),
    /// Nothing left after cleaning.
    Empty,
    /// Present but not coercible into the field's kind.
    Rejected,
}

/// Characters stripped from both ends of a text value.
const EDGE_PUNCTUATION: &[char] = &[':', ';', ',', '|', '_', '-', '\u{2013}', '\u{2014}', '=', '*', '"'];

pub fn normalize(raw: &str, spec: &LabelSpec) -> Normalized {
    if spec.role == FieldRole::Narrative {
        return match clean_narrative(raw) {
            Some(text) => Normalized::Value(FieldValue::Text(text)),
            None => Normalized::Empty,
        };
    }

    let Some(cleaned) = clean_text(raw) else {
        return Normalized::Empty;
    };

    let value = match spec.effective_kind() {
        ValueKind::Text => Some(FieldValue::Text(cleaned)),
        ValueKind::Integer => numbers::parse_integer(&cleaned, spec.bounds).map(FieldValue::Integer),
        ValueKind::Decimal => numbers::parse_decimal(&cleaned).map(FieldValue::Decimal),
        ValueKind::Date => dates::parse_date(&cleaned).map(FieldValue::Date),
        ValueKind::Time => dates::parse_time(&cleaned).map(FieldValue::Text),
        ValueKind::Address => normalize_address(raw).map(FieldValue::Text),
        ValueKind::Identifier => normalize_identifier(&cleaned).map(FieldValue::Text),
        ValueKind::List => {
            let items = lists::split_list(raw);
            if items.is_empty() {
                return Normalized::Empty;
            }
            Some(FieldValue::List(items))
        }
    };

    match value {
        Some(v) => Normalized::Value(v),
        None => Normalized::Rejected,
    }
}

/// Collapse whitespace and strip label residue from the edges.
pub fn clean_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c.is_whitespace() || EDGE_PUNCTUATION.contains(&c));
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Narratives keep their own punctuation; only a leading separator goes.
fn clean_narrative(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | '\u{2013}' | '\u{2014}'))
        .trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// One line per address part, joined with commas.
pub fn normalize_address(raw: &str) -> Option<String> {
    let parts: Vec<String> = raw
        .lines()
        .flat_map(|line| line.split(','))
        .filter_map(clean_text)
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// The first token carrying a digit (`45/2024` out of `45/2024 dated ...`),
/// reduced to letters, digits, `/` and `-`. Falls back to the whole value.
pub fn normalize_identifier(cleaned: &str) -> Option<String> {
    let keep = |token: &str| -> String {
        token
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '/' || *c == '-')
            .collect::<String>()
            .trim_matches('-')
            .to_string()
    };
    let id = cleaned
        .split_whitespace()
        .find(|t| t.chars().any(|c| c.is_ascii_digit()))
        .map(keep)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| cleaned.to_string());
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Undo common OCR letter-for-digit swaps, but only next to a digit so
/// month names and words are left alone.
pub fn repair_digits(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let digit_at = |i: usize| chars.get(i).map_or(false, |c| c.is_ascii_digit());
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let repaired = match c {
                'O' | 'o' => '0',
                'l' | 'I' | '|' => '1',
                'S' => '5',
                'B' => '8',
                _ => return c,
            };
            let next_to_digit = (i > 0 && digit_at(i - 1)) || digit_at(i + 1);
            if next_to_digit {
                repaired
            } else {
                c
            }
        })
        .collect()
}
