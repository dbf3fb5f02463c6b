//! Integers with sanity bounds, and decimals written either way round.

use once_cell::sync::Lazy;
use regex::Regex;

use super::repair_digits;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").unwrap());
static DECIMAL_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+,\d{1,2}$").unwrap());

/// First run of digits, checked against an inclusive range when one is given.
pub fn parse_integer(raw: &str, bounds: Option<(i64, i64)>) -> Option<i64> {
    let repaired = repair_digits(raw);
    let value: i64 = DIGIT_RUN.find(&repaired)?.as_str().parse().ok()?;
    match bounds {
        Some((min, max)) if value < min || value > max => None,
        _ => Some(value),
    }
}

/// First number in the text. A lone comma followed by one or two digits is a
/// decimal comma (`123,45`); any other comma groups thousands (`1,23,000`).
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let repaired = repair_digits(raw);
    let token = NUMBER_TOKEN.find(&repaired)?.as_str().trim_end_matches(',');
    let normalized = if !token.contains('.') && DECIMAL_COMMA.is_match(token) {
        token.replacen(',', ".", 1)
    } else {
        token.replace(',', "")
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_takes_first_run() {
        assert_eq!(parse_integer("34 yrs", None), Some(34));
        assert_eq!(parse_integer("about 3O years", None), Some(30));
        assert_eq!(parse_integer("no digits", None), None);
    }

    #[test]
    fn test_integer_bounds_are_inclusive() {
        assert_eq!(parse_integer("0", Some((0, 130))), Some(0));
        assert_eq!(parse_integer("130", Some((0, 130))), Some(130));
        assert_eq!(parse_integer("131", Some((0, 130))), None);
    }

    #[test]
    fn test_integer_overflow_is_rejected() {
        assert_eq!(parse_integer("99999999999999999999", None), None);
    }

    #[test]
    fn test_decimal_separators() {
        assert_eq!(parse_decimal("Rs. 50,000/-"), Some(50000.0));
        assert_eq!(parse_decimal("1,23,000"), Some(123000.0));
        assert_eq!(parse_decimal("12,000.50"), Some(12000.5));
        assert_eq!(parse_decimal("123,45"), Some(123.45));
        assert_eq!(parse_decimal("7.5 kg"), Some(7.5));
        assert_eq!(parse_decimal("nil"), None);
    }
}
