//! Dates and times. Numeric dates are read day-first.

use chrono::{Datelike, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::repair_digits;

/// Explicit layouts, tried in order. Two-digit years come first so a
/// four-digit pattern never reads `24` as the year 24.
const FORMATS: &[&str] = &[
    "%d/%m/%y", "%d-%m-%y", "%d.%m.%y",
    "%Y-%m-%d", "%Y/%m/%d",
    "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y",
    "%d %B %Y", "%d %b %Y", "%d %B, %Y", "%d %b, %Y",
    "%d-%b-%Y", "%d-%B-%Y",
    "%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%b %d %Y",
];

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,4})\s*[/\-.]\s*(\d{1,2})\s*[/\-.]\s*(\d{2,4})\b").unwrap()
});
static DAY_MONTH_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?[\s\-./,]*([a-z]{3,9})\.?[\s\-./,]*(\d{2,4})\b").unwrap()
});
static MONTH_NAME_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b").unwrap()
});

static CLOCK_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*[:.]\s*(\d{2})\s*(a\.?\s?m\.?|p\.?\s?m\.?)?").unwrap()
});
static MILITARY_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{2})(\d{2})\s*(?:hrs|hours|hr|h)\b").unwrap());
static HOUR_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})\s*(a\.?\s?m\.?|p\.?\s?m\.?)").unwrap());

/// Parse a date written in any of the layouts OCR'd forms use.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim().trim_matches(|c: char| matches!(c, ':' | ',' | ';' | '.' | '-'));
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .filter(plausible)
        .or_else(|| fuzzy_date(s))
}

/// Scan for a date inside noisy text, after undoing OCR digit swaps.
fn fuzzy_date(s: &str) -> Option<NaiveDate> {
    let repaired = repair_digits(s);

    for caps in NUMERIC_DATE.captures_iter(&repaired) {
        let (a, b, c) = (&caps[1], &caps[2], &caps[3]);
        let date = if a.len() == 4 {
            ymd(a.parse().ok()?, b, c)
        } else {
            expand_year(c).and_then(|y| ymd(y, b, a))
        };
        if date.is_some() {
            return date;
        }
    }

    for caps in DAY_MONTH_NAME.captures_iter(&repaired) {
        if let Some(date) = named(&caps[1], &caps[2], &caps[3]) {
            return Some(date);
        }
    }
    for caps in MONTH_NAME_DAY.captures_iter(&repaired) {
        if let Some(date) = named(&caps[2], &caps[1], &caps[3]) {
            return Some(date);
        }
    }
    None
}

fn ymd(year: i32, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?).filter(plausible)
}

fn named(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let month = month_number(month)?;
    let year = expand_year(year)?;
    NaiveDate::from_ymd_opt(year, month, day.parse().ok()?).filter(plausible)
}

fn plausible(date: &NaiveDate) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&date.year())
}

/// Two-digit years pivot at 70, as chrono's `%y` does.
fn expand_year(year: &str) -> Option<i32> {
    let n: i32 = year.parse().ok()?;
    match year.len() {
        2 if n < 70 => Some(2000 + n),
        2 => Some(1900 + n),
        4 => Some(n),
        _ => None,
    }
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = name.to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| lower.starts_with(m))
        .map(|i| i as u32 + 1)
}

/// Parse a clock time into `HH:MM`.
pub fn parse_time(raw: &str) -> Option<String> {
    let repaired = repair_digits(raw);

    let (hour, minute, meridiem): (u32, u32, Option<String>) = if let Some(caps) = CLOCK_TIME.captures(&repaired) {
        (caps[1].parse().ok()?, caps[2].parse().ok()?, caps.get(3).map(|m| m.as_str().to_string()))
    } else if let Some(caps) = MILITARY_TIME.captures(&repaired) {
        (caps[1].parse().ok()?, caps[2].parse().ok()?, None)
    } else if let Some(caps) = HOUR_ONLY.captures(&repaired) {
        (caps[1].parse().ok()?, 0, Some(caps[2].to_string()))
    } else {
        return None;
    };

    let hour = apply_meridiem(hour, meridiem.as_deref())?;
    NaiveTime::from_hms_opt(hour, minute, 0).map(|t| t.format("%H:%M").to_string())
}

fn apply_meridiem(hour: u32, meridiem: Option<&str>) -> Option<u32> {
    let Some(m) = meridiem else {
        return Some(hour);
    };
    if hour == 0 || hour > 12 {
        return None;
    }
    let pm = m.to_ascii_lowercase().starts_with('p');
    Some(match (pm, hour) {
        (false, 12) => 0,
        (false, h) => h,
        (true, 12) => 12,
        (true, h) => h + 12,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_first_numeric() {
        assert_eq!(parse_date("05/03/2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("5-3-2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("05.03.24"), Some(date(2024, 3, 5)));
    }

    #[test]
    fn test_iso_is_idempotent() {
        let d = parse_date("2024-03-05").unwrap();
        assert_eq!(parse_date(&d.format("%Y-%m-%d").to_string()), Some(d));
    }

    #[test]
    fn test_month_names() {
        assert_eq!(parse_date("5 March 2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("March 5, 2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("5th Sept, 2024"), Some(date(2024, 9, 5)));
    }

    #[test]
    fn test_fuzzy_with_ocr_noise() {
        assert_eq!(parse_date("l2/O3/2O24 at 10 pm"), Some(date(2024, 3, 12)));
        assert_eq!(parse_date("on 12-03-2024 (Tuesday)"), Some(date(2024, 3, 12)));
    }

    #[test]
    fn test_invalid_dates() {
        assert_eq!(parse_date("31/02/2024"), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("12/03/1024"), None);
    }

    #[test]
    fn test_times() {
        assert_eq!(parse_time("10:30").as_deref(), Some("10:30"));
        assert_eq!(parse_time("9.05 PM").as_deref(), Some("21:05"));
        assert_eq!(parse_time("12:15 a.m.").as_deref(), Some("00:15"));
        assert_eq!(parse_time("1430 hrs").as_deref(), Some("14:30"));
        assert_eq!(parse_time("about 7 am").as_deref(), Some("07:00"));
        assert_eq!(parse_time("25:00"), None);
        assert_eq!(parse_time("morning"), None);
    }
}
