//! Locale-tolerant parsing of numeric and timestamp cells
//!
//! Both parsers are total: anything that cannot be read becomes `None`
//! and is treated as missing downstream.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// A raw cell as handed to the number parser
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

impl<'a> From<Option<&'a str>> for Cell<'a> {
    fn from(value: Option<&'a str>) -> Self {
        match value {
            Some(s) => Cell::Text(s),
            None => Cell::Missing,
        }
    }
}

impl<'a> From<&'a str> for Cell<'a> {
    fn from(value: &'a str) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell<'_> {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Parse a number written either as plain decimal (`1234.56`) or in
/// European notation (`1.234,56`, `123,45`, `1 234,56`).
pub fn parse_number<'a>(raw: impl Into<Cell<'a>>) -> Option<f64> {
    match raw.into() {
        Cell::Missing => None,
        Cell::Number(v) if v.is_nan() => None,
        Cell::Number(v) => Some(v),
        Cell::Text(text) => parse_number_text(text),
    }
}

fn parse_number_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_matches('"')
        .chars()
        .filter(|c| *c != ' ')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    // 1.234,56 -> 1234.56 ; 123,45 -> 123.45
    let canonical = if cleaned.contains(',') && cleaned.contains('.') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned.replace(',', ".")
    };

    canonical.parse::<f64>().ok().filter(|v| !v.is_nan())
}

const DATETIME_FORMATS: [&str; 11] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S %z",
];

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// Parse a timestamp cell. Date-only values land on midnight; offsets are
/// converted to UTC and dropped.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let s = text.trim().trim_matches('"').trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if fmt.ends_with("%z") {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(dt.naive_utc());
            }
        } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_plain_and_european() {
        assert_eq!(parse_number("1234.56"), Some(1234.56));
        assert_eq!(parse_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_number("123,45"), Some(123.45));
        assert_eq!(parse_number(" \"1 234,5\" "), Some(1234.5));
        assert_eq!(parse_number("-7"), Some(-7.0));
    }

    #[test]
    fn test_missing_and_garbage() {
        assert_eq!(parse_number(Cell::Missing), None);
        assert_eq!(parse_number(None::<&str>), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("  \"\" "), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("12abc"), None);
        assert_eq!(parse_number("nan"), None);
    }

    #[test]
    fn test_numeric_passthrough() {
        assert_eq!(parse_number(42.5), Some(42.5));
        assert_eq!(parse_number(f64::NAN), None);
    }

    #[test]
    fn test_timestamp_formats() {
        let dt = parse_timestamp("2023-04-05 13:14:15").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2023, 4, 5, 13));

        let dt = parse_timestamp("2023-04-05T13:14:15.250").unwrap();
        assert_eq!(dt.minute(), 14);

        let dt = parse_timestamp("2023-04-05T13:14:15+02:00").unwrap();
        assert_eq!(dt.hour(), 11);

        let dt = parse_timestamp("05.04.2023").unwrap();
        assert_eq!((dt.month(), dt.day(), dt.hour()), (4, 5, 0));

        let dt = parse_timestamp("04/05/2023 08:00").unwrap();
        assert_eq!((dt.month(), dt.day()), (4, 5));
    }

    #[test]
    fn test_timestamp_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2023-13-45").is_none());
    }
}
