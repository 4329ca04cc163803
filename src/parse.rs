//! Field parsers for loosely typed spreadsheet cells.
//!
//! Every parser returns `Result<_, ParseError>`; the analytics default failed
//! values to zero (or the fallback month) and keep the error as a warning.

use crate::error::ParseError;
use crate::record::CellValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Month key used for rows whose date cannot be parsed
pub const UNKNOWN_MONTH: &str = "sem-data";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Strip currency markers and normalize thousands/decimal separators.
///
/// `"R$ 1.234,56"` -> `"1234.56"`, `"$1,234.56"` -> `"1234.56"`,
/// `"100,00"` -> `"100.00"`, `"1.234.567"` -> `"1234567"`.
pub fn normalize_number(raw: &str) -> String {
    let cleaned: String = raw
        .replace("R$", "")
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '€' | '£' | '\u{a0}'))
        .collect();

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');

    match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => {
            if cleaned.matches(',').count() > 1 {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    }
}

/// Parse a monetary amount
pub fn parse_amount(value: Option<&CellValue>) -> ParseResult<f64> {
    match value {
        None => Err(ParseError::Empty),
        Some(CellValue::Number(n)) if n.is_finite() => Ok(*n),
        Some(CellValue::Number(n)) => Err(ParseError::InvalidNumber { raw: n.to_string() }),
        Some(CellValue::Text(raw)) => parse_amount_str(raw),
    }
}

pub fn parse_amount_str(raw: &str) -> ParseResult<f64> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    normalize_number(raw)
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber { raw: raw.to_string() })
}

/// Parse an integer quantity; fractional input is truncated
pub fn parse_quantity(value: Option<&CellValue>) -> ParseResult<i64> {
    parse_amount(value).map(|n| n.trunc() as i64)
}

/// Parse a sale date from the formats the sheets have been seen to use
pub fn parse_date(value: Option<&CellValue>) -> ParseResult<NaiveDate> {
    let raw = match value {
        None => return Err(ParseError::Empty),
        Some(CellValue::Number(n)) => return Err(ParseError::InvalidDate { raw: n.to_string() }),
        Some(CellValue::Text(raw)) => raw.trim(),
    };
    if raw.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(date);
        }
    }
    Err(ParseError::InvalidDate { raw: raw.to_string() })
}

/// `YYYY-MM` bucket key for a date
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_brazilian_amounts() {
        assert_eq!(parse_amount(Some(&text("R$ 100,00"))), Ok(100.0));
        assert_eq!(parse_amount(Some(&text("R$ 1.234,56"))), Ok(1234.56));
        assert_eq!(parse_amount(Some(&text("50"))), Ok(50.0));
        assert_eq!(parse_amount(Some(&text("$1,234.50"))), Ok(1234.5));
        assert_eq!(parse_amount(Some(&text("1.234.567"))), Ok(1234567.0));
    }

    #[test]
    fn test_malformed_amounts_are_errors_not_panics() {
        assert_eq!(parse_amount(None), Err(ParseError::Empty));
        assert_eq!(parse_amount(Some(&text("  "))), Err(ParseError::Empty));
        assert!(matches!(
            parse_amount(Some(&text("abc"))),
            Err(ParseError::InvalidNumber { .. })
        ));
        assert!(parse_amount(Some(&CellValue::Number(f64::NAN))).is_err());
    }

    #[test]
    fn test_quantity_truncates() {
        assert_eq!(parse_quantity(Some(&CellValue::Number(3.0))), Ok(3));
        assert_eq!(parse_quantity(Some(&text("2,0"))), Ok(2));
        assert!(parse_quantity(Some(&text("dois"))).is_err());
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        assert_eq!(parse_date(Some(&text("2025-03-15"))), Ok(expected));
        assert_eq!(parse_date(Some(&text("15/03/2025"))), Ok(expected));
        assert_eq!(parse_date(Some(&text("2025-03-15T03:00:00.000Z"))), Ok(expected));
        assert_eq!(parse_date(Some(&text("2025-03-15 10:20:30"))), Ok(expected));
        assert!(parse_date(Some(&text("ontem"))).is_err());
        assert_eq!(month_key(expected), "2025-03");
    }
}
