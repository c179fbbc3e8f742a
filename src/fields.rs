//! Value interpreters shared by all format parsers.
//!
//! Everything here either returns the interpreted value or a
//! `MalformedValue` failure carrying the literal source text. Nothing is
//! coerced or defaulted.

use crate::error::ExtractionError;
use crate::models::{Entity, NoticeFormat};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Format and entity a value is read for, used to label failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldScope {
    pub format: NoticeFormat,
    pub entity: Entity,
}

impl FieldScope {
    pub fn new(format: NoticeFormat, entity: Entity) -> Self {
        Self { format, entity }
    }

    pub fn missing(&self, field: &'static str) -> ExtractionError {
        ExtractionError::missing(self.format, self.entity, field)
    }

    pub fn malformed(
        &self,
        field: &'static str,
        raw: &str,
        reason: impl Into<String>,
    ) -> ExtractionError {
        ExtractionError::malformed(self.format, self.entity, field, raw, reason)
    }

    pub fn require<T>(&self, field: &'static str, value: Option<T>) -> Result<T, ExtractionError> {
        value.ok_or_else(|| self.missing(field))
    }

    /// `YYYYMMDD`
    pub fn compact_date(&self, field: &'static str, raw: &str) -> Result<NaiveDate, ExtractionError> {
        let value = raw.trim();
        if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.malformed(field, raw, "expected an eight digit YYYYMMDD date"));
        }
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .map_err(|e| self.malformed(field, raw, format!("invalid calendar date: {e}")))
    }

    /// `YYYY-MM-DD`, optionally followed by `Z` or a `+HH:MM` offset
    pub fn iso_date(&self, field: &'static str, raw: &str) -> Result<NaiveDate, ExtractionError> {
        let value = raw.trim();
        if value.len() < 10 || !value.is_char_boundary(10) {
            return Err(self.malformed(field, raw, "expected a YYYY-MM-DD date"));
        }
        let (date, offset) = value.split_at(10);
        if !is_utc_offset(offset) {
            return Err(self.malformed(field, raw, "unexpected text after date"));
        }
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| self.malformed(field, raw, format!("invalid calendar date: {e}")))
    }

    /// `DD.MM.YYYY` or `DD/MM/YYYY`
    pub fn day_first_date(
        &self,
        field: &'static str,
        raw: &str,
    ) -> Result<NaiveDate, ExtractionError> {
        let value = raw.trim().trim_end_matches('.');
        NaiveDate::parse_from_str(value, "%d.%m.%Y")
            .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
            .map_err(|_| self.malformed(field, raw, "expected a DD.MM.YYYY date"))
    }

    /// Date split over separate day, month and year elements
    pub fn component_date(
        &self,
        field: &'static str,
        day: &str,
        month: &str,
        year: &str,
    ) -> Result<NaiveDate, ExtractionError> {
        let raw = format!("{}-{}-{}", year.trim(), month.trim(), day.trim());
        let parsed = (
            year.trim().parse::<i32>(),
            month.trim().parse::<u32>(),
            day.trim().parse::<u32>(),
        );
        match parsed {
            (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d)
                .ok_or_else(|| self.malformed(field, &raw, "invalid calendar date")),
            _ => Err(self.malformed(field, &raw, "non-numeric date component")),
        }
    }

    pub fn amount(&self, field: &'static str, raw: &str) -> Result<Decimal, ExtractionError> {
        parse_amount(raw).map_err(|reason| self.malformed(field, raw, reason))
    }

    /// Schema decimal such as a `FMTVAL` attribute or a UBL amount
    pub fn machine_amount(
        &self,
        field: &'static str,
        raw: &str,
    ) -> Result<Decimal, ExtractionError> {
        parse_machine_decimal(raw).map_err(|reason| self.malformed(field, raw, reason))
    }

    pub fn count(&self, field: &'static str, raw: &str) -> Result<u32, ExtractionError> {
        raw.trim()
            .parse::<u32>()
            .map_err(|_| self.malformed(field, raw, "expected a non-negative whole number"))
    }

    /// Explicit yes/no style flag
    pub fn flag(&self, field: &'static str, raw: &str) -> Result<bool, ExtractionError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Ok(true),
            "false" | "no" | "n" | "0" => Ok(false),
            _ => Err(self.malformed(field, raw, "expected a boolean flag")),
        }
    }
}

fn is_utc_offset(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    match bytes {
        [] | [b'Z'] => true,
        [sign, h1, h2, b':', m1, m2] => {
            (*sign == b'+' || *sign == b'-')
                && [h1, h2, m1, m2].iter().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

/// Interpret a monetary amount exactly.
///
/// Spaces (including no-break spaces) are digit grouping. When both `.` and
/// `,` occur, the last one is the decimal separator. A single `,` or `.` is a
/// decimal separator; a repeated one is grouping. A single separator followed
/// by exactly three digits (`16,425`, `1.500`) reads either way and is refused.
pub fn parse_amount(raw: &str) -> Result<Decimal, String> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}' | '\''))
        .collect();

    if compact.is_empty() {
        return Err("empty amount".to_string());
    }
    if !compact.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return Err("unexpected characters in amount".to_string());
    }

    let dots = compact.matches('.').count();
    let commas = compact.matches(',').count();
    let normalized = match (dots, commas) {
        (0, 0) => compact,
        (_, 0) if dots > 1 => compact.replace('.', ""),
        (0, _) if commas > 1 => compact.replace(',', ""),
        (1, 0) | (0, 1) if is_grouping_shaped(&compact) => {
            return Err("ambiguous decimal separator".to_string());
        }
        (1, 0) => compact,
        (0, 1) => compact.replace(',', "."),
        _ => {
            let last_dot = compact.rfind('.').unwrap_or(0);
            let last_comma = compact.rfind(',').unwrap_or(0);
            let (grouping, decimal) = if last_dot > last_comma {
                (',', '.')
            } else {
                ('.', ',')
            };
            if compact.matches(decimal).count() > 1 {
                return Err("ambiguous decimal separator".to_string());
            }
            compact.replace(grouping, "").replace(decimal, ".")
        }
    };

    if normalized.starts_with('.') || normalized.ends_with('.') {
        return Err("dangling decimal separator".to_string());
    }

    Decimal::from_str_exact(&normalized).map_err(|e| format!("not a decimal amount: {e}"))
}

/// Single separator with exactly three digits after it
fn is_grouping_shaped(compact: &str) -> bool {
    compact
        .rsplit_once(['.', ','])
        .is_some_and(|(whole, tail)| !whole.is_empty() && tail.len() == 3)
}

/// `xsd:decimal` lexical form: optional sign, digits, at most one `.`
pub fn parse_machine_decimal(raw: &str) -> Result<Decimal, String> {
    let value = raw.trim();
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    let well_formed = !digits.is_empty()
        && digits.matches('.').count() <= 1
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.');
    if !well_formed {
        return Err("expected a schema decimal such as 1234.56".to_string());
    }
    Decimal::from_str_exact(value.trim_start_matches('+'))
        .map_err(|e| format!("not a decimal amount: {e}"))
}

/// Collapse whitespace runs; blank text is absent
pub fn clean_text(raw: &str) -> Option<String> {
    let joined = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.is_empty() { None } else { Some(joined) }
}

/// Trimmed code value; blank is absent
pub fn clean_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

/// Leading code of a `code - label` pair such as `7 - Contract award`
pub fn leading_code(raw: &str) -> Option<String> {
    raw.split(['-', ' '])
        .map(str::trim)
        .find(|part| !part.is_empty())
        .map(str::to_string)
}
