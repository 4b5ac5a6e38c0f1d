//! FILENAME: core/cells/src/number_format.rs
//! PURPOSE: Number formatting utilities for displaying field values.
//! CONTEXT: This module handles the conversion of raw values to formatted
//! display strings based on a field's `FormatSpec`. Formatting is applied on
//! read (per displayed cell); it is never baked into engine state.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::cell::CellValue;
use crate::style::TextAlign;

const NBSP: &str = "\u{a0}";
const NARROW_NBSP: &str = "\u{202f}";
const MAX_DECIMALS: u8 = 20;

/// The kind of display format for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FormatType {
    Currency,
    #[default]
    Number,
    Percentage,
    Date,
}

/// Per-field formatting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatSpec {
    #[serde(rename = "type")]
    pub format_type: FormatType,
    /// Fraction digits. Defaults: 0 for numbers and percentages, the
    /// currency's minor units for currencies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    /// ISO 4217 code, e.g. "USD".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// BCP 47 tag, e.g. "en-US", "de-DE".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thousand_separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimal_separator: Option<String>,
    /// Placeholder for null/missing values (default: empty string).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub null_value: Option<String>,
    /// chrono strftime pattern for `Date` formats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
}

impl FormatSpec {
    pub fn number(decimals: u8) -> Self {
        FormatSpec {
            format_type: FormatType::Number,
            decimals: Some(decimals),
            ..Default::default()
        }
    }

    pub fn currency(code: impl Into<String>, decimals: u8) -> Self {
        FormatSpec {
            format_type: FormatType::Currency,
            decimals: Some(decimals),
            currency: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn percentage(decimals: u8) -> Self {
        FormatSpec {
            format_type: FormatType::Percentage,
            decimals: Some(decimals),
            ..Default::default()
        }
    }

    pub fn date() -> Self {
        FormatSpec {
            format_type: FormatType::Date,
            ..Default::default()
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_separators(mut self, thousand: impl Into<String>, decimal: impl Into<String>) -> Self {
        self.thousand_separator = Some(thousand.into());
        self.decimal_separator = Some(decimal.into());
        self
    }

    pub fn with_null_value(mut self, placeholder: impl Into<String>) -> Self {
        self.null_value = Some(placeholder.into());
        self
    }

    pub fn with_date_format(mut self, pattern: impl Into<String>) -> Self {
        self.date_format = Some(pattern.into());
        self
    }

    /// Whether values rendered with this spec are numeric.
    pub fn is_numeric(&self) -> bool {
        !matches!(self.format_type, FormatType::Date)
    }
}

// ============================================================================
// LOCALE TABLE
// ============================================================================

/// Separators and layout conventions for a locale.
#[derive(Debug, Clone, Copy)]
struct LocaleSymbols {
    group: &'static str,
    decimal: &'static str,
    currency_after: bool,
    currency_space: &'static str,
    percent_space: &'static str,
    date_pattern: &'static str,
}

const EN_US: LocaleSymbols = LocaleSymbols {
    group: ",",
    decimal: ".",
    currency_after: false,
    currency_space: "",
    percent_space: "",
    date_pattern: "%-m/%-d/%Y",
};

fn locale_symbols(locale: Option<&str>) -> LocaleSymbols {
    let tag = locale.unwrap_or("en-US").replace('_', "-");
    let mut parts = tag.split('-');
    let language = parts.next().unwrap_or("en").to_ascii_lowercase();
    let region = parts.next().map(|r| r.to_ascii_uppercase());

    match (language.as_str(), region.as_deref()) {
        ("en", Some("US")) | ("en", None) => EN_US,
        ("en", _) => LocaleSymbols { date_pattern: "%d/%m/%Y", ..EN_US },
        ("de", _) => LocaleSymbols {
            group: ".",
            decimal: ",",
            currency_after: true,
            currency_space: NBSP,
            percent_space: NBSP,
            date_pattern: "%-d.%-m.%Y",
        },
        ("es", _) | ("it", _) => LocaleSymbols {
            group: ".",
            decimal: ",",
            currency_after: true,
            currency_space: NBSP,
            percent_space: NBSP,
            date_pattern: "%-d/%-m/%Y",
        },
        ("nl", _) => LocaleSymbols {
            group: ".",
            decimal: ",",
            currency_after: false,
            currency_space: NBSP,
            percent_space: "",
            date_pattern: "%-d-%-m-%Y",
        },
        ("pt", _) => LocaleSymbols {
            group: ".",
            decimal: ",",
            currency_after: false,
            currency_space: NBSP,
            percent_space: "",
            date_pattern: "%d/%m/%Y",
        },
        ("fr", _) => LocaleSymbols {
            group: NARROW_NBSP,
            decimal: ",",
            currency_after: true,
            currency_space: NBSP,
            percent_space: NARROW_NBSP,
            date_pattern: "%d/%m/%Y",
        },
        ("ja", _) | ("zh", _) => LocaleSymbols { date_pattern: "%Y/%-m/%-d", ..EN_US },
        _ => EN_US,
    }
}

fn currency_symbol(code: &str) -> Option<&'static str> {
    match code.to_ascii_uppercase().as_str() {
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "JPY" => Some("¥"),
        "INR" => Some("₹"),
        "CNY" => Some("CN¥"),
        "KRW" => Some("₩"),
        "CAD" => Some("CA$"),
        "AUD" => Some("A$"),
        _ => None,
    }
}

fn currency_minor_units(code: &str) -> u8 {
    match code.to_ascii_uppercase().as_str() {
        "JPY" | "KRW" => 0,
        _ => 2,
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Formats a value according to `spec`. Null/missing values become the
/// spec's placeholder; non-numeric text passes through unchanged.
pub fn format_value(value: &CellValue, spec: &FormatSpec) -> String {
    match value {
        CellValue::Empty => spec.null_value.clone().unwrap_or_default(),
        CellValue::Date(_) => format_date_value(value, spec),
        _ if spec.format_type == FormatType::Date => format_date_value(value, spec),
        _ => match value.as_number() {
            Some(n) => format_number(n, spec),
            None => value.display_value(),
        },
    }
}

/// Formats a number according to `spec` (dates are treated as epoch millis).
pub fn format_number(value: f64, spec: &FormatSpec) -> String {
    if !value.is_finite() {
        return format_non_finite(value);
    }

    let symbols = locale_symbols(spec.locale.as_deref());
    let group = spec.thousand_separator.as_deref().unwrap_or(symbols.group);
    let decimal = spec.decimal_separator.as_deref().unwrap_or(symbols.decimal);

    match spec.format_type {
        FormatType::Number => format_decimal(value, spec.decimals.unwrap_or(0), group, decimal),
        FormatType::Percentage => {
            let body = format_decimal(value * 100.0, spec.decimals.unwrap_or(0), group, decimal);
            format!("{}{}%", body, symbols.percent_space)
        }
        FormatType::Currency => {
            let code = spec.currency.as_deref().unwrap_or("USD");
            let decimals = spec.decimals.unwrap_or_else(|| currency_minor_units(code));
            format_currency(value, decimals, code, symbols, group, decimal)
        }
        FormatType::Date => format_date_value(&CellValue::Number(value), spec),
    }
}

// ============================================================================
// NUMBERS
// ============================================================================

/// Rounds half away from zero and renders with grouped digits.
fn format_decimal(value: f64, decimals: u8, group: &str, decimal: &str) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    let rounded = round_half_away(value, decimals);
    let body = format!("{:.prec$}", rounded.abs(), prec = decimals as usize);
    let grouped = group_digits(&body, group, decimal);

    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn round_half_away(value: f64, decimals: u8) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    let rounded = scaled.round() / factor;
    // Avoid "-0.00"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Add thousands separators to an unsigned numeric string.
fn group_digits(s: &str, group: &str, decimal: &str) -> String {
    let (integer_part, decimal_part) = match s.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (s, None),
    };

    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let len = integer_part.len();

    for (i, c) in integer_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push_str(group);
        }
        result.push(c);
    }

    if let Some(frac) = decimal_part {
        result.push_str(decimal);
        result.push_str(frac);
    }

    result
}

fn format_currency(
    value: f64,
    decimals: u8,
    code: &str,
    symbols: LocaleSymbols,
    group: &str,
    decimal: &str,
) -> String {
    let rounded = round_half_away(value, decimals.min(MAX_DECIMALS));
    let body = format_decimal(rounded.abs(), decimals, group, decimal);
    let sign = if rounded < 0.0 { "-" } else { "" };

    let (symbol, space) = match currency_symbol(code) {
        Some(symbol) => (symbol.to_string(), symbols.currency_space),
        None => (code.to_ascii_uppercase(), NBSP),
    };

    if symbols.currency_after {
        format!("{}{}{}{}", sign, body, NBSP, symbol)
    } else {
        format!("{}{}{}{}", sign, symbol, space, body)
    }
}

fn format_non_finite(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value > 0.0 {
        "∞".to_string()
    } else {
        "-∞".to_string()
    }
}

// ============================================================================
// DATES
// ============================================================================

fn format_date_value(value: &CellValue, spec: &FormatSpec) -> String {
    let Some(dt) = to_datetime(value) else {
        return value.display_value();
    };

    let symbols = locale_symbols(spec.locale.as_deref());
    if let Some(pattern) = spec.date_format.as_deref() {
        let mut out = String::new();
        if write!(out, "{}", dt.format(pattern)).is_ok() {
            return out;
        }
    }
    dt.format(symbols.date_pattern).to_string()
}

fn to_datetime(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::Date(dt) => Some(*dt),
        CellValue::Number(ms) if ms.is_finite() => {
            DateTime::from_timestamp_millis(*ms as i64).map(|dt| dt.naive_utc())
        }
        CellValue::Text(s) => parse_date_text(s.trim()),
        _ => None,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, pattern) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_en_us() {
        let spec = FormatSpec::currency("USD", 2).with_locale("en-US");
        assert_eq!(format_value(&CellValue::Number(1234.5), &spec), "$1,234.50");
        assert_eq!(format_value(&CellValue::Number(-1234.5), &spec), "-$1,234.50");
    }

    #[test]
    fn currency_defaults_to_minor_units() {
        let spec = FormatSpec {
            format_type: FormatType::Currency,
            currency: Some("JPY".into()),
            ..Default::default()
        };
        assert_eq!(format_number(1234.4, &spec), "¥1,234");

        let usd = FormatSpec {
            format_type: FormatType::Currency,
            ..Default::default()
        };
        assert_eq!(format_number(3.0, &usd), "$3.00");
    }

    #[test]
    fn currency_german_symbol_after() {
        let spec = FormatSpec::currency("EUR", 2).with_locale("de-DE");
        assert_eq!(format_number(1234.5, &spec), "1.234,50\u{a0}€");
    }

    #[test]
    fn unknown_currency_uses_code() {
        let spec = FormatSpec::currency("chf", 2);
        assert_eq!(format_number(10.0, &spec), "CHF\u{a0}10.00");
    }

    #[test]
    fn number_grouping_and_rounding() {
        let spec = FormatSpec::number(2);
        assert_eq!(format_number(1234567.891, &spec), "1,234,567.89");
        assert_eq!(format_number(-0.004, &spec), "0.00");
        assert_eq!(format_number(2.5, &FormatSpec::number(0)), "3");
        assert_eq!(format_number(999.0, &FormatSpec::default()), "999");
    }

    #[test]
    fn explicit_separators_override_locale() {
        let spec = FormatSpec::number(1).with_separators(" ", ",");
        assert_eq!(format_number(1234567.25, &spec), "1 234 567,3");
    }

    #[test]
    fn percentage_multiplies_by_hundred() {
        assert_eq!(format_number(0.256, &FormatSpec::percentage(1)), "25.6%");
        assert_eq!(format_number(0.5, &FormatSpec::percentage(0)), "50%");
    }

    #[test]
    fn null_value_placeholder() {
        let spec = FormatSpec::number(2).with_null_value("-");
        assert_eq!(format_value(&CellValue::Empty, &spec), "-");
        assert_eq!(format_value(&CellValue::Empty, &FormatSpec::default()), "");
    }

    #[test]
    fn text_passes_through_numeric_text_formats() {
        let spec = FormatSpec::number(1);
        assert_eq!(format_value(&CellValue::text("North"), &spec), "North");
        assert_eq!(format_value(&CellValue::text("12"), &spec), "12.0");
    }

    #[test]
    fn dates_use_locale_default_or_pattern() {
        let value = CellValue::date(2024, 1, 5).unwrap();
        assert_eq!(format_value(&value, &FormatSpec::date()), "1/5/2024");
        assert_eq!(format_value(&value, &FormatSpec::date().with_locale("de-DE")), "5.1.2024");
        assert_eq!(
            format_value(&CellValue::text("2024-01-05"), &FormatSpec::date().with_date_format("%Y.%m.%d")),
            "2024.01.05"
        );
        assert_eq!(format_value(&CellValue::text("soon"), &FormatSpec::date()), "soon");
    }

    #[test]
    fn non_finite_numbers() {
        assert_eq!(format_number(f64::NAN, &FormatSpec::default()), "NaN");
        assert_eq!(format_number(f64::INFINITY, &FormatSpec::default()), "∞");
    }

    #[test]
    fn spec_deserializes_from_camel_case() {
        let spec: FormatSpec = serde_json::from_str(
            r#"{"type":"currency","currency":"USD","decimals":2,"nullValue":"n/a"}"#,
        )
        .unwrap();
        assert_eq!(spec.format_type, FormatType::Currency);
        assert_eq!(spec.null_value.as_deref(), Some("n/a"));
        assert!(spec.is_numeric());
    }
}
