//! Value domains for overridable fields
//!
//! Every selectable field belongs to one [`ValueKind`]. Custom override values
//! arrive as raw strings and are parsed into a [`FieldValue`] of that kind
//! before the field's setter sees them.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// The value domain of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueKind {
    Numeric,
    Date,
    Boolean,
    /// Named variants, in ordinal order
    Enumerated { variants: &'static [&'static str] },
    Text,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Numeric => "numeric",
            ValueKind::Date => "date",
            ValueKind::Boolean => "boolean",
            ValueKind::Enumerated { .. } => "enumerated",
            ValueKind::Text => "text",
        }
    }
}

/// A typed field value moving between getters, setters and the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Numeric(i64),
    Date(Option<NaiveDate>),
    Boolean(bool),
    /// Ordinal into the field's variant list
    Enumerated(usize),
    Text(Option<String>),
}

impl FieldValue {
    /// Zero or absence value of a kind, used for deselected fields
    pub fn zero(kind: &ValueKind) -> FieldValue {
        match kind {
            ValueKind::Numeric => FieldValue::Numeric(0),
            ValueKind::Date => FieldValue::Date(None),
            ValueKind::Boolean => FieldValue::Boolean(false),
            ValueKind::Enumerated { .. } => FieldValue::Enumerated(0),
            ValueKind::Text => FieldValue::Text(None),
        }
    }

    /// Parse an operator-supplied raw value into the given kind
    pub fn parse(kind: &ValueKind, raw: &str) -> Result<FieldValue, String> {
        match kind {
            ValueKind::Numeric => parse_numeric(raw).map(FieldValue::Numeric),
            ValueKind::Date => parse_date(raw).map(|d| FieldValue::Date(Some(d))),
            ValueKind::Boolean => parse_boolean(raw).map(FieldValue::Boolean),
            ValueKind::Enumerated { variants } => {
                parse_enumerated(raw, variants).map(FieldValue::Enumerated)
            }
            ValueKind::Text => Ok(FieldValue::Text(Some(raw.to_string()))),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Numeric(_) => "numeric",
            FieldValue::Date(_) => "date",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Enumerated(_) => "enumerated",
            FieldValue::Text(_) => "text",
        }
    }

    fn mismatch(&self, expected: &str) -> String {
        format!("expected a {} value, got {}", expected, self.kind_name())
    }

    pub fn into_text(self) -> Result<Option<String>, String> {
        match self {
            FieldValue::Text(text) => Ok(text),
            other => Err(other.mismatch("text")),
        }
    }

    pub fn into_date(self) -> Result<Option<NaiveDate>, String> {
        match self {
            FieldValue::Date(date) => Ok(date),
            other => Err(other.mismatch("date")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, String> {
        match self {
            FieldValue::Boolean(b) => Ok(*b),
            other => Err(other.mismatch("boolean")),
        }
    }

    pub fn as_ordinal(&self) -> Result<usize, String> {
        match self {
            FieldValue::Enumerated(ordinal) => Ok(*ordinal),
            other => Err(other.mismatch("enumerated")),
        }
    }

    pub fn as_u32(&self) -> Result<u32, String> {
        match self {
            FieldValue::Numeric(n) => {
                u32::try_from(*n).map_err(|_| format!("{} is outside 0..={}", n, u32::MAX))
            }
            other => Err(other.mismatch("numeric")),
        }
    }

    pub fn as_i32(&self) -> Result<i32, String> {
        match self {
            FieldValue::Numeric(n) => i32::try_from(*n)
                .map_err(|_| format!("{} is outside {}..={}", n, i32::MIN, i32::MAX)),
            other => Err(other.mismatch("numeric")),
        }
    }

    pub fn as_u64(&self) -> Result<u64, String> {
        match self {
            FieldValue::Numeric(n) => u64::try_from(*n).map_err(|_| format!("{} is negative", n)),
            other => Err(other.mismatch("numeric")),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Numeric(n) => write!(f, "{}", n),
            FieldValue::Date(Some(d)) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Date(None) => Ok(()),
            FieldValue::Boolean(true) => write!(f, "True"),
            FieldValue::Boolean(false) => write!(f, "False"),
            FieldValue::Enumerated(ordinal) => write!(f, "{}", ordinal),
            FieldValue::Text(Some(text)) => write!(f, "{}", text),
            FieldValue::Text(None) => Ok(()),
        }
    }
}

fn parse_numeric(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(n);
    }
    match raw.parse::<f64>() {
        Ok(d) if d.is_finite() && d.fract() == 0.0 && d.abs() < i64::MAX as f64 => Ok(d as i64),
        Ok(_) => Err("expected a whole number".to_string()),
        Err(_) => Err("expected a number".to_string()),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(stamp.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|stamp| stamp.date())
        .map_err(|_| "expected a calendar date (YYYY-MM-DD)".to_string())
}

fn parse_boolean(raw: &str) -> Result<bool, String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err("expected 'True' or 'False'".to_string())
    }
}

/// Symbolic names are preferred; all-digit input is read as an ordinal
fn parse_enumerated(raw: &str, variants: &[&str]) -> Result<usize, String> {
    let raw = raw.trim();
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        return match raw.parse::<usize>() {
            Ok(ordinal) if ordinal < variants.len() => Ok(ordinal),
            _ => Err(format!("ordinal {} is outside 0..{}", raw, variants.len())),
        };
    }
    variants
        .iter()
        .position(|v| v.eq_ignore_ascii_case(raw))
        .ok_or_else(|| format!("expected one of [{}]", variants.join(", ")))
}
