//! Tolerant scalar decoding for report fields that arrive as numbers or strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{Number, Value};

/// Datetime layouts tried in order; the first successful parse wins.
/// `%.f` also matches an absent fraction.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// A scalar whose JSON type is not trusted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Number(Number),
    Text(String),
    Other(Value),
}

impl Loose {
    pub fn kind(&self) -> &'static str {
        match self {
            Loose::Number(_) => "number",
            Loose::Text(_) => "string",
            Loose::Other(value) => super::json_type_name(value),
        }
    }

    /// Finite float from a number or a numeric string.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Loose::Number(n) => n.as_f64(),
            Loose::Text(s) => s.trim().parse::<f64>().ok(),
            Loose::Other(_) => None,
        }?;
        value.is_finite().then_some(value)
    }

    /// Integer from an integral number, a float without fraction, or a numeric string.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Loose::Number(n) => n
                .as_i64()
                .or_else(|| n.as_u64().and_then(|v| i64::try_from(v).ok()))
                .or_else(|| n.as_f64().and_then(integral)),
            Loose::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(integral))
            }
            Loose::Other(_) => None,
        }
    }

    /// Text as sent; numbers are rendered in their JSON form.
    /// Text columns only take JSON strings; numbers are left empty.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Loose::Text(s) => Some(s.clone()),
            Loose::Number(_) | Loose::Other(_) => None,
        }
    }

    /// Money columns are stored as text: strings verbatim, numbers with two decimals.
    pub fn as_money_text(&self) -> Option<String> {
        match self {
            Loose::Text(s) => Some(s.clone()),
            Loose::Number(n) => n.as_f64().map(|v| format!("{v:.2}")),
            Loose::Other(_) => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        let Loose::Text(raw) = self else {
            return None;
        };
        let raw = raw.trim();
        DATETIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Loose::Text(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .ok()
                .or_else(|| self.as_datetime().map(|dt| dt.date())),
            _ => None,
        }
    }
}

fn integral(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64)
        .then_some(value as i64)
}
