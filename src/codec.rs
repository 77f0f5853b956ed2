//! Coercion of submitted values (strings, string lists, arbitrary JSON) into field representations.

use crate::error::CodecError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Text form of a submitted value. Lists yield their first non-empty element.
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(to_string)
            .find(|s| !s.is_empty())
            .unwrap_or_default(),
        Value::Object(_) => value.to_string(),
    }
}

pub fn to_int(value: &Value) -> Result<i64, CodecError> {
    if let Value::Number(n) = value {
        if let Some(i) = n.as_i64() {
            return Ok(i);
        }
        if let Some(f) = n.as_f64() {
            return Ok(f as i64);
        }
    }
    let s = to_string(value);
    let s = s.trim();
    if s.is_empty() {
        return Ok(0);
    }
    s.parse::<i64>().map_err(|_| CodecError::NotNumber(s.to_string()))
}

pub fn to_uint(value: &Value) -> Result<u64, CodecError> {
    if let Value::Number(n) = value {
        if let Some(u) = n.as_u64() {
            return Ok(u);
        }
    }
    let s = to_string(value);
    let s = s.trim();
    if s.is_empty() {
        return Ok(0);
    }
    s.parse::<u64>().map_err(|_| CodecError::NotNumber(s.to_string()))
}

pub fn to_float(value: &Value) -> Result<f64, CodecError> {
    if let Value::Number(n) = value {
        if let Some(f) = n.as_f64() {
            return Ok(f);
        }
    }
    let s = to_string(value);
    let s = s.trim();
    if s.is_empty() {
        return Ok(0.0);
    }
    s.parse::<f64>().map_err(|_| CodecError::NotNumber(s.to_string()))
}

/// Only the literal `true` is truthy.
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        other => to_string(other) == "true",
    }
}

/// Every non-empty element as text. A scalar becomes a one-element list.
pub fn to_array(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(to_string)
            .filter(|s| !s.is_empty())
            .collect(),
        other => {
            let s = to_string(other);
            if s.is_empty() {
                Vec::new()
            } else {
                vec![s]
            }
        }
    }
}

/// Parses a submitted time with `format`, then date-only, then RFC 3339. Empty input means "clear".
pub fn parse_time(input: &str, format: &str) -> Result<Option<DateTime<Utc>>, CodecError> {
    let s = input.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
        return Ok(Some(Utc.from_utc_datetime(&naive)));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(Utc.from_utc_datetime(&naive)));
        }
    }
    DateTime::parse_from_rfc3339(s)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|_| CodecError::InvalidTime(s.to_string()))
}

/// Canonical text form of a time inside records.
pub fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}
