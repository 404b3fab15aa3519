use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// Coerces a provider value into a number. Missing, null, empty, zero and
/// unparseable values all map to `None`, whether the provider sent a JSON
/// number or a string.
pub(crate) fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| *v != 0.0 && v.is_finite())
}

/// Trimmed, non-empty text. Numbers are rendered so ids survive either encoding.
pub(crate) fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn alphabetic(value: &str) -> Option<String> {
    let unit: String = value.chars().filter(|c| c.is_alphabetic()).collect();
    (!unit.is_empty()).then_some(unit)
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
pub(crate) fn timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
