//! Lenient coercion of stored/wire JSON into domain values.
//!
//! Rows coming from either backend may be missing fields or carry them with the
//! wrong JSON type (numbers as strings, nested lists as JSON-encoded strings).
//! Every helper here is total: it returns `None` or a default instead of
//! failing, so one bad field never drops a whole read.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::models::BetEvent;

/// First of `names` present in the row with a non-null value.
pub fn field<'a>(row: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| row.get(*name).filter(|v| !v.is_null()))
}

pub fn coerce_decimal(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim().replace(',', ".");
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .ok()
}

pub fn coerce_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .and_then(|f| f.to_i64())
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn coerce_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// RFC 3339, a naive `YYYY-MM-DD[T ]HH:MM:SS[.f]` taken as UTC, or epoch millis.
pub fn coerce_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decimal_to_json(d: Decimal) -> Value {
    d.to_f64().map(Value::from).unwrap_or(Value::Null)
}

/// Events arrive as a JSON array or as a JSON-encoded string of one.
/// Non-object entries are dropped; a missing coefficient counts as 1.
pub fn decode_events(value: Option<&Value>) -> Vec<BetEvent> {
    let decoded;
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => {
                decoded = items;
                &decoded
            }
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| BetEvent {
            name: coerce_string(field(item, &["name"])).unwrap_or_default(),
            market: coerce_string(field(item, &["market"])).unwrap_or_default(),
            coef: coerce_decimal(field(item, &["coef"])).unwrap_or(Decimal::ONE),
        })
        .collect()
}

/// JSON-encode events for transport in a single text column.
pub fn encode_events(events: &[BetEvent]) -> String {
    Value::Array(
        events
            .iter()
            .map(|e| {
                json!({
                    "name": e.name,
                    "market": e.market,
                    "coef": decimal_to_json(e.coef),
                })
            })
            .collect(),
    )
    .to_string()
}
