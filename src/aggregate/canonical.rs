//! Canonical answer keys
//!
//! - string: itself
//! - number: shortest exact decimal text, never an exponent (`5`, `2.5`)
//! - list: elements canonicalised and joined with `|`
//! - anything else: compact JSON (object keys sorted)
//!
//! The list join is ambiguous when an element itself contains `|`:
//! `["a|b"]` and `["a", "b"]` share the key `a|b`. Existing exports depend
//! on this encoding, so it is kept as is.

use serde_json::Value;

use crate::schema::AnswerValue;

/// Separator between canonicalised list elements
pub const LIST_SEPARATOR: &str = "|";

/// Deterministic key used to bucket identical answer values.
pub fn canonical_key(value: &AnswerValue) -> String {
    match value {
        AnswerValue::Text(s) => s.clone(),
        AnswerValue::Number(n) => number_key(*n),
        AnswerValue::Choices(items) => items.join(LIST_SEPARATOR),
        AnswerValue::Other(raw) => json_key(raw),
    }
}

fn number_key(n: f64) -> String {
    // f64's Display is the shortest round-tripping decimal without exponent.
    format!("{}", n)
}

fn json_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map(number_key).unwrap_or_else(|| n.to_string())
            }
        }
        Value::Array(items) => items
            .iter()
            .map(json_key)
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR),
        other => other.to_string(),
    }
}
