// SPDX-License-Identifier: MIT

//! Normalization helpers for observed and expected values
//!
//! Values are `serde_json::Value`: null, bool, number, string, array or
//! object. All numeric work is done in `f64`; integers beyond 2^53 lose
//! precision and compare as their nearest `f64`.

use serde_json::Value;

const DESCRIBE_LIMIT: usize = 80;

/// Numeric view of a value: numbers, and strings that parse as a finite number
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Text view of a scalar; `None` for null, arrays and objects
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Name of the value's type, for messages
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Short human-readable rendering of a value
pub fn describe(value: &Value) -> String {
    let text = match value {
        Value::String(s) => format!("'{}'", s),
        other => other.to_string(),
    };
    if text.chars().count() > DESCRIBE_LIMIT {
        let truncated: String = text.chars().take(DESCRIBE_LIMIT).collect();
        format!("{}...", truncated)
    } else {
        text
    }
}

/// Equality after normalization.
///
/// Both sides numeric (including numeric text) compare as `f64`; other scalars
/// compare by their text form; arrays and objects compare element-wise with
/// the same rules.
pub fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loosely_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            let same = |(k, v): (&String, &Value)| b.get(k).is_some_and(|o| loosely_equal(v, o));
            a.len() == b.len() && a.iter().all(same)
        }
        (Value::Array(_), _) | (_, Value::Array(_)) => false,
        (Value::Object(_), _) | (_, Value::Object(_)) => false,
        (l, r) => match (as_number(l), as_number(r)) {
            (Some(a), Some(b)) => a == b,
            _ => as_text(l) == as_text(r),
        },
    }
}
