//! JSON body filter grammar: `{"age >=": 21, "OR name": "bob"}`.

use serde_json::Value;

use super::error::FilterError;
use super::types::{split_conjunction, Directive, FilterCondition, FilterOp, FilterSet};

/// Operator suffixes, longest first so `!=` is never read as `=`
const SUFFIXES: [(&str, FilterOp); 7] = [
    ("!=", FilterOp::Neq),
    ("<=", FilterOp::Lte),
    (">=", FilterOp::Gte),
    ("!", FilterOp::Neq),
    ("<", FilterOp::Lt),
    (">", FilterOp::Gt),
    ("=", FilterOp::Eq),
];

/// Decode a raw request body and parse it. An empty body is an empty filter set.
pub fn parse_json_bytes(body: &[u8]) -> Result<FilterSet, FilterError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FilterSet::default());
    }
    let value: Value = serde_json::from_slice(body)?;
    parse_json_body(&value)
}

/// Parse an already decoded body. Keys keep their document order.
pub fn parse_json_body(body: &Value) -> Result<FilterSet, FilterError> {
    let object = match body {
        Value::Null => return Ok(FilterSet::default()),
        Value::Object(object) => object,
        _ => return Err(FilterError::NotAnObject),
    };

    let mut set = FilterSet::default();
    for (key, value) in object {
        if let Some(directive) = Directive::from_key(key) {
            if let Some(text) = scalar_text(value) {
                set.apply_directive(directive, &text);
            }
            continue;
        }

        let (conjunction, rest) = split_conjunction(key);
        let (column, operator) = split_operator(rest);
        if column.is_empty() {
            return Err(FilterError::EmptyColumn(key.clone()));
        }

        let value = scalar_text(value).ok_or_else(|| FilterError::UnsupportedValue(key.clone()))?;

        set.conditions.push(FilterCondition {
            column: column.to_string(),
            operator,
            value,
            conjunction,
        });
    }

    Ok(set)
}

fn split_operator(key: &str) -> (&str, FilterOp) {
    for (suffix, operator) in SUFFIXES {
        if let Some(column) = key.strip_suffix(suffix) {
            return (column.trim_end(), operator);
        }
    }
    (key, FilterOp::Eq)
}

/// Text form bound into SQL. Booleans follow MySQL's TINYINT(1) convention.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
