//! Conversions applied by operators and argument binding.
//!
//! All functions expect values that have already been resolved; a handle
//! that reaches them is reported as the wrong type.

use crate::error::ErrorKind;
use crate::value::Value;

pub fn to_number(value: &Value) -> Result<f64, ErrorKind> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::String(s) => s.parse::<f64>().map_err(|_| ErrorKind::InvalidNumber(s.clone())),
        other => Err(ErrorKind::InvalidNumber(other.to_string())),
    }
}

/// Numbers are true when non-zero. Strings that parse as numbers follow the
/// same rule; any other string is true when non-empty.
pub fn to_boolean(value: &Value) -> Result<bool, ErrorKind> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Number(n) => Ok(*n != 0.0),
        Value::String(s) => match s.parse::<f64>() {
            Ok(n) => Ok(n != 0.0),
            Err(_) => Ok(!s.is_empty()),
        },
        other => Err(ErrorKind::InvalidBoolean(other.to_string())),
    }
}

pub fn to_text(value: &Value) -> String {
    value.to_string()
}

pub fn to_numbers(value: &Value) -> Result<Vec<f64>, ErrorKind> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                to_number(item).map_err(|e| ErrorKind::NonNumericElement {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect(),
        other => Err(ErrorKind::TypeMismatch {
            expected: "an array",
            found: other.to_string(),
        }),
    }
}

/// `==` semantics: two booleans compare as booleans, two numeric-coercible
/// values compare as numbers, anything else compares structurally.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    if let (Value::Boolean(l), Value::Boolean(r)) = (left, right) {
        return l == r;
    }
    if !matches!(left, Value::Boolean(_)) && !matches!(right, Value::Boolean(_)) {
        if let (Ok(l), Ok(r)) = (to_number(left), to_number(right)) {
            return l == r;
        }
    }
    left == right
}
