use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::builtins::Function;
use crate::error::ErrorKind;
use crate::provider::DataPoint;

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Handle(Handle),
}

/// Values that stand for a capability rather than plain data.
///
/// Handles survive variable assignment; [`resolve`](crate::eval::resolve)
/// turns the resolvable ones (counter, data point, aggregate) into data.
#[derive(Debug, Clone, PartialEq)]
pub enum Handle {
    Global,
    Storage,
    Counter(String),
    Series(String),
    DataPoint(DataPoint),
    Aggregate(Vec<DataPoint>),
    Function(Box<Function>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Handle(Handle::Global) => "global",
            Value::Handle(Handle::Storage) => "storage",
            Value::Handle(Handle::Counter(_)) => "counter",
            Value::Handle(Handle::Series(_)) => "series",
            Value::Handle(Handle::DataPoint(_)) => "data point",
            Value::Handle(Handle::Aggregate(_)) => "aggregate",
            Value::Handle(Handle::Function(_)) => "function",
        }
    }

    /// Converts plain data to JSON. Handles and non-finite numbers have no
    /// JSON form.
    pub fn to_json(&self) -> Result<serde_json::Value, ErrorKind> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .ok_or_else(|| ErrorKind::InvalidNumber(n.to_string()))?,
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect::<Result<_, _>>()?)
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| v.to_json().map(|json| (k.clone(), json)))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Handle(_) => return Err(ErrorKind::NotEvaluable(self.to_string())),
        })
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Handle> for Value {
    fn from(handle: Handle) -> Self {
        Value::Handle(handle)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "{:?}", s),
        other => write!(f, "{}", other),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_quoted(f, item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: ", key)?;
                    write_quoted(f, value)?;
                }
                write!(f, "}}")
            }
            Value::Handle(handle) => write!(f, "{}", handle),
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Global => write!(f, "Global"),
            Handle::Storage => write!(f, "Storage"),
            Handle::Counter(name) => write!(f, "Counter({})", name),
            Handle::Series(name) => write!(f, "Series({})", name),
            Handle::DataPoint(point) => write!(f, "DataPoint({}, {})", point.timestamp, point.value),
            Handle::Aggregate(points) => write!(f, "Aggregate({} points)", points.len()),
            Handle::Function(function) => write!(f, "{}()", function.name()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Handle(handle) => serializer.collect_str(handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_numbers_without_fraction() {
        assert_eq!(Value::Number(133.0).to_string(), "133");
        assert_eq!(Value::Number(-1.5).to_string(), "-1.5");
    }

    #[test]
    fn test_display_collections() {
        let value = Value::Array(vec![Value::Number(1.0), Value::from("a"), Value::Null]);
        assert_eq!(value.to_string(), "[1, \"a\", null]");

        let mut map = BTreeMap::new();
        map.insert("b".to_string(), Value::Boolean(true));
        map.insert("a".to_string(), Value::from("x"));
        assert_eq!(Value::Map(map).to_string(), "{\"a\": \"x\", \"b\": true}");
    }

    #[test]
    fn test_serialize_to_json() {
        let value = Value::Array(vec![Value::Number(1.0), Value::from("a"), Value::Boolean(false)]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "[1.0,\"a\",false]");
    }

    #[test]
    fn test_serialize_handle_as_string() {
        let value = Value::Handle(Handle::Counter("hits".into()));
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"Counter(hits)\"");
    }

    #[test]
    fn test_from_json_object() {
        let json = serde_json::json!({"code": 200, "tags": ["a"], "ok": true});
        match Value::from(json) {
            Value::Map(map) => {
                assert_eq!(map["code"], Value::Number(200.0));
                assert_eq!(map["tags"], Value::Array(vec![Value::from("a")]));
                assert_eq!(map["ok"], Value::Boolean(true));
            }
            other => panic!("Expected Map, got {:?}", other),
        }
    }

    #[test]
    fn test_to_json_rejects_handles() {
        assert!(Value::Handle(Handle::Global).to_json().is_err());
        assert!(Value::Number(f64::NAN).to_json().is_err());
        assert_eq!(Value::Number(2.0).to_json().unwrap(), serde_json::json!(2.0));
    }
}
