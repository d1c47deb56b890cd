//! Method tables for every value and capability kind.
//!
//! Property access on a value looks the name up in the table for the value's
//! kind and yields a bound [`Function`]; calling it binds the arguments
//! against the method's declared [`Param`]s and dispatches to the kind's
//! module.

mod array;
mod counter;
mod global;
mod map;
mod series;
mod storage;
mod string;

use std::collections::BTreeMap;

pub use array::ArrayMethod;
pub use counter::CounterMethod;
pub use global::GlobalMethod;
pub use map::MapMethod;
pub use series::{parse_interval, SeriesMethod};
pub use storage::StorageMethod;
pub use string::StringMethod;

use crate::coerce;
use crate::context::ExecutionContext;
use crate::error::ErrorKind;
use crate::provider::DataPoint;
use crate::value::{Handle, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    String,
    Numeric,
    Boolean,
    Array,
    NumericArray,
    Map,
    Any,
}

impl ArgKind {
    fn coerce(self, value: Value) -> Result<Value, ErrorKind> {
        Ok(match self {
            ArgKind::String => Value::String(coerce::to_text(&value)),
            ArgKind::Numeric => Value::Number(coerce::to_number(&value)?),
            ArgKind::Boolean => Value::Boolean(coerce::to_boolean(&value)?),
            ArgKind::NumericArray => Value::Array(coerce::to_numbers(&value)?.into_iter().map(Value::Number).collect()),
            ArgKind::Array => match value {
                Value::Array(_) => value,
                other => {
                    return Err(ErrorKind::TypeMismatch {
                        expected: "an array",
                        found: other.to_string(),
                    })
                }
            },
            ArgKind::Map => match value {
                Value::Map(_) => value,
                other => {
                    return Err(ErrorKind::TypeMismatch {
                        expected: "a map",
                        found: other.to_string(),
                    })
                }
            },
            ArgKind::Any => value,
        })
    }
}

/// A declared method parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
}

impl Param {
    pub const fn required(name: &'static str, kind: ArgKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: ArgKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Arguments after binding: every value already has its declared kind.
#[derive(Debug, Default)]
pub struct Arguments {
    function: String,
    values: BTreeMap<&'static str, Value>,
}

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    fn missing(&self, name: &str) -> ErrorKind {
        ErrorKind::MissingArgument {
            function: self.function.clone(),
            argument: name.to_string(),
        }
    }

    pub fn invalid(&self, name: &str, reason: impl Into<String>) -> ErrorKind {
        ErrorKind::InvalidArgument {
            function: self.function.clone(),
            argument: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn value(&self, name: &str) -> Result<&Value, ErrorKind> {
        self.get(name).ok_or_else(|| self.missing(name))
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn str(&self, name: &str) -> Result<&str, ErrorKind> {
        self.opt_str(name).ok_or_else(|| self.missing(name))
    }

    pub fn opt_number(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(Value::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Result<f64, ErrorKind> {
        self.opt_number(name).ok_or_else(|| self.missing(name))
    }

    pub fn opt_boolean(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(Value::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn opt_map(&self, name: &str) -> Option<&BTreeMap<String, Value>> {
        match self.get(name) {
            Some(Value::Map(map)) => Some(map),
            _ => None,
        }
    }

    pub fn map(&self, name: &str) -> Result<&BTreeMap<String, Value>, ErrorKind> {
        self.opt_map(name).ok_or_else(|| self.missing(name))
    }

    pub fn numbers(&self, name: &str) -> Result<Vec<f64>, ErrorKind> {
        coerce::to_numbers(self.value(name)?)
    }

    /// A numeric argument as a non-negative whole count.
    pub fn count(&self, name: &str) -> Result<usize, ErrorKind> {
        let n = self.number(name)?;
        if n < 0.0 || !n.is_finite() {
            return Err(self.invalid(name, format!("expected a non-negative count, got {}", n)));
        }
        Ok(n as usize)
    }
}

/// Matches call arguments to `params`.
///
/// Named arguments must be declared. An unnamed argument is only accepted
/// when it is the sole argument and the method takes exactly one parameter.
pub fn bind(function: &str, params: &[Param], arguments: Vec<(Option<String>, Value)>) -> Result<Arguments, ErrorKind> {
    let mut bound = Arguments {
        function: function.to_string(),
        values: BTreeMap::new(),
    };
    let count = arguments.len();

    for (name, value) in arguments {
        let param = match name {
            Some(name) => params
                .iter()
                .find(|p| p.name == name)
                .ok_or_else(|| ErrorKind::UnexpectedArgument {
                    function: function.to_string(),
                    argument: name.clone(),
                })?,
            None => match params {
                [only] if count == 1 => only,
                _ => {
                    return Err(ErrorKind::UnnamedArgument {
                        function: function.to_string(),
                    })
                }
            },
        };
        let value = param.kind.coerce(value).map_err(|e| bound.invalid(param.name, e.to_string()))?;
        bound.values.insert(param.name, value);
    }

    if let Some(param) = params.iter().find(|p| p.required && !bound.values.contains_key(p.name)) {
        return Err(bound.missing(param.name));
    }
    Ok(bound)
}

/// A method bound to its receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    Global(GlobalMethod),
    Counter(String, CounterMethod),
    Series(String, SeriesMethod),
    Storage(StorageMethod),
    String(String, StringMethod),
    Array(Vec<Value>, ArrayMethod),
    Map {
        map: BTreeMap<String, Value>,
        /// Variable the map was read from; `set` writes back to it.
        origin: Option<String>,
        method: MapMethod,
    },
}

impl Function {
    pub fn name(&self) -> &'static str {
        match self {
            Function::Global(m) => m.name(),
            Function::Counter(_, m) => m.name(),
            Function::Series(_, m) => m.name(),
            Function::Storage(m) => m.name(),
            Function::String(_, m) => m.name(),
            Function::Array(_, m) => m.name(),
            Function::Map { method, .. } => method.name(),
        }
    }

    pub fn params(&self) -> &'static [Param] {
        match self {
            Function::Global(m) => m.params(),
            Function::Counter(_, m) => m.params(),
            Function::Series(_, m) => m.params(),
            Function::Storage(m) => m.params(),
            Function::String(_, m) => m.params(),
            Function::Array(_, m) => m.params(),
            Function::Map { method, .. } => method.params(),
        }
    }

    pub fn call(&self, arguments: Vec<(Option<String>, Value)>, ctx: &mut ExecutionContext<'_>) -> Result<Value, ErrorKind> {
        let args = bind(self.name(), self.params(), arguments)?;
        match self {
            Function::Global(m) => global::call(*m, &args, ctx),
            Function::Counter(name, m) => counter::call(name, *m, &args, ctx),
            Function::Series(name, m) => series::call(name, *m, &args, ctx),
            Function::Storage(m) => storage::call(*m, &args, ctx),
            Function::String(s, m) => string::call(s, *m, &args),
            Function::Array(items, m) => array::call(items, *m, &args),
            Function::Map { map, origin, method } => map::call(map, origin.as_deref(), *method, &args, ctx),
        }
    }
}

fn unknown_property(target: &Value, property: &str) -> ErrorKind {
    ErrorKind::UnknownProperty {
        target: target.to_string(),
        property: property.to_string(),
    }
}

fn data_point_property(point: &DataPoint, property: &str) -> Option<Value> {
    match property {
        "value" => Some(Value::Number(point.value)),
        "timestamp" => Some(Value::Number(point.timestamp as f64)),
        _ => None,
    }
}

fn aggregate_property(points: &[DataPoint], property: &str) -> Option<Value> {
    match property {
        "values" => Some(Value::Array(points.iter().map(|p| Value::Number(p.value)).collect())),
        "timestamps" => Some(Value::Array(
            points.iter().map(|p| Value::Number(p.timestamp as f64)).collect(),
        )),
        _ => None,
    }
}

/// Looks `property` up on `value`. `origin` names the variable `value` was
/// read from, if any.
pub fn extract(value: Value, property: &str, origin: Option<String>) -> Result<Value, ErrorKind> {
    let function = match &value {
        Value::Handle(Handle::Global) => GlobalMethod::lookup(property).map(Function::Global),
        Value::Handle(Handle::Storage) => StorageMethod::lookup(property).map(Function::Storage),
        Value::Handle(Handle::Counter(name)) => CounterMethod::lookup(property).map(|m| Function::Counter(name.clone(), m)),
        Value::Handle(Handle::Series(name)) => SeriesMethod::lookup(property).map(|m| Function::Series(name.clone(), m)),
        Value::Handle(Handle::DataPoint(point)) => {
            return data_point_property(point, property).ok_or_else(|| unknown_property(&value, property))
        }
        Value::Handle(Handle::Aggregate(points)) => {
            return aggregate_property(points, property).ok_or_else(|| unknown_property(&value, property))
        }
        Value::String(s) => StringMethod::lookup(property).map(|m| Function::String(s.clone(), m)),
        Value::Array(items) => ArrayMethod::lookup(property).map(|m| Function::Array(items.clone(), m)),
        Value::Map(map) => MapMethod::lookup(property).map(|method| Function::Map {
            map: map.clone(),
            origin,
            method,
        }),
        _ => None,
    };

    function
        .map(|f| Value::Handle(Handle::Function(Box::new(f))))
        .ok_or_else(|| unknown_property(&value, property))
}
