use std::collections::BTreeMap;

use super::{ArgKind, Arguments, Param};
use crate::context::ExecutionContext;
use crate::error::ErrorKind;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMethod {
    Item,
    Count,
    Set,
}

const ITEM: &[Param] = &[Param::required("index", ArgKind::String)];
const SET: &[Param] = &[
    Param::required("index", ArgKind::String),
    Param::required("value", ArgKind::Any),
];

impl MapMethod {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "item" => Some(MapMethod::Item),
            "count" => Some(MapMethod::Count),
            "set" => Some(MapMethod::Set),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MapMethod::Item => "item",
            MapMethod::Count => "count",
            MapMethod::Set => "set",
        }
    }

    pub fn params(&self) -> &'static [Param] {
        match self {
            MapMethod::Item => ITEM,
            MapMethod::Count => &[],
            MapMethod::Set => SET,
        }
    }
}

/// `set` stores the updated map back into `origin`. A map that did not come
/// from a variable has nowhere to be written and is left as is.
pub(super) fn call(
    map: &BTreeMap<String, Value>,
    origin: Option<&str>,
    method: MapMethod,
    args: &Arguments,
    ctx: &mut ExecutionContext<'_>,
) -> Result<Value, ErrorKind> {
    match method {
        MapMethod::Item => {
            let index = args.str("index")?;
            map.get(index)
                .cloned()
                .ok_or_else(|| ErrorKind::IndexOutOfRange(index.to_string()))
        }
        MapMethod::Count => Ok(Value::Number(map.len() as f64)),
        MapMethod::Set => {
            let mut updated = map.clone();
            updated.insert(args.str("index")?.to_string(), args.value("value")?.clone());
            if let Some(variable) = origin {
                ctx.set_variable(variable, Value::Map(updated));
            }
            Ok(Value::Null)
        }
    }
}
