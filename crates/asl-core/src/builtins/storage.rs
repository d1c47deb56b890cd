use tracing::warn;

use super::{ArgKind, Arguments, Param};
use crate::context::ExecutionContext;
use crate::error::ErrorKind;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMethod {
    Get,
    Set,
}

const GET: &[Param] = &[Param::required("key", ArgKind::String)];
const SET: &[Param] = &[
    Param::required("key", ArgKind::String),
    Param::required("value", ArgKind::Map),
];

impl StorageMethod {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "get" => Some(StorageMethod::Get),
            "set" => Some(StorageMethod::Set),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StorageMethod::Get => "get",
            StorageMethod::Set => "set",
        }
    }

    pub fn params(&self) -> &'static [Param] {
        match self {
            StorageMethod::Get => GET,
            StorageMethod::Set => SET,
        }
    }
}

pub(super) fn call(method: StorageMethod, args: &Arguments, ctx: &mut ExecutionContext<'_>) -> Result<Value, ErrorKind> {
    let key = args.str("key")?;
    let operation = format!("storage.{}(\"{}\")", method.name(), key);
    let provider = ctx.provider();

    let result = match method {
        StorageMethod::Get => provider
            .read_storage(key)
            .map(|map| Value::from(serde_json::Value::Object(map))),
        StorageMethod::Set => {
            let json = match Value::Map(args.map("value")?.clone()).to_json()? {
                serde_json::Value::Object(map) => map,
                other => return Err(args.invalid("value", format!("expected a map, got {}", other))),
            };
            provider.write_storage(key, json).map(|()| Value::Null)
        }
    };

    result.map_err(|e| {
        warn!(%operation, error = %e, "storage access failed");
        ErrorKind::provider(operation, e)
    })
}
