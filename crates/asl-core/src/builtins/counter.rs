use tracing::warn;

use super::{ArgKind, Arguments, Param};
use crate::context::ExecutionContext;
use crate::error::{ErrorKind, ProviderError};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMethod {
    Set,
    Increment,
    Reset,
}

const SET: &[Param] = &[Param::required("value", ArgKind::Numeric)];
const INCREMENT: &[Param] = &[Param::required("delta", ArgKind::Numeric)];

impl CounterMethod {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "set" => Some(CounterMethod::Set),
            "increment" => Some(CounterMethod::Increment),
            "reset" => Some(CounterMethod::Reset),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CounterMethod::Set => "set",
            CounterMethod::Increment => "increment",
            CounterMethod::Reset => "reset",
        }
    }

    pub fn params(&self) -> &'static [Param] {
        match self {
            CounterMethod::Set => SET,
            CounterMethod::Increment => INCREMENT,
            CounterMethod::Reset => &[],
        }
    }
}

// Counters hold integers; fractional arguments are truncated.
pub(super) fn call(
    name: &str,
    method: CounterMethod,
    args: &Arguments,
    ctx: &mut ExecutionContext<'_>,
) -> Result<Value, ErrorKind> {
    let provider = ctx.provider();
    let result = match method {
        CounterMethod::Set => provider.set_counter(name, args.number("value")? as i64),
        CounterMethod::Increment => provider.increment_counter(name, args.number("delta")? as i64),
        CounterMethod::Reset => provider.set_counter(name, 0),
    };
    result.map(|()| Value::Null).map_err(|e| failed(name, method, e))
}

fn failed(name: &str, method: CounterMethod, error: ProviderError) -> ErrorKind {
    warn!(counter = name, method = method.name(), error = %error, "counter update failed");
    ErrorKind::provider(format!("counter(\"{}\").{}()", name, method.name()), error)
}
