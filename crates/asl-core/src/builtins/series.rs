use std::time::Duration;

use tracing::warn;

use super::{ArgKind, Arguments, Param};
use crate::context::ExecutionContext;
use crate::error::{ErrorKind, ProviderError};
use crate::provider::{AggregateFunction, DataPoint, Trim};
use crate::value::{Handle, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesMethod {
    Last,
    Aggregate,
    Compute(AggregateFunction),
    Push,
    Pop,
    Trim,
    Items,
}

const AGGREGATE: &[Param] = &[
    Param::required("func", ArgKind::String),
    Param::required("interval", ArgKind::String),
    Param::required("count", ArgKind::Numeric),
];
const COMPUTE: &[Param] = &[Param::required("interval", ArgKind::String)];
const PUSH: &[Param] = &[
    Param::required("value", ArgKind::Numeric),
    Param::optional("timestamp", ArgKind::Numeric),
];
const TRIM: &[Param] = &[
    Param::optional("since", ArgKind::String),
    Param::optional("count", ArgKind::Numeric),
];
const ITEMS: &[Param] = &[Param::required("count", ArgKind::Numeric)];

impl SeriesMethod {
    pub fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "last" => SeriesMethod::Last,
            "aggregate" => SeriesMethod::Aggregate,
            "avg" => SeriesMethod::Compute(AggregateFunction::Avg),
            "min" => SeriesMethod::Compute(AggregateFunction::Min),
            "max" => SeriesMethod::Compute(AggregateFunction::Max),
            "sum" => SeriesMethod::Compute(AggregateFunction::Sum),
            "count" => SeriesMethod::Compute(AggregateFunction::Count),
            "stddev" => SeriesMethod::Compute(AggregateFunction::StdDev),
            "push" => SeriesMethod::Push,
            "pop" => SeriesMethod::Pop,
            "trim" => SeriesMethod::Trim,
            "items" => SeriesMethod::Items,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SeriesMethod::Last => "last",
            SeriesMethod::Aggregate => "aggregate",
            SeriesMethod::Compute(AggregateFunction::Avg) => "avg",
            SeriesMethod::Compute(AggregateFunction::Min) => "min",
            SeriesMethod::Compute(AggregateFunction::Max) => "max",
            SeriesMethod::Compute(AggregateFunction::Sum) => "sum",
            SeriesMethod::Compute(AggregateFunction::Count) => "count",
            SeriesMethod::Compute(AggregateFunction::StdDev) => "stddev",
            SeriesMethod::Push => "push",
            SeriesMethod::Pop => "pop",
            SeriesMethod::Trim => "trim",
            SeriesMethod::Items => "items",
        }
    }

    pub fn params(&self) -> &'static [Param] {
        match self {
            SeriesMethod::Last | SeriesMethod::Pop => &[],
            SeriesMethod::Aggregate => AGGREGATE,
            SeriesMethod::Compute(_) => COMPUTE,
            SeriesMethod::Push => PUSH,
            SeriesMethod::Trim => TRIM,
            SeriesMethod::Items => ITEMS,
        }
    }
}

/// Parses an interval: a plain number of seconds (`600`) or a sequence of
/// numbers with units `ms`, `s`, `m`, `h`, `d`, `w` (`1h30m`).
pub fn parse_interval(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    let invalid = || format!("invalid interval `{}`", text);

    if let Ok(seconds) = text.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(invalid());
        }
        return Duration::try_from_secs_f64(seconds).map_err(|_| invalid());
    }
    if text.is_empty() {
        return Err(invalid());
    }

    let mut seconds = 0.0;
    let mut rest = text;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let amount: f64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3_600.0,
            "d" => 86_400.0,
            "w" => 604_800.0,
            unit => return Err(format!("unknown unit `{}` in interval `{}`", unit, text)),
        };
        seconds += amount * scale;
        rest = &rest[unit_len..];
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
}

fn interval_secs(args: &Arguments, name: &str) -> Result<u64, ErrorKind> {
    let secs = parse_interval(args.str(name)?)
        .map_err(|reason| args.invalid(name, reason))?
        .as_secs();
    if secs == 0 {
        return Err(args.invalid(name, "must be at least one second"));
    }
    Ok(secs)
}

fn point_value(point: Option<DataPoint>) -> Value {
    Value::Handle(Handle::DataPoint(point.unwrap_or(DataPoint::new(0, 0.0))))
}

/// `last()` and `pop()` on an empty series yield a zero point rather than
/// an error.
pub(super) fn call(
    name: &str,
    method: SeriesMethod,
    args: &Arguments,
    ctx: &mut ExecutionContext<'_>,
) -> Result<Value, ErrorKind> {
    let provider = ctx.provider();
    let failed = |error: ProviderError| {
        warn!(series = name, method = method.name(), error = %error, "series operation failed");
        ErrorKind::provider(format!("series(\"{}\").{}()", name, method.name()), error)
    };

    match method {
        SeriesMethod::Last => provider.series_last(name).map(point_value).map_err(failed),
        SeriesMethod::Pop => provider.series_pop(name).map(point_value).map_err(failed),
        SeriesMethod::Aggregate => {
            let function: AggregateFunction = args
                .str("func")?
                .parse()
                .map_err(|reason: String| args.invalid("func", reason))?;
            let interval = interval_secs(args, "interval")?;
            let count = args.count("count")?;
            provider
                .series_aggregate(name, function, interval, count)
                .map(|points| Value::Handle(Handle::Aggregate(points)))
                .map_err(failed)
        }
        SeriesMethod::Compute(function) => {
            let window = interval_secs(args, "interval")?;
            provider
                .series_compute(name, function, window)
                .map(Value::Number)
                .map_err(failed)
        }
        SeriesMethod::Push => {
            let value = args.number("value")?;
            let timestamp = match args.opt_number("timestamp") {
                Some(ts) => ts as i64,
                None => provider.now(),
            };
            provider
                .series_push(name, DataPoint::new(timestamp, value))
                .map(|()| Value::Null)
                .map_err(failed)
        }
        SeriesMethod::Trim => {
            let trim = match (args.opt_str("since"), args.get("count")) {
                (Some(_), Some(_)) => {
                    return Err(args.invalid("since", "`since` and `count` cannot be combined"));
                }
                (Some(_), None) => {
                    let since = i64::try_from(interval_secs(args, "since")?)
                        .ok()
                        .and_then(|secs| provider.now().checked_sub(secs))
                        .ok_or_else(|| args.invalid("since", "interval is too large"))?;
                    Trim::Since(since)
                }
                (None, Some(_)) => Trim::Count(args.count("count")?),
                (None, None) => return Err(args.invalid("since", "either `since` or `count` is required")),
            };
            provider.series_trim(name, trim).map(|()| Value::Null).map_err(failed)
        }
        SeriesMethod::Items => {
            let count = args.count("count")?;
            provider
                .series_items(name, count)
                .map(|points| Value::Handle(Handle::Aggregate(points)))
                .map_err(failed)
        }
    }
}
