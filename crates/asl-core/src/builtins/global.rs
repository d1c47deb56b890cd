use std::collections::BTreeMap;

use tracing::{info, warn};

use super::{ArgKind, Arguments, Param};
use crate::coerce;
use crate::context::ExecutionContext;
use crate::error::{ErrorKind, ProviderError};
use crate::provider::{BasicAuth, HttpBody, HttpMethod, HttpRequest, HttpResponse};
use crate::value::{Handle, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalMethod {
    Now,
    Counter,
    Series,
    Get,
    Post,
    Arg,
    Log,
    Error,
    Anomaly,
    Load,
}

const NAME: &[Param] = &[Param::required("name", ArgKind::String)];
const MESSAGE: &[Param] = &[Param::required("message", ArgKind::String)];
const GET: &[Param] = &[
    Param::required("url", ArgKind::String),
    Param::optional("auth", ArgKind::Map),
    Param::optional("query", ArgKind::Map),
];
const POST: &[Param] = &[
    Param::required("url", ArgKind::String),
    Param::optional("auth", ArgKind::Map),
    Param::optional("query", ArgKind::Map),
    Param::optional("body", ArgKind::Map),
    Param::optional("json", ArgKind::Boolean),
];
const LOAD: &[Param] = &[
    Param::required("format", ArgKind::String),
    Param::required("path", ArgKind::String),
];
const ANOMALY: &[Param] = &[
    Param::required("data", ArgKind::NumericArray),
    Param::required("value", ArgKind::Numeric),
];

impl GlobalMethod {
    pub fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "now" => GlobalMethod::Now,
            "counter" => GlobalMethod::Counter,
            "series" => GlobalMethod::Series,
            "get" => GlobalMethod::Get,
            "post" => GlobalMethod::Post,
            "arg" => GlobalMethod::Arg,
            "log" => GlobalMethod::Log,
            "error" => GlobalMethod::Error,
            "anomaly" => GlobalMethod::Anomaly,
            "load" => GlobalMethod::Load,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            GlobalMethod::Now => "now",
            GlobalMethod::Counter => "counter",
            GlobalMethod::Series => "series",
            GlobalMethod::Get => "get",
            GlobalMethod::Post => "post",
            GlobalMethod::Arg => "arg",
            GlobalMethod::Log => "log",
            GlobalMethod::Error => "error",
            GlobalMethod::Anomaly => "anomaly",
            GlobalMethod::Load => "load",
        }
    }

    pub fn params(&self) -> &'static [Param] {
        match self {
            GlobalMethod::Now => &[],
            GlobalMethod::Counter | GlobalMethod::Series | GlobalMethod::Arg => NAME,
            GlobalMethod::Log | GlobalMethod::Error => MESSAGE,
            GlobalMethod::Get => GET,
            GlobalMethod::Post => POST,
            GlobalMethod::Anomaly => ANOMALY,
            GlobalMethod::Load => LOAD,
        }
    }
}

pub(super) fn call(method: GlobalMethod, args: &Arguments, ctx: &mut ExecutionContext<'_>) -> Result<Value, ErrorKind> {
    match method {
        GlobalMethod::Now => Ok(Value::Number(ctx.provider().now() as f64)),
        GlobalMethod::Counter => Ok(Value::Handle(Handle::Counter(args.str("name")?.to_string()))),
        GlobalMethod::Series => Ok(Value::Handle(Handle::Series(args.str("name")?.to_string()))),
        GlobalMethod::Arg => {
            let name = args.str("name")?;
            ctx.argument(name)
                .cloned()
                .ok_or_else(|| ErrorKind::UnknownArgument(name.to_string()))
        }
        GlobalMethod::Log => {
            info!(target: "asl::script", "{}", args.str("message")?);
            Ok(Value::Null)
        }
        GlobalMethod::Error => Err(ErrorKind::Raised(args.str("message")?.to_string())),
        GlobalMethod::Anomaly => {
            let data = args.numbers("data")?;
            let value = args.number("value")?;
            Ok(Value::Boolean(is_anomaly(&data, value)))
        }
        GlobalMethod::Get => http(HttpMethod::Get, args, ctx),
        GlobalMethod::Post => http(HttpMethod::Post, args, ctx),
        GlobalMethod::Load => load(args, ctx),
    }
}

/// Reads a data file into a value. Only JSON is understood.
fn load(args: &Arguments, ctx: &mut ExecutionContext<'_>) -> Result<Value, ErrorKind> {
    let format = args.str("format")?.to_lowercase();
    if format != "json" {
        return Err(args.invalid("format", format!("unknown file format `{}`", format)));
    }
    let path = args.str("path")?;
    let operation = format!("load(\"{}\")", path);

    let text = ctx.provider().read_file(path).map_err(|e| {
        warn!(path, error = %e, "load failed");
        ErrorKind::provider(operation.clone(), e)
    })?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| ErrorKind::provider(operation, ProviderError::Decode(e.to_string())))?;
    Ok(Value::from(json))
}

/// True when `value` lies more than three standard deviations from the
/// mean of `data`.
fn is_anomaly(data: &[f64], value: f64) -> bool {
    if data.is_empty() {
        return false;
    }
    let count = data.len() as f64;
    let mean = data.iter().sum::<f64>() / count;
    let variance = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    (value - mean).abs() > 3.0 * variance.sqrt()
}

fn pairs(map: &BTreeMap<String, Value>) -> Vec<(String, String)> {
    map.iter().map(|(k, v)| (k.clone(), coerce::to_text(v))).collect()
}

fn http(method: HttpMethod, args: &Arguments, ctx: &mut ExecutionContext<'_>) -> Result<Value, ErrorKind> {
    let mut request = HttpRequest::new(method, args.str("url")?);

    if let Some(query) = args.opt_map("query") {
        request.query = pairs(query);
    }

    if let Some(auth) = args.opt_map("auth") {
        let field = |key: &str| {
            auth.get(key)
                .map(coerce::to_text)
                .ok_or_else(|| args.invalid("auth", format!("missing `{}`", key)))
        };
        request.auth = Some(BasicAuth {
            user: field("user")?,
            password: field("password")?,
        });
    }

    if let Some(body) = args.opt_map("body").filter(|body| !body.is_empty()) {
        request.body = Some(if args.opt_boolean("json").unwrap_or(false) {
            HttpBody::Json(Value::Map(body.clone()).to_json()?)
        } else {
            HttpBody::Form(pairs(body))
        });
    }

    let operation = format!("{} {}", method, request.url);
    match ctx.provider().http(&request) {
        Ok(response) => Ok(response_value(response)),
        Err(e) => {
            warn!(%operation, error = %e, "HTTP request failed");
            Err(ErrorKind::provider(operation, e))
        }
    }
}

fn response_value(response: HttpResponse) -> Value {
    let headers = response
        .headers
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    let mut map = BTreeMap::new();
    map.insert("status_code".to_string(), Value::Number(f64::from(response.status_code)));
    map.insert("header".to_string(), Value::Map(headers));
    map.insert("body".to_string(), Value::from(response.body));
    Value::Map(map)
}
