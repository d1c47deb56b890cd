//! Capability provider seam.
//!
//! Scripts never touch storage or the network directly. Every counter,
//! series, storage and HTTP operation goes through a [`Provider`] injected
//! into the run, so the interpreter can be backed by a database, a JSON
//! file or the in-memory store used in tests.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// A single series sample. Timestamps are Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: i64,
    pub value: f64,
}

impl DataPoint {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    StdDev,
}

impl AggregateFunction {
    /// Applies the function to `values`. Empty input yields 0; the
    /// standard deviation is the sample deviation.
    pub fn apply(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let count = values.len() as f64;
        let sum: f64 = values.iter().sum();
        match self {
            AggregateFunction::Sum => sum,
            AggregateFunction::Avg => sum / count,
            AggregateFunction::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggregateFunction::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregateFunction::Count => count,
            AggregateFunction::StdDev => {
                if values.len() < 2 {
                    return 0.0;
                }
                let mean = sum / count;
                let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
                (squares / (count - 1.0)).sqrt()
            }
        }
    }
}

impl FromStr for AggregateFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregateFunction::Sum),
            "avg" | "average" | "mean" => Ok(AggregateFunction::Avg),
            "min" => Ok(AggregateFunction::Min),
            "max" => Ok(AggregateFunction::Max),
            "count" => Ok(AggregateFunction::Count),
            "stddev" => Ok(AggregateFunction::StdDev),
            other => Err(format!("unknown aggregate function `{}`", other)),
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Count => "count",
            AggregateFunction::StdDev => "stddev",
        };
        f.write_str(name)
    }
}

/// How [`Provider::series_trim`] shortens a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    /// Drop points older than this timestamp.
    Since(i64),
    /// Keep only the newest `n` points.
    Count(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HttpBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub auth: Option<BasicAuth>,
    pub body: Option<HttpBody>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            auth: None,
            body: None,
        }
    }
}

/// Decoded response. JSON and form bodies are decoded; anything else is
/// kept as a string.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: serde_json::Value,
}

/// Sends HTTP requests on behalf of a provider.
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ProviderError>;
}

/// Backing store for everything a script can reach outside its own variables.
///
/// Each operation must be atomic on its own; the interpreter performs no
/// coordination between calls.
pub trait Provider: Send + Sync {
    /// Current value; absent counters read as 0.
    fn counter_value(&self, name: &str) -> Result<i64, ProviderError>;

    fn set_counter(&self, name: &str, value: i64) -> Result<(), ProviderError>;

    fn increment_counter(&self, name: &str, delta: i64) -> Result<(), ProviderError>;

    /// Newest point, if the series has any.
    fn series_last(&self, name: &str) -> Result<Option<DataPoint>, ProviderError>;

    /// `count` consecutive buckets of `interval_secs` ending now, oldest
    /// first. Each bucket point carries the bucket's end timestamp.
    fn series_aggregate(
        &self,
        name: &str,
        function: AggregateFunction,
        interval_secs: u64,
        count: usize,
    ) -> Result<Vec<DataPoint>, ProviderError>;

    /// `function` over the points of the last `window_secs`.
    fn series_compute(&self, name: &str, function: AggregateFunction, window_secs: u64) -> Result<f64, ProviderError>;

    fn series_push(&self, name: &str, point: DataPoint) -> Result<(), ProviderError>;

    /// Removes and returns the newest point.
    fn series_pop(&self, name: &str) -> Result<Option<DataPoint>, ProviderError>;

    fn series_trim(&self, name: &str, trim: Trim) -> Result<(), ProviderError>;

    /// Newest `count` points, oldest first.
    fn series_items(&self, name: &str, count: usize) -> Result<Vec<DataPoint>, ProviderError>;

    /// Stored map for `key`; absent keys read as an empty map.
    fn read_storage(&self, key: &str) -> Result<JsonMap, ProviderError>;

    fn write_storage(&self, key: &str, value: JsonMap) -> Result<(), ProviderError>;

    /// Current Unix time in seconds.
    fn now(&self) -> i64;

    fn http(&self, request: &HttpRequest) -> Result<HttpResponse, ProviderError>;

    /// Contents of the file at `path`, for `load()`.
    fn read_file(&self, path: &str) -> Result<String, ProviderError>;
}
