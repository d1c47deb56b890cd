//! In-memory [`Provider`].
//!
//! Holds counters, series and storage behind a single mutex. The state is
//! serde-serializable so a caller can persist it between runs (the `asl`
//! CLI keeps it in a JSON state file).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::provider::{
    AggregateFunction, DataPoint, HttpMethod, HttpRequest, HttpResponse, HttpTransport, JsonMap, Provider, Trim,
};

/// Upper bound on the buckets a single `aggregate()` call may produce.
pub const MAX_BUCKETS: usize = 100_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    #[serde(default)]
    pub counters: BTreeMap<String, i64>,
    /// Points per series, ascending by timestamp, one point per timestamp.
    #[serde(default)]
    pub series: BTreeMap<String, Vec<DataPoint>>,
    #[serde(default)]
    pub storage: BTreeMap<String, JsonMap>,
}

#[derive(Debug, Clone, Copy)]
enum Clock {
    System,
    Fixed(i64),
}

pub struct MemoryProvider {
    state: Mutex<MemoryState>,
    clock: Clock,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::with_state(MemoryState::default())
    }

    pub fn with_state(state: MemoryState) -> Self {
        Self {
            state: Mutex::new(state),
            clock: Clock::System,
            transport: None,
        }
    }

    /// Freezes `now()` at `timestamp`.
    pub fn with_fixed_clock(mut self, timestamp: i64) -> Self {
        self.clock = Clock::Fixed(timestamp);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Copy of the current state, for persisting.
    pub fn snapshot(&self) -> Result<MemoryState, ProviderError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, ProviderError> {
        self.state
            .lock()
            .map_err(|_| ProviderError::Unavailable("state lock poisoned".into()))
    }

    fn window(&self, name: &str, from: i64, to: i64) -> Result<Vec<f64>, ProviderError> {
        let state = self.lock()?;
        Ok(state
            .series
            .get(name)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.timestamp >= from && p.timestamp <= to)
                    .map(|p| p.value)
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl Provider for MemoryProvider {
    fn counter_value(&self, name: &str) -> Result<i64, ProviderError> {
        Ok(self.lock()?.counters.get(name).copied().unwrap_or(0))
    }

    fn set_counter(&self, name: &str, value: i64) -> Result<(), ProviderError> {
        self.lock()?.counters.insert(name.to_string(), value);
        Ok(())
    }

    fn increment_counter(&self, name: &str, delta: i64) -> Result<(), ProviderError> {
        let mut state = self.lock()?;
        let counter = state.counters.entry(name.to_string()).or_insert(0);
        *counter = counter.saturating_add(delta);
        Ok(())
    }

    fn series_last(&self, name: &str) -> Result<Option<DataPoint>, ProviderError> {
        Ok(self.lock()?.series.get(name).and_then(|points| points.last().copied()))
    }

    fn series_aggregate(
        &self,
        name: &str,
        function: AggregateFunction,
        interval_secs: u64,
        count: usize,
    ) -> Result<Vec<DataPoint>, ProviderError> {
        if count > MAX_BUCKETS {
            return Err(ProviderError::Series(format!(
                "{} buckets requested, at most {} allowed",
                count, MAX_BUCKETS
            )));
        }
        let interval = i64::try_from(interval_secs)
            .map_err(|_| ProviderError::Series(format!("interval {}s is too large", interval_secs)))?;
        let buckets = count as i64;

        let mut start = self.now().saturating_sub(interval.saturating_mul(buckets));
        let mut points = Vec::with_capacity(count);
        for _ in 0..count {
            let from = start.saturating_add(1);
            start = start.saturating_add(interval);
            let values = self.window(name, from, start)?;
            points.push(DataPoint::new(start, function.apply(&values)));
        }
        Ok(points)
    }

    fn series_compute(&self, name: &str, function: AggregateFunction, window_secs: u64) -> Result<f64, ProviderError> {
        let window = i64::try_from(window_secs)
            .map_err(|_| ProviderError::Series(format!("window {}s is too large", window_secs)))?;
        let now = self.now();
        let values = self.window(name, now.saturating_sub(window), now)?;
        Ok(function.apply(&values))
    }

    fn series_push(&self, name: &str, point: DataPoint) -> Result<(), ProviderError> {
        let mut state = self.lock()?;
        let points = state.series.entry(name.to_string()).or_default();
        match points.binary_search_by_key(&point.timestamp, |p| p.timestamp) {
            Ok(index) => points[index] = point,
            Err(index) => points.insert(index, point),
        }
        Ok(())
    }

    fn series_pop(&self, name: &str) -> Result<Option<DataPoint>, ProviderError> {
        Ok(self.lock()?.series.get_mut(name).and_then(Vec::pop))
    }

    fn series_trim(&self, name: &str, trim: Trim) -> Result<(), ProviderError> {
        let mut state = self.lock()?;
        if let Some(points) = state.series.get_mut(name) {
            match trim {
                Trim::Since(timestamp) => points.retain(|p| p.timestamp >= timestamp),
                Trim::Count(count) => {
                    let excess = points.len().saturating_sub(count);
                    points.drain(..excess);
                }
            }
        }
        Ok(())
    }

    fn series_items(&self, name: &str, count: usize) -> Result<Vec<DataPoint>, ProviderError> {
        let state = self.lock()?;
        Ok(state
            .series
            .get(name)
            .map(|points| points[points.len().saturating_sub(count)..].to_vec())
            .unwrap_or_default())
    }

    fn read_storage(&self, key: &str) -> Result<JsonMap, ProviderError> {
        Ok(self.lock()?.storage.get(key).cloned().unwrap_or_default())
    }

    fn write_storage(&self, key: &str, value: JsonMap) -> Result<(), ProviderError> {
        self.lock()?.storage.insert(key.to_string(), value);
        Ok(())
    }

    fn read_file(&self, path: &str) -> Result<String, ProviderError> {
        std::fs::read_to_string(path).map_err(|e| ProviderError::File(format!("{}: {}", path, e)))
    }

    fn now(&self) -> i64 {
        match self.clock {
            Clock::System => chrono::Utc::now().timestamp(),
            Clock::Fixed(timestamp) => timestamp,
        }
    }

    fn http(&self, request: &HttpRequest) -> Result<HttpResponse, ProviderError> {
        match &self.transport {
            Some(transport) => transport.send(request),
            None => Err(ProviderError::Http("no HTTP transport configured".into())),
        }
    }
}

/// [`HttpTransport`] that answers from a fixed table and records every
/// request it sees.
#[derive(Default)]
pub struct CannedTransport {
    responses: Mutex<Vec<(HttpMethod, String, HttpResponse)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl CannedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the response for `method url`. Later registrations win.
    pub fn respond(&self, method: HttpMethod, url: &str, response: HttpResponse) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push((method, url.to_string(), response));
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl HttpTransport for CannedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ProviderError> {
        self.requests
            .lock()
            .map_err(|_| ProviderError::Unavailable("request log poisoned".into()))?
            .push(request.clone());

        let responses = self
            .responses
            .lock()
            .map_err(|_| ProviderError::Unavailable("response table poisoned".into()))?;
        responses
            .iter()
            .rev()
            .find(|(method, url, _)| *method == request.method && *url == request.url)
            .map(|(_, _, response)| response.clone())
            .ok_or_else(|| ProviderError::Http(format!("{} {}: connection refused", request.method, request.url)))
    }
}
