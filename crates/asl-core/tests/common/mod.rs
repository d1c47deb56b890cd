//! Shared helpers for asl-core integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use asl_core::provider::{HttpMethod, HttpResponse};
use asl_core::{run, CannedTransport, MemoryProvider, Output, RuntimeError, ScriptError, SyntaxError, Value};

/// Fixed clock used by every provider built here.
pub const NOW: i64 = 1_700_000_000;

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

pub fn provider() -> MemoryProvider {
    MemoryProvider::new().with_fixed_clock(NOW)
}

/// Provider whose HTTP calls are answered by the returned transport.
pub fn provider_with_http() -> (MemoryProvider, Arc<CannedTransport>) {
    let transport = Arc::new(CannedTransport::new());
    let provider = provider().with_transport(transport.clone());
    (provider, transport)
}

pub fn json_response(status_code: u16, body: serde_json::Value) -> HttpResponse {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    HttpResponse {
        status_code,
        headers,
        body,
    }
}

pub fn respond(transport: &CannedTransport, method: HttpMethod, url: &str, response: HttpResponse) {
    transport.respond(method, url, response);
}

// ---------------------------------------------------------------------------
// Running scripts
// ---------------------------------------------------------------------------

pub fn run_ok(source: &str, provider: &MemoryProvider) -> Output {
    match run(source, provider) {
        Ok(output) => output,
        Err(e) => panic!("script failed: {}\n--- script ---\n{}", e, source),
    }
}

pub fn eval(source: &str) -> Output {
    run_ok(source, &provider())
}

pub fn runtime_error(source: &str) -> RuntimeError {
    match run(source, &provider()) {
        Err(ScriptError::Runtime(e)) => e,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

pub fn syntax_errors(source: &str) -> Vec<SyntaxError> {
    match run(source, &provider()) {
        Err(ScriptError::Syntax(errors)) => errors,
        other => panic!("expected syntax errors, got {:?}", other),
    }
}

pub fn number(output: &Output, name: &str) -> f64 {
    match output.get(name) {
        Some(Value::Number(n)) => *n,
        other => panic!("expected `{}` to be a number, got {:?}", name, other),
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
