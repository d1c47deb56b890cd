//! Blocking HTTP transport for `get()` and `post()`.

use std::time::Duration;

use asl_core::provider::{BasicAuth, HttpBody, HttpRequest, HttpResponse, HttpTransport};
use asl_core::ProviderError;
use base64::Engine;
use tracing::debug;

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

fn authorization(auth: &BasicAuth) -> String {
    let credentials = format!("{}:{}", auth.user, auth.password);
    format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(credentials))
}

impl HttpTransport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ProviderError> {
        let mut call = self.agent.request(&request.method.to_string(), &request.url);
        for (key, value) in &request.query {
            call = call.query(key, value);
        }
        if let Some(auth) = &request.auth {
            call = call.set("Authorization", &authorization(auth));
        }

        debug!(method = %request.method, url = %request.url, "sending HTTP request");
        let result = match &request.body {
            None => call.call(),
            Some(HttpBody::Json(json)) => call.send_json(json),
            Some(HttpBody::Form(pairs)) => {
                let pairs: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                call.send_form(&pairs)
            }
        };

        // Error statuses still carry a response the script can inspect.
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => return Err(ProviderError::Http(e.to_string())),
        };

        let status_code = response.status();
        let headers = response
            .headers_names()
            .into_iter()
            .filter_map(|name| response.header(&name).map(|value| (name.clone(), value.to_string())))
            .collect();
        let content_type = response.content_type().to_string();
        let text = response
            .into_string()
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        debug!(status_code, content_type = %content_type, bytes = text.len(), "HTTP response received");

        Ok(HttpResponse {
            status_code,
            headers,
            body: decode_body(&content_type, text)?,
        })
    }
}

/// JSON and form-encoded bodies are decoded; anything else stays a string.
pub fn decode_body(content_type: &str, text: String) -> Result<serde_json::Value, ProviderError> {
    match content_type {
        "application/json" => serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string())),
        "application/x-www-form-urlencoded" => Ok(serde_json::Value::Object(
            text.split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| {
                    let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                    (percent_decode(key), serde_json::Value::String(percent_decode(value)))
                })
                .collect(),
        )),
        _ => Ok(serde_json::Value::String(text)),
    }
}

fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            b'%' => match text.get(i + 1..i + 3).and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                Some(byte) => {
                    decoded.push(byte);
                    i += 3;
                }
                None => {
                    decoded.push(b'%');
                    i += 1;
                }
            },
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&decoded).into_owned()
}
