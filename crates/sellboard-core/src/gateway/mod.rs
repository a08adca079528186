//! Proxy gateway contract
//!
//! The seller API is reached through a stateless proxy that accepts a
//! generic `{path, method, headers, body}` envelope and answers with the
//! upstream status and body. This module owns the client side of that
//! contract: envelope encoding, body normalization and response decoding.
//!
//! Body encoding has a single source of truth: [`normalize_body`], applied
//! by every gateway implementation before a request leaves the process.

pub mod http;

pub use http::HttpGateway;

use crate::error::CoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// HTTP verb forwarded to the upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// Request envelope sent to the proxy
///
/// `body`, when present, is already a serialized string. Use
/// [`RequestEnvelope::with_json`] to serialize a value exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub path: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RequestEnvelope {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach the token as the `Authorization` header, verbatim
    pub fn authorization(self, token: impl Into<String>) -> Self {
        self.header("Authorization", token)
    }

    /// Attach an already serialized body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` once and attach it as the body
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, CoreError> {
        let body = serde_json::to_string(value).map_err(|e| CoreError::BodyEncode {
            message: e.to_string(),
            source: e,
        })?;
        self.headers
            .entry("Content-Type".to_string())
            .or_insert_with(|| "application/json".to_string());
        self.body = Some(body);
        Ok(self)
    }
}

/// What to do with a body that was serialized twice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPolicy {
    /// Unwrap one level of string encoding and forward the inner JSON
    #[default]
    Normalize,
    /// Refuse to forward the request
    Reject,
}

/// Returns the inner JSON text when `body` is a JSON string literal that
/// itself contains a JSON object or array
pub fn detect_double_serialized(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(inner)) => match serde_json::from_str::<Value>(&inner) {
            Ok(Value::Object(_)) | Ok(Value::Array(_)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

/// Apply `policy` to the envelope body
///
/// Bodies that are not double-serialized pass through byte-identical.
pub fn normalize_body(envelope: &mut RequestEnvelope, policy: BodyPolicy) -> Result<(), CoreError> {
    let Some(inner) = envelope.body.as_deref().and_then(detect_double_serialized) else {
        return Ok(());
    };

    match policy {
        BodyPolicy::Normalize => {
            warn!(path = %envelope.path, "Double-serialized request body, unwrapping one level");
            envelope.body = Some(inner);
            Ok(())
        }
        BodyPolicy::Reject => Err(CoreError::DoubleSerializedBody {
            path: envelope.path.clone(),
        }),
    }
}

/// Raw upstream answer relayed by the proxy
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Value,
}

impl GatewayResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Parse `text` as JSON, falling back to `{"raw": text}`
    pub fn from_text(status: u16, text: &str) -> Self {
        let body = serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::json!({ "raw": text }));
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into the matching error
    pub fn error_for_status(&self, path: &str) -> Result<(), CoreError> {
        if self.is_success() {
            return Ok(());
        }

        let upstream = UpstreamError::parse(&self.body);

        if self.status == 400 {
            if let Some(code) = upstream.code.as_deref() {
                if code.starts_with("bad-request") {
                    return Err(CoreError::BadRequestShape {
                        path: path.to_string(),
                        code: code.to_string(),
                        message: upstream.message,
                    });
                }
            }
        }

        Err(CoreError::UpstreamStatus {
            path: path.to_string(),
            status: self.status,
            code: upstream.code,
            message: upstream.message,
        })
    }
}

/// Error details extracted from an upstream error body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamError {
    pub code: Option<String>,
    pub message: String,
}

impl UpstreamError {
    /// Accepts `{"errors":[{code,message}]}`, `{code,message}`,
    /// `{"error": "..."}` and the proxy's `{"raw": "..."}` fallback
    pub fn parse(body: &Value) -> Self {
        let first = body
            .get("errors")
            .and_then(Value::as_array)
            .and_then(|errors| errors.first())
            .unwrap_or(body);

        let code = first
            .get("code")
            .and_then(Value::as_str)
            .map(str::to_string);

        let message = ["message", "error", "raw"]
            .iter()
            .find_map(|field| first.get(*field).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());

        Self { code, message }
    }
}

/// Forwards request envelopes to the upstream seller API
#[async_trait]
pub trait ProxyGateway: Send + Sync {
    /// Send one envelope. `Err` means the request never produced an
    /// upstream answer; non-2xx answers come back as `Ok`.
    async fn forward(&self, envelope: RequestEnvelope) -> Result<GatewayResponse, CoreError>;
}

#[async_trait]
impl<G: ProxyGateway + ?Sized> ProxyGateway for Arc<G> {
    async fn forward(&self, envelope: RequestEnvelope) -> Result<GatewayResponse, CoreError> {
        (**self).forward(envelope).await
    }
}
