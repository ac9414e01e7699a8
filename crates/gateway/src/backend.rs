// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the identity/resource backend.
//!
//! Every call is bounded by the configured timeout. Transport failures map
//! to [`GatewayError::BackendUnavailable`]; status interpretation is left to
//! the caller.

use std::time::Duration;

use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// Status + raw body of one backend answer.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub bytes: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.iter().all(u8::is_ascii_whitespace)
    }

    /// Decode the body, mapping failures to a protocol error.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        serde_json::from_slice(&self.bytes)
            .map_err(|e| GatewayError::Protocol(format!("malformed backend response: {e}")))
    }

    /// The body as JSON if it parses, `None` otherwise.
    pub fn json_value(&self) -> Option<Value> {
        serde_json::from_slice(&self.bytes).ok()
    }

    /// Body to relay for a 2xx answer: `{}` when empty, the JSON value when
    /// it parses, the text as a JSON string otherwise.
    pub fn relay_body(&self) -> Value {
        if self.is_empty() {
            return Value::Object(Default::default());
        }
        self.json_value().unwrap_or_else(|| Value::String(self.text()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Error payload for a rejected call: the JSON body, or the text
    /// wrapped as `{"detail": ...}`.
    pub fn error_details(&self) -> Value {
        match self.json_value() {
            Some(v) if !v.is_null() => v,
            _ => serde_json::json!({ "detail": self.text().trim() }),
        }
    }

    /// Generic non-2xx error carrying status and body text.
    pub fn backend_error(&self) -> GatewayError {
        GatewayError::Backend { status: self.status, body: self.text() }
    }
}

/// HTTP client wrapper for the backend base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base: Url,
    timeout: Duration,
    client: Client,
}

impl BackendClient {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, GatewayError> {
        // reqwest is built without a bundled provider.
        let _ = rustls::crypto::ring::default_provider().install_default();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base, timeout, client })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Self::new(config.backend_url()?, config.backend_timeout())
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Join a relative endpoint path (e.g. `auth/login/`) onto the base.
    pub fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| GatewayError::BadRequest(format!("invalid endpoint {path:?}: {e}")))
    }

    /// POST a JSON body without authentication.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RawResponse, GatewayError> {
        let req = self.client.post(self.endpoint(path)?).json(body);
        self.send(req).await
    }

    /// Send a request with an optional bearer token and optional JSON body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<&Value>,
    ) -> Result<RawResponse, GatewayError> {
        let mut req = self.client.request(method, self.endpoint(path)?);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        self.send(req).await
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<RawResponse, GatewayError> {
        let resp = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok(RawResponse { status, bytes: bytes.to_vec() })
    }

    fn transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::BackendUnavailable(format!(
                "timed out after {}ms",
                self.timeout.as_millis()
            ))
        } else {
            GatewayError::BackendUnavailable(e.to_string())
        }
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
