// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key used for errors that are not attached to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Error codes for the gateway API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Unauthorized,
    InvalidCredentials,
    SessionExpired,
    BackendUnavailable,
    ProtocolError,
    ValidationError,
    BackendError,
    UnknownResource,
    UnknownProvider,
    BadRequest,
    Config,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::InvalidCredentials => 401,
            Self::SessionExpired => 401,
            Self::BackendUnavailable => 503,
            Self::ProtocolError => 502,
            Self::ValidationError => 400,
            Self::BackendError => 502,
            Self::UnknownResource => 404,
            Self::UnknownProvider => 404,
            Self::BadRequest => 400,
            Self::Config => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::BackendUnavailable => "BACKEND_UNAVAILABLE",
            Self::ProtocolError => "PROTOCOL_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::BackendError => "BACKEND_ERROR",
            Self::UnknownResource => "UNKNOWN_RESOURCE",
            Self::UnknownProvider => "UNKNOWN_PROVIDER",
            Self::BadRequest => "BAD_REQUEST",
            Self::Config => "CONFIG",
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>, details: Option<Value>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into(), details }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code, human-readable message and,
/// for field-level failures, the backend's error payload verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Every failure the authenticator, refresh coordinator and proxy can surface.
///
/// Nothing in the gateway retries on the caller's behalf; use
/// [`GatewayError::is_retryable`] to decide whether trying again makes sense.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// The backend rejected the login or identity assertion.
    #[error("invalid credentials")]
    InvalidCredentials { details: Value },

    /// Transport failure or timeout talking to the backend.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend answered with a body the gateway cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The session is gone; the client must authenticate again.
    #[error("session expired")]
    SessionExpired,

    /// 4xx from the backend with a structured body (usually field errors).
    #[error("backend rejected request ({status})")]
    Validation { status: u16, details: Value },

    /// Any other non-2xx answer from the backend.
    #[error("backend error ({status})")]
    Backend { status: u16, body: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("unknown identity provider: {0}")]
    UnknownProvider(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not authenticated")]
    Unauthenticated,
}

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidCredentials { .. } => ErrorCode::InvalidCredentials,
            Self::BackendUnavailable(_) => ErrorCode::BackendUnavailable,
            Self::Protocol(_) => ErrorCode::ProtocolError,
            Self::SessionExpired => ErrorCode::SessionExpired,
            Self::Validation { .. } => ErrorCode::ValidationError,
            Self::Backend { .. } => ErrorCode::BackendError,
            Self::Config(_) => ErrorCode::Config,
            Self::UnknownResource(_) => ErrorCode::UnknownResource,
            Self::UnknownProvider(_) => ErrorCode::UnknownProvider,
            Self::BadRequest(_) => ErrorCode::BadRequest,
            Self::Unauthenticated => ErrorCode::Unauthorized,
        }
    }

    /// Only transport failures are worth retrying; everything else will fail
    /// the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }

    /// HTTP status for the proxy-facing surface. Validation errors keep the
    /// backend's own 4xx status.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { status, .. } => *status,
            other => other.code().http_status(),
        }
    }

    /// Structured payload for the `details` field of the error envelope.
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::InvalidCredentials { details } | Self::Validation { details, .. } => {
                Some(details.clone())
            }
            Self::Backend { status, body } => {
                Some(serde_json::json!({ "status": status, "body": body }))
            }
            _ => None,
        }
    }

    /// Field name → messages, for errors that carry backend field errors.
    /// Empty for every other kind.
    pub fn field_errors(&self) -> IndexMap<String, Vec<String>> {
        match self {
            Self::InvalidCredentials { details } | Self::Validation { details, .. } => {
                field_errors(details)
            }
            _ => IndexMap::new(),
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse { error: self.code().to_error_body(self.to_string(), self.details()) }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!(code = %self.code(), err = %self, "request failed");
        }
        (status, Json(self.to_error_response())).into_response()
    }
}

/// Flatten a REST-framework style error payload into field → messages.
///
/// Handles `{"field": ["msg", ...]}`, `{"field": "msg"}`, a bare list of
/// messages and a bare string. Top-level `detail` is reported under
/// [`NON_FIELD_ERRORS`].
pub fn field_errors(details: &Value) -> IndexMap<String, Vec<String>> {
    let mut out: IndexMap<String, Vec<String>> = IndexMap::new();
    match details {
        Value::Object(map) => {
            for (key, value) in map {
                let field = if key == "detail" { NON_FIELD_ERRORS } else { key.as_str() };
                let messages = messages_of(value);
                if !messages.is_empty() {
                    out.entry(field.to_owned()).or_default().extend(messages);
                }
            }
        }
        Value::Null => {}
        other => {
            let messages = messages_of(other);
            if !messages.is_empty() {
                out.insert(NON_FIELD_ERRORS.to_owned(), messages);
            }
        }
    }
    out
}

fn messages_of(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(messages_of).collect(),
        Value::Null => vec![],
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
