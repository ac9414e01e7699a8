// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the session gateway.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credential::{Credentials, Registration};
use crate::error::GatewayError;
use crate::proxy::{ForwardRequest, ProxyMethod};
use crate::session::SessionInfo;
use crate::state::GatewayState;
use crate::transport::auth::AuthSession;

/// Response header naming the collection a mutation invalidated.
pub const INVALIDATE_HEADER: HeaderName = HeaderName::from_static("x-invalidate");

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub session_count: usize,
    pub uptime_secs: u64,
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub identifier: String,
    pub secret: String,
}

#[derive(Deserialize)]
pub struct FederatedBody {
    pub assertion: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "running".to_owned(),
        session_count: s.store.len().await,
        uptime_secs: s.started_at.elapsed().as_secs(),
    })
}

/// `POST /api/v1/auth/login`
pub async fn login(
    State(s): State<Arc<GatewayState>>,
    Json(body): Json<LoginBody>,
) -> Result<Json<SessionInfo>, GatewayError> {
    let creds = Credentials::Password { identifier: body.identifier, secret: body.secret };
    establish(&s, &creds).await
}

/// `POST /api/v1/auth/federated/{provider}`
pub async fn login_federated(
    State(s): State<Arc<GatewayState>>,
    Path(provider): Path<String>,
    Json(body): Json<FederatedBody>,
) -> Result<Json<SessionInfo>, GatewayError> {
    let creds = Credentials::Federated { provider, assertion: body.assertion };
    establish(&s, &creds).await
}

async fn establish(
    s: &GatewayState,
    creds: &Credentials,
) -> Result<Json<SessionInfo>, GatewayError> {
    let session = s.authenticator.authenticate(creds).await?;
    let info = session.info();
    s.store.insert(session).await;
    Ok(Json(info))
}

/// `POST /api/v1/auth/register`
pub async fn register(
    State(s): State<Arc<GatewayState>>,
    Json(body): Json<Registration>,
) -> Result<impl IntoResponse, GatewayError> {
    let answer = s.authenticator.register(&body).await?;
    let status = StatusCode::from_u16(answer.status).unwrap_or(StatusCode::CREATED);
    Ok((status, Json(answer.body)))
}

/// `POST /api/v1/auth/logout`
pub async fn logout(
    State(s): State<Arc<GatewayState>>,
    Extension(AuthSession(handle)): Extension<AuthSession>,
) -> impl IntoResponse {
    let removed = s.store.remove(handle.id()).await;
    tracing::info!(session = %handle.id(), "session ended by client");
    Json(LogoutResponse { logged_out: removed })
}

/// `GET /api/v1/auth/session`
pub async fn session_info(
    Extension(AuthSession(handle)): Extension<AuthSession>,
) -> Result<Json<SessionInfo>, GatewayError> {
    let session = handle.get().await.ok_or(GatewayError::SessionExpired)?;
    Ok(Json(session.info()))
}

/// `GET|POST|PUT|DELETE /api/v1/proxy/{resource}`
pub async fn proxy_collection(
    State(s): State<Arc<GatewayState>>,
    Extension(auth): Extension<AuthSession>,
    Path(resource): Path<String>,
    method: Method,
    body: Bytes,
) -> Result<Response, GatewayError> {
    forward(&s, auth, resource, None, method, body).await
}

/// `GET|POST|PUT|DELETE /api/v1/proxy/{resource}/{id}`
pub async fn proxy_item(
    State(s): State<Arc<GatewayState>>,
    Extension(auth): Extension<AuthSession>,
    Path((resource, id)): Path<(String, String)>,
    method: Method,
    body: Bytes,
) -> Result<Response, GatewayError> {
    forward(&s, auth, resource, Some(id), method, body).await
}

async fn forward(
    s: &GatewayState,
    AuthSession(handle): AuthSession,
    resource: String,
    id: Option<String>,
    method: Method,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let method = ProxyMethod::from_http(&method)
        .ok_or_else(|| GatewayError::BadRequest(format!("unsupported method {method}")))?;
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(
            serde_json::from_slice::<Value>(&body)
                .map_err(|e| GatewayError::BadRequest(format!("invalid JSON body: {e}")))?,
        )
    };

    let resp = s.gateway.forward(&handle, ForwardRequest { resource, id, method, body }).await?;

    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::OK);
    let mut out = (status, Json(resp.body)).into_response();
    if let Some(collection) = resp.invalidated {
        if let Ok(value) = HeaderValue::from_str(&collection) {
            out.headers_mut().insert(INVALIDATE_HEADER, value);
        }
    }
    Ok(out)
}
