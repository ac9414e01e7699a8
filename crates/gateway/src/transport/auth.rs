// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;
use crate::session::store::SessionHandle;
use crate::session::SessionId;
use crate::state::GatewayState;

/// The caller's session, resolved by [`auth_layer`].
#[derive(Clone)]
pub struct AuthSession(pub Arc<SessionHandle>);

/// Extract a Bearer token from HTTP headers.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get("authorization").and_then(|v| v.to_str().ok())?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve a presented gateway session id to its live handle.
pub async fn resolve(
    state: &GatewayState,
    token: Option<&str>,
) -> Result<Arc<SessionHandle>, GatewayError> {
    let token = token.ok_or(GatewayError::Unauthenticated)?;
    state.store.handle(&SessionId::from(token)).await.ok_or(GatewayError::SessionExpired)
}

fn is_public(path: &str) -> bool {
    matches!(
        path,
        "/api/v1/health" | "/api/v1/auth/login" | "/api/v1/auth/register"
    ) || path.starts_with("/api/v1/auth/federated/")
        || path.starts_with("/ws/")
}

/// Axum middleware that maps the Bearer session id to an [`AuthSession`].
///
/// Exempt: health, login, federated login, registration and WebSocket
/// upgrades (`/ws/`, authenticated via `?token=` in the handler).
pub async fn auth_layer(
    State(state): State<Arc<GatewayState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if is_public(req.uri().path()) {
        return next.run(req).await;
    }

    match resolve(&state, bearer_token(req.headers())).await {
        Ok(handle) => {
            req.extensions_mut().insert(AuthSession(handle));
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
