// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport for the session gateway.

pub mod auth;
pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::GatewayState;

/// Build the axum `Router` with all gateway routes.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/api/v1/health", get(http::health))
        // Session lifecycle
        .route("/api/v1/auth/login", post(http::login))
        .route("/api/v1/auth/federated/{provider}", post(http::login_federated))
        .route("/api/v1/auth/register", post(http::register))
        .route("/api/v1/auth/logout", post(http::logout))
        .route("/api/v1/auth/session", get(http::session_info))
        // Authenticated proxy
        .route(
            "/api/v1/proxy/{resource}",
            get(http::proxy_collection)
                .post(http::proxy_collection)
                .put(http::proxy_collection)
                .delete(http::proxy_collection),
        )
        .route(
            "/api/v1/proxy/{resource}/{id}",
            get(http::proxy_item)
                .post(http::proxy_item)
                .put(http::proxy_item)
                .delete(http::proxy_item),
        )
        // Invalidation feed
        .route("/ws/invalidations", get(ws::ws_invalidations_handler))
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
