// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Invalidation feed: streams mutation invalidations to clients over
//! `/ws/invalidations` so they can drop cached collection reads.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::error::GatewayError;
use crate::invalidate::{CollectionFilter, FeedMessage};
use crate::session::store::SessionHandle;
use crate::session::UserId;
use crate::state::GatewayState;
use crate::transport::auth;

/// Query parameters for the invalidation feed.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Gateway session id.
    pub token: Option<String>,
    /// Comma-separated collections, or "all" (default: all).
    pub collections: Option<String>,
}

/// `GET /ws/invalidations`: WebSocket upgrade for the invalidation stream.
pub async fn ws_invalidations_handler(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<FeedQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let handle = match auth::resolve(&state, query.token.as_deref()).await {
        Ok(handle) => handle,
        Err(e) => return e.into_response(),
    };
    let Some(session) = handle.get().await else {
        return GatewayError::SessionExpired.into_response();
    };

    let owner = session.user_id().clone();
    let filter = CollectionFilter::parse(query.collections.as_deref());
    ws.on_upgrade(move |socket| handle_feed_connection(state, handle, owner, filter, socket))
        .into_response()
}

/// Per-connection loop: forward the owner's matching invalidations until the
/// client leaves, the session ends or the server shuts down.
async fn handle_feed_connection(
    state: Arc<GatewayState>,
    handle: Arc<SessionHandle>,
    owner: UserId,
    filter: CollectionFilter,
    socket: WebSocket,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut rx = state.invalidator.subscribe();

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,
            _ = handle.ended() => {
                tracing::debug!(session = %handle.id(), "session ended, closing invalidation feed");
                break;
            }
            event = rx.recv() => {
                let msg = match event {
                    Ok(inv) if inv.owner == owner && filter.wants(&inv.collection) => {
                        FeedMessage::from(inv)
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(missed)) => {
                        tracing::debug!(missed, "invalidation feed lagged, asking for resync");
                        FeedMessage::Resync { missed }
                    }
                    Err(RecvError::Closed) => break,
                };
                if let Ok(json) = serde_json::to_string(&msg) {
                    if ws_tx.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    let _ = ws_tx.send(Message::Close(None)).await;
}
