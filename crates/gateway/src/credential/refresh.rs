// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token refresh coordinator.
//!
//! At most one refresh is in flight per session. Callers that arrive while a
//! refresh is running wait on the session's slot lock and then observe the
//! rotated token instead of issuing their own refresh.

use std::sync::Arc;

use crate::backend::BackendClient;
use crate::clock::Clock;
use crate::credential::{RefreshRequest, RefreshResponse, REFRESH_PATH};
use crate::error::GatewayError;
use crate::session::store::{SessionHandle, SessionStore};
use crate::session::{Session, TokenLifetimes};

pub struct RefreshCoordinator {
    backend: BackendClient,
    clock: Arc<dyn Clock>,
    lifetimes: TokenLifetimes,
    store: Arc<SessionStore>,
}

impl RefreshCoordinator {
    pub fn new(
        backend: BackendClient,
        clock: Arc<dyn Clock>,
        lifetimes: TokenLifetimes,
        store: Arc<SessionStore>,
    ) -> Self {
        Self { backend, clock, lifetimes, store }
    }

    /// Return a session whose access token is unexpired, refreshing first
    /// if needed.
    ///
    /// Errors:
    /// - [`GatewayError::SessionExpired`] when the session was ended, its
    ///   refresh token lapsed, or the backend rejected the refresh. The
    ///   session is torn down in all three cases.
    /// - [`GatewayError::BackendUnavailable`], [`GatewayError::Backend`] or
    ///   [`GatewayError::Protocol`] when the refresh could not complete. The
    ///   session is left as it was.
    pub async fn ensure_fresh(&self, handle: &SessionHandle) -> Result<Session, GatewayError> {
        // Held across the backend round trip.
        let mut slot = handle.lock().await;

        let Some(session) = slot.as_mut() else {
            return Err(GatewayError::SessionExpired);
        };

        let now = self.clock.now_secs();
        if !session.is_access_expired(now) {
            return Ok(session.clone());
        }

        if session.is_refresh_expired(now) {
            tracing::info!(session = %handle.id(), "refresh token expired, ending session");
            slot.take();
            drop(slot);
            self.store.remove(handle.id()).await;
            return Err(GatewayError::SessionExpired);
        }

        tracing::debug!(session = %handle.id(), "access token expired, refreshing");
        let body = RefreshRequest { refresh: session.refresh_token() };
        let resp = match self.backend.post_json(REFRESH_PATH, &body).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(session = %handle.id(), err = %e, "refresh failed, session kept");
                return Err(e);
            }
        };

        match resp.status {
            200..=299 => {
                let refreshed: RefreshResponse = resp.json()?;
                if refreshed.access.is_empty() {
                    return Err(GatewayError::Protocol(
                        "backend issued an empty access token".to_owned(),
                    ));
                }
                let rotated_refresh = refreshed.refresh.filter(|r| !r.is_empty());
                session.rotate(
                    refreshed.access,
                    rotated_refresh,
                    self.clock.now_secs(),
                    &self.lifetimes,
                );
                handle.checkpoint(session).await;
                tracing::info!(
                    session = %handle.id(),
                    expires_at = session.access_expires_at(),
                    "access token refreshed"
                );
                Ok(session.clone())
            }
            400 | 401 | 403 => {
                tracing::info!(
                    session = %handle.id(),
                    status = resp.status,
                    "refresh rejected, ending session"
                );
                slot.take();
                drop(slot);
                self.store.remove(handle.id()).await;
                Err(GatewayError::SessionExpired)
            }
            _ => {
                let err = resp.backend_error();
                tracing::warn!(session = %handle.id(), err = %err, "refresh failed, session kept");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
