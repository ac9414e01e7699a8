// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session model: one authenticated actor's identity and backend tokens.
//!
//! Token fields are private. The access token and its expiry only change
//! together, through [`Session::issue`] and [`Session::rotate`].

pub mod persist;
pub mod store;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque gateway session identifier handed to clients as their bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random session id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend user identifier (`pk` or `id` of the backend's user object).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Extract the identifier from a backend user object.
    pub fn from_user(user: &Value) -> Option<Self> {
        let raw = user.get("pk").or_else(|| user.get("id"))?;
        match raw {
            Value::Number(n) => Some(Self(n.to_string())),
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the session was established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provider {
    /// First-party identifier + secret login.
    Credentials,
    /// Third-party identity assertion exchanged at `<name>/`.
    Federated { name: String },
}

/// Token lifetimes assumed at issuance. Expiry is computed locally, never
/// read from the tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::from_secs(45 * 60),
            refresh: Duration::from_secs(6 * 24 * 60 * 60),
        }
    }
}

/// One authenticated actor.
#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    user: Value,
    provider: Provider,
    access_token: String,
    refresh_token: String,
    /// Epoch seconds.
    access_expires_at: u64,
    /// Epoch seconds.
    refresh_expires_at: u64,
}

impl Session {
    /// Build a session from a freshly issued token pair.
    #[allow(clippy::too_many_arguments)]
    pub fn issue(
        id: SessionId,
        user_id: UserId,
        user: Value,
        provider: Provider,
        access_token: String,
        refresh_token: String,
        now: u64,
        lifetimes: &TokenLifetimes,
    ) -> Self {
        Self {
            id,
            user_id,
            user,
            provider,
            access_token,
            refresh_token,
            access_expires_at: now.saturating_add(lifetimes.access.as_secs()),
            refresh_expires_at: now.saturating_add(lifetimes.refresh.as_secs()),
        }
    }

    /// Replace the access token (and the refresh token, when the backend
    /// rotated it), recomputing the matching expiry instants.
    pub(crate) fn rotate(
        &mut self,
        access_token: String,
        refresh_token: Option<String>,
        now: u64,
        lifetimes: &TokenLifetimes,
    ) {
        self.access_token = access_token;
        self.access_expires_at = now.saturating_add(lifetimes.access.as_secs());
        if let Some(rt) = refresh_token {
            self.refresh_token = rt;
            self.refresh_expires_at = now.saturating_add(lifetimes.refresh.as_secs());
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn user(&self) -> &Value {
        &self.user
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn access_expires_at(&self) -> u64 {
        self.access_expires_at
    }

    pub fn refresh_expires_at(&self) -> u64 {
        self.refresh_expires_at
    }

    /// The access token is usable strictly before its expiry instant.
    pub fn is_access_expired(&self, now: u64) -> bool {
        now >= self.access_expires_at
    }

    /// Whether the session can no longer be refreshed at all.
    pub fn is_refresh_expired(&self, now: u64) -> bool {
        self.refresh_token.is_empty() || now >= self.refresh_expires_at
    }

    /// Client-facing view without token material.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id.clone(),
            user_id: self.user_id.clone(),
            user: self.user.clone(),
            provider: self.provider.clone(),
            access_expires_at: self.access_expires_at,
            refresh_expires_at: self.refresh_expires_at,
        }
    }
}

// Manual Debug: never print token material.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("provider", &self.provider)
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish_non_exhaustive()
    }
}

/// Session summary returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub user: Value,
    pub provider: Provider,
    pub access_expires_at: u64,
    pub refresh_expires_at: u64,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
