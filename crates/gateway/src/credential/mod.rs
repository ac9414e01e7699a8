// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential handling: login, federated exchange, registration and refresh.
//!
//! The authenticator turns credentials into a [`Session`](crate::session::Session);
//! the refresh coordinator keeps that session's access token usable.

pub mod authenticator;
pub mod refresh;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Backend endpoint for first-party login.
pub const LOGIN_PATH: &str = "auth/login/";
/// Backend endpoint for access-token refresh.
pub const REFRESH_PATH: &str = "auth/token/refresh/";
/// Backend endpoint for account registration.
pub const REGISTER_PATH: &str = "auth/register/";

/// What a client presents to establish a session.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Identifier (email) + secret.
    Password { identifier: String, secret: String },
    /// Identity assertion from a third-party provider (e.g. a Google ID token).
    Federated { provider: String, assertion: String },
}

// Manual Debug: secrets and assertions never reach logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { identifier, .. } => f
                .debug_struct("Password")
                .field("identifier", identifier)
                .field("secret", &"<redacted>")
                .finish(),
            Self::Federated { provider, .. } => f
                .debug_struct("Federated")
                .field("provider", provider)
                .field("assertion", &"<redacted>")
                .finish(),
        }
    }
}

/// Body of `POST auth/login/`.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST <provider>/`.
#[derive(Serialize)]
pub(crate) struct ExchangeRequest<'a> {
    pub access_token: &'a str,
}

/// Body of `POST auth/token/refresh/`.
#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Successful login or exchange answer.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub user: Value,
    pub access: String,
    pub refresh: String,
}

/// Successful refresh answer. `refresh` is present only when the backend
/// rotates refresh tokens.
#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// New-account request, passed through to `auth/register/`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Backend answer to a registration, relayed as is.
#[derive(Debug, Clone)]
pub struct Registered {
    pub status: u16,
    pub body: Value,
}
