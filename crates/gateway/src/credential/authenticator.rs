// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential authenticator: exchanges credentials for a token pair and
//! builds a session from the answer.

use std::sync::Arc;

use crate::backend::{BackendClient, RawResponse};
use crate::clock::Clock;
use crate::credential::{
    Credentials, ExchangeRequest, LoginRequest, LoginResponse, Registered, Registration,
    LOGIN_PATH, REGISTER_PATH,
};
use crate::error::GatewayError;
use crate::session::{Provider, Session, SessionId, TokenLifetimes, UserId};

pub struct Authenticator {
    backend: BackendClient,
    clock: Arc<dyn Clock>,
    lifetimes: TokenLifetimes,
    providers: Vec<String>,
}

impl Authenticator {
    pub fn new(
        backend: BackendClient,
        clock: Arc<dyn Clock>,
        lifetimes: TokenLifetimes,
        providers: Vec<String>,
    ) -> Self {
        Self { backend, clock, lifetimes, providers }
    }

    /// Whether `name` is an accepted federated identity provider.
    pub fn knows_provider(&self, name: &str) -> bool {
        self.providers.iter().any(|p| p == name)
    }

    /// Exchange credentials for a new session.
    ///
    /// The session is not stored; the caller owns registration.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Session, GatewayError> {
        let (resp, provider) = match credentials {
            Credentials::Password { identifier, secret } => {
                let body = LoginRequest { email: identifier, password: secret };
                (self.backend.post_json(LOGIN_PATH, &body).await?, Provider::Credentials)
            }
            Credentials::Federated { provider, assertion } => {
                if !self.knows_provider(provider) {
                    return Err(GatewayError::UnknownProvider(provider.clone()));
                }
                let body = ExchangeRequest { access_token: assertion };
                let path = format!("{provider}/");
                (
                    self.backend.post_json(&path, &body).await?,
                    Provider::Federated { name: provider.clone() },
                )
            }
        };

        if !resp.is_success() {
            return Err(rejection(&resp));
        }

        let login: LoginResponse = resp.json()?;
        if login.access.is_empty() {
            return Err(GatewayError::Protocol("backend issued an empty access token".to_owned()));
        }
        let user_id = UserId::from_user(&login.user)
            .ok_or_else(|| GatewayError::Protocol("user object has no identifier".to_owned()))?;

        let session = Session::issue(
            SessionId::generate(),
            user_id,
            login.user,
            provider,
            login.access,
            login.refresh,
            self.clock.now_secs(),
            &self.lifetimes,
        );
        tracing::info!(
            session = %session.id(),
            user = %session.user_id(),
            provider = ?session.provider(),
            "session established"
        );
        Ok(session)
    }

    /// Create a backend account. Returns the backend's answer; no session
    /// is established.
    pub async fn register(&self, registration: &Registration) -> Result<Registered, GatewayError> {
        let resp = self.backend.post_json(REGISTER_PATH, registration).await?;
        if resp.is_success() {
            let status = if resp.status == 204 || resp.is_empty() { 200 } else { resp.status };
            return Ok(Registered { status, body: resp.relay_body() });
        }
        if (400..500).contains(&resp.status) {
            return Err(GatewayError::Validation {
                status: resp.status,
                details: resp.error_details(),
            });
        }
        Err(resp.backend_error())
    }
}

fn rejection(resp: &RawResponse) -> GatewayError {
    match resp.status {
        400 | 401 | 403 => GatewayError::InvalidCredentials { details: resp.error_details() },
        _ => resp.backend_error(),
    }
}

#[cfg(test)]
#[path = "authenticator_tests.rs"]
mod tests;
