// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::GatewayError;
use crate::session::TokenLifetimes;

/// Configuration for the session gateway.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "sessiongate", version, about = "Session token gateway for an identity backend")]
pub struct GatewayConfig {
    /// Base URL of the identity backend (e.g. `https://api.example.com/api/`).
    #[arg(long, env = "SESSIONGATE_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "SESSIONGATE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9900, env = "SESSIONGATE_PORT")]
    pub port: u16,

    /// Access token lifetime assumed at issuance, in seconds.
    #[arg(long, default_value_t = 45 * 60, env = "SESSIONGATE_ACCESS_LIFETIME_SECS")]
    pub access_lifetime_secs: u64,

    /// Refresh token lifetime assumed at issuance, in seconds.
    #[arg(long, default_value_t = 6 * 24 * 60 * 60, env = "SESSIONGATE_REFRESH_LIFETIME_SECS")]
    pub refresh_lifetime_secs: u64,

    /// Timeout for every outbound backend call, in milliseconds.
    #[arg(long, default_value_t = 5000, env = "SESSIONGATE_BACKEND_TIMEOUT_MS")]
    pub backend_timeout_ms: u64,

    /// Resource collections the proxy may forward to (repeatable).
    #[arg(
        long = "resource",
        env = "SESSIONGATE_RESOURCES",
        value_delimiter = ',',
        default_values = ["movies", "users"]
    )]
    pub resources: Vec<String>,

    /// Third-party identity exchange endpoints accepted for federated login.
    #[arg(
        long = "federated-provider",
        env = "SESSIONGATE_FEDERATED_PROVIDERS",
        value_delimiter = ',',
        default_values = ["google"]
    )]
    pub federated_providers: Vec<String>,

    /// JSON file where sessions are persisted across restarts.
    #[arg(long, env = "SESSIONGATE_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Log format: `text` or `json`.
    #[arg(long, default_value = "text", env = "SESSIONGATE_LOG_FORMAT")]
    pub log_format: String,

    /// Log level filter (e.g. `info`, `sessiongate=debug`).
    #[arg(long, default_value = "info", env = "SESSIONGATE_LOG_LEVEL")]
    pub log_level: String,
}

impl GatewayConfig {
    /// Resolve the backend base URL.
    ///
    /// A trailing `/` is enforced so endpoint paths join beneath the base
    /// instead of replacing its last segment.
    pub fn backend_url(&self) -> Result<Url, GatewayError> {
        let raw = self.backend_url.as_deref().map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(GatewayError::Config(
                "backend URL is required (--backend-url or SESSIONGATE_BACKEND_URL)".to_owned(),
            ));
        }
        let mut url =
            Url::parse(raw).map_err(|e| GatewayError::Config(format!("invalid backend URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GatewayError::Config(format!(
                "backend URL must be http or https, got {}",
                url.scheme()
            )));
        }
        if url.cannot_be_a_base() {
            return Err(GatewayError::Config(format!("backend URL cannot be a base: {raw}")));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes {
            access: Duration::from_secs(self.access_lifetime_secs),
            refresh: Duration::from_secs(self.refresh_lifetime_secs),
        }
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
