// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sessiongate: session token lifecycle manager and authenticated proxy for
//! an identity backend.

pub mod backend;
pub mod clock;
pub mod config;
pub mod credential;
pub mod error;
pub mod invalidate;
pub mod proxy;
pub mod session;
pub mod state;
pub mod test_support;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::clock::SystemClock;
use crate::config::GatewayConfig;
use crate::state::GatewayState;
use crate::transport::build_router;

/// Run the gateway server until shutdown.
pub async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let state = Arc::new(GatewayState::new(config, Arc::new(SystemClock), shutdown.clone())?);
    tracing::info!(
        resources = %state.gateway.resources().names().collect::<Vec<_>>().join(","),
        sessions = state.store.len().await,
        "sessiongate listening on {addr}"
    );

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                shutdown.cancel();
            }
        });
    }

    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
