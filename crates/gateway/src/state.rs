// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::backend::BackendClient;
use crate::clock::Clock;
use crate::config::GatewayConfig;
use crate::credential::authenticator::Authenticator;
use crate::credential::refresh::RefreshCoordinator;
use crate::error::GatewayError;
use crate::invalidate::Invalidator;
use crate::proxy::{Gateway, ResourceRegistry};
use crate::session::store::SessionStore;

/// Shared gateway state.
pub struct GatewayState {
    pub config: GatewayConfig,
    pub store: Arc<SessionStore>,
    pub authenticator: Authenticator,
    pub gateway: Gateway,
    pub invalidator: Arc<Invalidator>,
    pub clock: Arc<dyn Clock>,
    pub shutdown: CancellationToken,
    pub started_at: Instant,
}

impl GatewayState {
    /// Wire every component from config. Fails on a missing or invalid
    /// backend URL, a bad resource name or an unreadable state file.
    pub fn new(
        config: GatewayConfig,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Result<Self, GatewayError> {
        let backend = BackendClient::from_config(&config)?;
        let lifetimes = config.lifetimes();
        let resources = ResourceRegistry::new(config.resources.iter().cloned())?;

        let store = Arc::new(match config.state_file {
            Some(ref path) => SessionStore::with_journal(path.clone(), clock.now_secs()).map_err(
                |e| GatewayError::Config(format!("failed to load {}: {e:#}", path.display())),
            )?,
            None => SessionStore::new(),
        });

        let authenticator = Authenticator::new(
            backend.clone(),
            Arc::clone(&clock),
            lifetimes,
            config.federated_providers.clone(),
        );
        let refresher = Arc::new(RefreshCoordinator::new(
            backend.clone(),
            Arc::clone(&clock),
            lifetimes,
            Arc::clone(&store),
        ));
        let invalidator = Arc::new(Invalidator::default());
        let gateway = Gateway::new(backend, refresher, resources, Arc::clone(&invalidator));

        Ok(Self {
            config,
            store,
            authenticator,
            gateway,
            invalidator,
            clock,
            shutdown,
            started_at: Instant::now(),
        })
    }
}
