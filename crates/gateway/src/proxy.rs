// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated proxy: forwards resource calls to the backend with the
//! session's access token attached.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use crate::backend::BackendClient;
use crate::credential::refresh::RefreshCoordinator;
use crate::error::GatewayError;
use crate::invalidate::Invalidator;
use crate::session::store::SessionHandle;

const MAX_SEGMENT_LEN: usize = 128;

/// Methods the proxy forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl ProxyMethod {
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::Get)
    }

    pub fn from_http(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Self::Get),
            Method::POST => Some(Self::Post),
            Method::PUT => Some(Self::Put),
            Method::DELETE => Some(Self::Delete),
            _ => None,
        }
    }

    fn as_http(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for ProxyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_http().as_str())
    }
}

/// Whitelist of resource collections the proxy may reach.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    names: HashSet<String>,
}

impl ResourceRegistry {
    pub fn new<I, S>(names: I) -> Result<Self, GatewayError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = HashSet::new();
        for name in names {
            let name = name.into();
            if !is_safe_segment(&name) {
                return Err(GatewayError::Config(format!("invalid resource name: {name:?}")));
            }
            set.insert(name);
        }
        Ok(Self { names: set })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Backend path for a collection or one item in it, always with a
    /// trailing slash.
    pub fn path_for(&self, resource: &str, id: Option<&str>) -> Result<String, GatewayError> {
        if !self.contains(resource) {
            return Err(GatewayError::UnknownResource(resource.to_owned()));
        }
        match id {
            None => Ok(format!("{resource}/")),
            Some(id) if is_safe_segment(id) => Ok(format!("{resource}/{id}/")),
            Some(id) => Err(GatewayError::BadRequest(format!("invalid resource id: {id:?}"))),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

fn is_safe_segment(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_SEGMENT_LEN
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// One call to forward.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub resource: String,
    pub id: Option<String>,
    pub method: ProxyMethod,
    /// Ignored for GET.
    pub body: Option<Value>,
}

/// Backend answer relayed to the caller.
#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: u16,
    pub body: Value,
    /// Collection invalidated by this call, for mutations that succeeded.
    pub invalidated: Option<String>,
}

pub struct Gateway {
    backend: BackendClient,
    refresher: Arc<RefreshCoordinator>,
    resources: ResourceRegistry,
    invalidator: Arc<Invalidator>,
}

impl Gateway {
    pub fn new(
        backend: BackendClient,
        refresher: Arc<RefreshCoordinator>,
        resources: ResourceRegistry,
        invalidator: Arc<Invalidator>,
    ) -> Self {
        Self { backend, refresher, resources, invalidator }
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    /// Forward one call on behalf of `handle`'s session.
    ///
    /// The token used is the one [`RefreshCoordinator::ensure_fresh`] hands
    /// back, so an expired access token is never sent. A backend 401 on the
    /// forwarded call is relayed, not retried.
    pub async fn forward(
        &self,
        handle: &SessionHandle,
        req: ForwardRequest,
    ) -> Result<ForwardResponse, GatewayError> {
        let path = self.resources.path_for(&req.resource, req.id.as_deref())?;
        let session = self.refresher.ensure_fresh(handle).await?;

        let body = if req.method.is_mutation() { req.body.as_ref() } else { None };
        let resp = self
            .backend
            .request(req.method.as_http(), &path, Some(session.access_token()), body)
            .await?;

        tracing::debug!(
            session = %handle.id(),
            method = %req.method,
            path,
            status = resp.status,
            "forwarded"
        );

        if !resp.is_success() {
            if (400..500).contains(&resp.status) {
                if let Some(details @ (Value::Object(_) | Value::Array(_))) = resp.json_value() {
                    return Err(GatewayError::Validation { status: resp.status, details });
                }
            }
            return Err(resp.backend_error());
        }

        // The backend committed the change; signal before looking at the body.
        let invalidated = if req.method.is_mutation() {
            self.invalidator.invalidate(&req.resource, session.user_id());
            Some(req.resource)
        } else {
            None
        };

        let status = if resp.status == 204 || resp.is_empty() { 200 } else { resp.status };
        Ok(ForwardResponse { status, body: resp.relay_body(), invalidated })
    }
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
