// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutation cache invalidation.
//!
//! After a successful mutation the proxy publishes one [`Invalidation`]
//! naming the touched collection and the user who made the change.
//! Subscribers (the `/ws/invalidations` feed, embedding code) drop any
//! cached reads of that collection. The feed only relays a user's own
//! invalidations, since backend collections are scoped per owner.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::session::UserId;

/// Signal that cached reads of `collection` are stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invalidation {
    pub collection: String,
    /// User whose mutation caused this.
    pub owner: UserId,
    /// Monotonic per-process sequence number.
    pub seq: u64,
}

/// Wire format of the invalidation feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedMessage {
    Invalidate { collection: String, seq: u64 },
    /// The subscriber missed messages; drop every cached read.
    Resync { missed: u64 },
}

impl From<Invalidation> for FeedMessage {
    fn from(inv: Invalidation) -> Self {
        Self::Invalidate { collection: inv.collection, seq: inv.seq }
    }
}

/// Which collections a subscriber cares about.
#[derive(Debug, Clone, Default)]
pub struct CollectionFilter {
    /// `None` means every collection.
    collections: Option<Vec<String>>,
}

impl CollectionFilter {
    /// Parse a comma-separated list; empty or `all` means every collection.
    pub fn parse(spec: Option<&str>) -> Self {
        let spec = spec.map(str::trim).unwrap_or_default();
        if spec.is_empty() || spec == "all" {
            return Self::default();
        }
        let collections =
            spec.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect();
        Self { collections: Some(collections) }
    }

    pub fn wants(&self, collection: &str) -> bool {
        match self.collections {
            None => true,
            Some(ref list) => list.iter().any(|c| c == collection),
        }
    }
}

/// Fan-out point for invalidation signals.
#[derive(Debug)]
pub struct Invalidator {
    tx: broadcast::Sender<Invalidation>,
    seq: AtomicU64,
}

impl Invalidator {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx, seq: AtomicU64::new(0) }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.tx.subscribe()
    }

    /// Publish an invalidation for `collection` on behalf of `owner`.
    /// Having no subscribers is not an error.
    pub fn invalidate(&self, collection: &str, owner: &UserId) -> Invalidation {
        let inv = Invalidation {
            collection: collection.to_owned(),
            owner: owner.clone(),
            seq: self.seq.fetch_add(1, Ordering::Relaxed) + 1,
        };
        let receivers = self.tx.send(inv.clone()).unwrap_or(0);
        tracing::debug!(
            collection,
            owner = %inv.owner,
            seq = inv.seq,
            receivers,
            "collection invalidated"
        );
        inv
    }
}

impl Default for Invalidator {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
#[path = "invalidate_tests.rs"]
mod tests;
