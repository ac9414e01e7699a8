// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session store: the single authoritative place a session lives.
//!
//! Each session sits behind its own [`SessionHandle`]. The handle's async
//! mutex is the per-session serialization point: the refresh coordinator
//! holds it across the whole refresh round trip.
//!
//! Journal writes for a session happen only under its slot lock while the
//! slot is occupied. Removal empties the slot before the journal forgets the
//! session, so an in-flight refresh can never write it back.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::session::persist::{self, Journal, PersistedSessions};
use crate::session::{Session, SessionId};

/// Handle to one session's slot. `None` means the session was ended.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    slot: Mutex<Option<Session>>,
    journal: Option<Arc<Journal>>,
    ended: CancellationToken,
}

impl SessionHandle {
    fn new(session: Session, journal: Option<Arc<Journal>>) -> Self {
        Self {
            id: session.id().clone(),
            slot: Mutex::new(Some(session)),
            journal,
            ended: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Snapshot of the current session, or `None` once cleared.
    pub async fn get(&self) -> Option<Session> {
        self.slot.lock().await.clone()
    }

    /// Replace the whole session atomically. An ended session stays ended;
    /// returns whether the replacement happened.
    pub async fn put(&self, session: Session) -> bool {
        let mut slot = self.slot.lock().await;
        if slot.is_none() {
            return false;
        }
        self.checkpoint(&session).await;
        *slot = Some(session);
        true
    }

    /// End the session. Returns whether it was still present.
    pub async fn clear(&self) -> bool {
        let was_present = self.slot.lock().await.take().is_some();
        self.ended.cancel();
        was_present
    }

    /// Resolves once the session has been ended.
    pub fn ended(&self) -> WaitForCancellationFuture<'_> {
        self.ended.cancelled()
    }

    /// Exclusive access to the slot for read-check-write sequences.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.slot.lock().await
    }

    /// Write a session snapshot to the journal, if persistence is on.
    ///
    /// Callers hold the slot lock and the slot still holds the session.
    pub(crate) async fn checkpoint(&self, session: &Session) {
        if let Some(ref journal) = self.journal {
            journal.record(session).await;
        }
    }
}

/// All live sessions, keyed by gateway session id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<SessionHandle>>>,
    journal: Option<Arc<Journal>>,
}

impl SessionStore {
    /// In-memory store with no persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backed by a JSON journal at `path`.
    ///
    /// Existing sessions are loaded; those whose refresh token already
    /// expired at `now` are dropped. A missing file starts empty.
    pub fn with_journal(path: PathBuf, now: u64) -> anyhow::Result<Self> {
        let loaded =
            if path.exists() { persist::load(&path)? } else { PersistedSessions::default() };

        let mut live = PersistedSessions::default();
        for (id, session) in loaded.sessions {
            if session.is_refresh_expired(now) {
                tracing::debug!(session = %id, "dropping expired persisted session");
                continue;
            }
            live.sessions.insert(id, session);
        }
        let count = live.sessions.len();

        let journal = Arc::new(Journal::new(path, live.clone()));
        let sessions = live
            .sessions
            .into_values()
            .map(|s| {
                let id = s.id().clone();
                (id, Arc::new(SessionHandle::new(s, Some(Arc::clone(&journal)))))
            })
            .collect();

        tracing::info!(path = %journal.path().display(), count, "loaded persisted sessions");
        Ok(Self { sessions: RwLock::new(sessions), journal: Some(journal) })
    }

    /// Register a freshly issued session and return its handle.
    pub async fn insert(&self, session: Session) -> Arc<SessionHandle> {
        if let Some(ref journal) = self.journal {
            journal.record(&session).await;
        }
        let id = session.id().clone();
        let handle = Arc::new(SessionHandle::new(session, self.journal.clone()));
        self.sessions.write().await.insert(id, Arc::clone(&handle));
        handle
    }

    /// Look up a session handle by id.
    pub async fn handle(&self, id: &SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// End a session: clear its slot and forget it everywhere.
    ///
    /// Waits for any refresh in progress on the session to finish first.
    pub async fn remove(&self, id: &SessionId) -> bool {
        let handle = self.sessions.write().await.remove(id);
        if let Some(ref h) = handle {
            h.clear().await;
        }
        if let Some(ref journal) = self.journal {
            journal.forget(id).await;
        }
        handle.is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
