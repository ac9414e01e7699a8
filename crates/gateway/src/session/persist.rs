// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session persistence: load/save to JSON file with atomic writes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::session::{Session, SessionId};

/// Persisted state for all live sessions.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PersistedSessions {
    #[serde(default)]
    pub sessions: HashMap<SessionId, Session>,
}

/// Load persisted sessions from a JSON file.
pub fn load(path: &Path) -> anyhow::Result<PersistedSessions> {
    let contents = std::fs::read_to_string(path)?;
    let sessions: PersistedSessions = serde_json::from_str(&contents)?;
    Ok(sessions)
}

/// Save persisted sessions to a JSON file atomically (write tmp + rename).
///
/// The temp filename carries PID + counter so concurrent saves never share
/// a `.tmp` file.
pub fn save(path: &Path, sessions: &PersistedSessions) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let json = serde_json::to_string_pretty(sessions)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Write-through journal of session snapshots.
///
/// Holds its own copy of every session so a save never needs to lock a
/// session slot.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    snapshot: Mutex<PersistedSessions>,
}

impl Journal {
    pub fn new(path: PathBuf, initial: PersistedSessions) -> Self {
        Self { path, snapshot: Mutex::new(initial) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record (insert or replace) a session and flush to disk.
    pub async fn record(&self, session: &Session) {
        let mut snapshot = self.snapshot.lock().await;
        snapshot.sessions.insert(session.id().clone(), session.clone());
        self.flush(&snapshot);
    }

    /// Drop a session from the journal and flush to disk.
    pub async fn forget(&self, id: &SessionId) {
        let mut snapshot = self.snapshot.lock().await;
        if snapshot.sessions.remove(id).is_some() {
            self.flush(&snapshot);
        }
    }

    fn flush(&self, snapshot: &PersistedSessions) {
        if let Err(e) = save(&self.path, snapshot) {
            tracing::warn!(path = %self.path.display(), err = %e, "failed to persist sessions");
        }
    }
}
