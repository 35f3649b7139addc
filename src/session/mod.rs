//! Durable session store
//!
//! Sessions live in memory and are written through to a single JSON
//! snapshot file after every mutation. Mutations on one session are
//! serialized by a per-session lock held across the change and the
//! snapshot write; different sessions only contend on the short map
//! lock and the snapshot writer.
//!
//! A failed snapshot write is logged and otherwise ignored: the
//! in-memory state stays authoritative for the running process.

use crate::error::{PilotError, Result};
use crate::identity::Identity;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub mod types;
pub use types::{ImportOutcome, RecordOrigin, Session, UploadRecord};

/// Store of sessions keyed by id, persisted as a full snapshot
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    sessions: RwLock<HashMap<String, Session>>,
    session_locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
    snapshot_lock: Mutex<()>,
}

impl SessionStore {
    /// Open the store backed by `path`, loading any existing snapshot
    ///
    /// A missing file yields an empty store. A file that cannot be parsed
    /// is moved aside to `<path>.corrupt` and the store starts empty, as
    /// does one that cannot be read at all.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let sessions = load_snapshot(&path).await?;

        tracing::info!(
            path = %path.display(),
            sessions = sessions.len(),
            "Opened session store"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                path,
                sessions: RwLock::new(sessions),
                session_locks: std::sync::Mutex::new(HashMap::new()),
                snapshot_lock: Mutex::new(()),
            }),
        })
    }

    /// Snapshot file location
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Create a session from raw key material
    ///
    /// # Errors
    ///
    /// Returns `PilotError::InvalidCredentials` if the key cannot be parsed;
    /// no session is created in that case.
    pub async fn create(&self, raw_key: &str) -> Result<Session> {
        let identity = Identity::from_private_key(raw_key)?;

        let session = Session {
            id: new_session_id(),
            credentials: identity.credentials,
            address: identity.address,
            uploads: Vec::new(),
            created_at: Utc::now(),
        };

        {
            let mut sessions = self.inner.sessions.write().await;
            sessions.insert(session.id.clone(), session.clone());
        }
        self.persist().await;

        tracing::info!(session_id = %session.id, address = %session.address, "Created session");
        Ok(session)
    }

    /// Fetch a copy of a session
    ///
    /// # Errors
    ///
    /// Returns `PilotError::SessionNotFound` if the id is unknown.
    pub async fn get(&self, id: &str) -> Result<Session> {
        let sessions = self.inner.sessions.read().await;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| PilotError::SessionNotFound(id.to_string()).into())
    }

    /// True if the session exists
    pub async fn contains(&self, id: &str) -> bool {
        self.inner.sessions.read().await.contains_key(id)
    }

    /// Number of sessions held
    pub async fn len(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    /// True if the store holds no sessions
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Append a record to a session's history and persist
    ///
    /// # Errors
    ///
    /// Returns `PilotError::SessionNotFound` if the id is unknown.
    pub async fn append_upload(&self, id: &str, record: UploadRecord) -> Result<()> {
        let lock = self.session_lock(id);
        let _guard = lock.lock().await;

        {
            let mut sessions = self.inner.sessions.write().await;
            let session = sessions
                .get_mut(id)
                .ok_or_else(|| PilotError::SessionNotFound(id.to_string()))?;
            tracing::debug!(session_id = %id, name = %record.name, "Appending upload record");
            session.uploads.push(record);
        }

        self.persist().await;
        Ok(())
    }

    /// Remove every record named `name` and persist
    ///
    /// Returns the number of records removed.
    ///
    /// # Errors
    ///
    /// Returns `PilotError::SessionNotFound` if the id is unknown.
    pub async fn remove_upload(&self, id: &str, name: &str) -> Result<usize> {
        let lock = self.session_lock(id);
        let _guard = lock.lock().await;

        let removed = {
            let mut sessions = self.inner.sessions.write().await;
            let session = sessions
                .get_mut(id)
                .ok_or_else(|| PilotError::SessionNotFound(id.to_string()))?;
            let before = session.uploads.len();
            session.uploads.retain(|u| u.name != name);
            before - session.uploads.len()
        };

        self.persist().await;
        Ok(removed)
    }

    /// Import names that already exist remotely
    ///
    /// Names already present in the history (or repeated within `names`)
    /// are skipped, so importing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PilotError::SessionNotFound` if the id is unknown.
    pub async fn import_existing(&self, id: &str, names: &[String]) -> Result<ImportOutcome> {
        let lock = self.session_lock(id);
        let _guard = lock.lock().await;

        let outcome = {
            let mut sessions = self.inner.sessions.write().await;
            let session = sessions
                .get_mut(id)
                .ok_or_else(|| PilotError::SessionNotFound(id.to_string()))?;

            let mut added = 0;
            for name in names {
                let name = name.trim();
                if name.is_empty() || session.has_upload(name) {
                    continue;
                }
                session.uploads.push(UploadRecord::imported(name));
                added += 1;
            }

            ImportOutcome {
                added,
                total: session.uploads.len(),
            }
        };

        self.persist().await;
        tracing::info!(session_id = %id, added = outcome.added, total = outcome.total, "Imported existing blobs");
        Ok(outcome)
    }

    /// Remove a session and persist
    ///
    /// # Errors
    ///
    /// Returns `PilotError::SessionNotFound` if the id is unknown.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let lock = self.session_lock(id);
        let existed = {
            let _guard = lock.lock().await;
            let removed = self.inner.sessions.write().await.remove(id);
            if removed.is_some() {
                self.persist().await;
            }
            removed.is_some()
        };

        self.inner
            .session_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id);

        if !existed {
            return Err(PilotError::SessionNotFound(id.to_string()).into());
        }

        tracing::info!(session_id = %id, "Deleted session");
        Ok(())
    }

    fn session_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .inner
            .session_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(id.to_string()).or_default().clone()
    }

    /// Write the full snapshot; failures are logged, not returned
    async fn persist(&self) {
        if let Err(e) = self.write_snapshot().await {
            tracing::error!(
                path = %self.inner.path.display(),
                error = %e,
                "Failed to write session snapshot"
            );
        }
    }

    async fn write_snapshot(&self) -> Result<()> {
        // Serializing under the writer lock keeps the last file written at
        // least as new as every mutation that preceded it.
        let _writer = self.inner.snapshot_lock.lock().await;

        let json = {
            let sessions = self.inner.sessions.read().await;
            let ordered: BTreeMap<&String, &Session> = sessions.iter().collect();
            serde_json::to_vec_pretty(&ordered).map_err(PilotError::from)?
        };

        if let Some(parent) = self.inner.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PilotError::Persistence(e.to_string()))?;
            }
        }

        let tmp_path = tmp_path_for(&self.inner.path);
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|e| PilotError::Persistence(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &self.inner.path)
            .await
            .map_err(|e| PilotError::Persistence(e.to_string()))?;

        Ok(())
    }
}

/// Read a snapshot file into a session map
///
/// Unreadable files are logged and yield an empty map. Files that do not
/// decode are moved to `<file>.corrupt` first.
pub async fn load_snapshot(path: &Path) -> Result<HashMap<String, Session>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Ok(HashMap::new()),
    }

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Session snapshot is unreadable, starting empty"
            );
            return Ok(HashMap::new());
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(HashMap::new());
    }

    match serde_json::from_slice::<HashMap<String, Session>>(&bytes) {
        Ok(sessions) => Ok(sessions),
        Err(e) => {
            let backup = sibling_path(path, ".corrupt");
            tracing::warn!(
                path = %path.display(),
                backup = %backup.display(),
                error = %e,
                "Session snapshot is corrupt, starting empty"
            );
            if let Err(e) = tokio::fs::rename(path, &backup).await {
                tracing::warn!(error = %e, "Could not move corrupt snapshot aside");
            }
            Ok(HashMap::new())
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    sibling_path(path, ".tmp")
}

/// `path` with `suffix` appended to its file name
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "sessions.json".into());
    name.push(suffix);
    path.with_file_name(name)
}

fn new_session_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}
