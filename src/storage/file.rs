//! JSON-file session store.
//!
//! Persists the session snapshot as a single JSON document under the
//! platform data directory. Writes go through a temp file followed by a
//! rename so a reader never observes a partial snapshot; a mutex
//! serializes writers so concurrent triggers (tick, poll result, user
//! action) resolve last-write-wins.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;
use tokio::sync::Mutex;

use super::{PersistedSession, Result, SessionStore, StoreError, TimerState};

const SNAPSHOT_FILE: &str = "session.json";

/// Session store backed by a JSON file on disk.
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    /// Creates a store under the platform data directory.
    pub fn new() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "tempbox").ok_or(StoreError::NoDataDir)?;
        let dir = dirs.data_local_dir();
        std::fs::create_dir_all(dir)?;
        Ok(Self::with_path(dir.join(SNAPSHOT_FILE)))
    }

    /// Creates a store at an explicit path.
    ///
    /// Useful for tests working in a temporary directory.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_snapshot(&self) -> Result<Option<PersistedSession>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                // A corrupt snapshot must not brick startup; treat it as
                // no session and let teardown paths clear the file.
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "discarding unreadable session snapshot"
                );
                Ok(None)
            }
        }
    }

    async fn write_snapshot(&self, session: &PersistedSession) -> Result<()> {
        let json = serde_json::to_vec_pretty(session)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<PersistedSession>> {
        self.read_snapshot().await
    }

    async fn save(&self, session: &PersistedSession) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_snapshot(session).await
    }

    async fn save_timer(&self, timer: TimerState) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let Some(mut session) = self.read_snapshot().await? else {
            return Ok(());
        };
        session.timer = Some(timer);
        self.write_snapshot(&session).await
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
