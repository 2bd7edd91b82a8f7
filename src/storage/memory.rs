//! In-memory session store for tests and ephemeral runs.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{PersistedSession, Result, SessionStore, TimerState};

/// Session store that keeps the snapshot in process memory.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<PersistedSession>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with a snapshot.
    pub fn with_snapshot(session: PersistedSession) -> Self {
        Self {
            inner: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<PersistedSession>> {
        Ok(self.inner.lock().await.clone())
    }

    async fn save(&self, session: &PersistedSession) -> Result<()> {
        *self.inner.lock().await = Some(session.clone());
        Ok(())
    }

    async fn save_timer(&self, timer: TimerState) -> Result<()> {
        if let Some(session) = self.inner.lock().await.as_mut() {
            session.timer = Some(timer);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.lock().await = None;
        Ok(())
    }
}
