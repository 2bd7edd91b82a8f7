//! Session persistence.
//!
//! This module provides the durable key/value layer for the active
//! session:
//!
//! - [`PersistedSession`] / [`TimerState`] - the snapshot written as one
//!   unit on every mutation and cleared as one unit on teardown
//! - [`SessionStore`] - async trait over snapshot storage, with a file
//!   implementation and an in-memory implementation for tests
//! - [`restored_remaining`] - wall-clock reconciliation applied when a
//!   snapshot is restored after a reload

mod file;
mod memory;
mod snapshot;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;
pub use snapshot::{restored_remaining, PersistedSession, TimerState};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during snapshot persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("no platform data directory available")]
    NoDataDir,
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable storage for the active session snapshot.
///
/// Implementations must treat every write as a complete snapshot
/// replacement (last write wins) and must never persist a partial update.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the persisted snapshot, if any.
    async fn load(&self) -> Result<Option<PersistedSession>>;

    /// Replaces the persisted snapshot.
    async fn save(&self, session: &PersistedSession) -> Result<()>;

    /// Updates only the countdown state of the persisted snapshot.
    ///
    /// A no-op when no snapshot exists.
    async fn save_timer(&self, timer: TimerState) -> Result<()>;

    /// Removes the persisted snapshot entirely.
    async fn clear(&self) -> Result<()>;
}
