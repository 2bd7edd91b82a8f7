//! Runtime settings.
//!
//! Settings are stored in the user's config directory as JSON and loaded
//! at startup. Every field carries a serde default so partial files keep
//! working as fields are added.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::ProviderKind;

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Session window and timer cadence.
    pub session: SessionSettings,
    /// Address generation parameters.
    pub generation: GenerationSettings,
    /// Outbound HTTP behavior.
    pub http: HttpSettings,
}

/// Session window and timer cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Mailbox lifetime in seconds.
    pub window_secs: i64,
    /// Countdown tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Inbox poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Remaining seconds at which the expiry warning fires.
    pub expiry_warning_secs: i64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            window_secs: 600,
            tick_interval_ms: 1_000,
            poll_interval_ms: 5_000,
            expiry_warning_secs: 60,
        }
    }
}

impl SessionSettings {
    /// Countdown tick interval as a [`Duration`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Inbox poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Address generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Provider used when the caller does not pick one.
    pub default_provider: ProviderKind,
    /// Length of randomly generated usernames.
    pub username_len: usize,
    /// Length of generated passwords.
    pub password_len: usize,
    /// Maximum accepted length for caller-supplied usernames.
    pub max_username_len: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            default_provider: ProviderKind::PRIMARY,
            username_len: 10,
            password_len: 16,
            max_username_len: 20,
        }
    }
}

/// Outbound HTTP behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-request deadline in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
        }
    }
}

impl HttpSettings {
    /// Per-request deadline as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Settings {
    /// Returns the default settings file path under the platform config
    /// directory, if one is available.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tempbox").map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Loads settings from the default path, falling back to defaults
    /// when the file is missing or unreadable.
    pub fn load_or_default() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path).unwrap_or_default(),
            None => Self::default(),
        }
    }

    /// Loads settings from an explicit path.
    pub fn load_from(path: &Path) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(settings) => Some(settings),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring invalid settings file");
                None
            }
        }
    }

    /// Writes settings to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)
    }
}
