//! Persisted session snapshot and timer restoration math.
//!
//! The snapshot is the single unit of persistence: every field is written
//! together on mutation and cleared together on teardown, so a reader can
//! never observe a message list without its matching credential.

use serde::{Deserialize, Serialize};

use crate::domain::{Message, ProviderKind, View};

/// Countdown state persisted on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    /// Seconds left on the countdown at save time.
    pub remaining_secs: i64,
    /// Wall-clock time of the save, epoch milliseconds.
    pub saved_at_ms: i64,
}

/// Complete persisted state of one mailbox session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Full mailbox address.
    pub email: String,
    /// Password for re-authentication; may be empty.
    #[serde(default)]
    pub password: String,
    /// Bearer token for authenticated calls.
    pub token: String,
    /// Provider-assigned account identifier.
    pub account_id: String,
    /// Last known inbox, including client-side `seen` flags.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Screen the client was on.
    #[serde(default)]
    pub view: View,
    /// Backend that owns the mailbox. Snapshots written before this field
    /// existed restore against the primary provider.
    #[serde(default)]
    pub provider: ProviderKind,
    /// When the mailbox was created (or last extended), epoch milliseconds.
    pub created_at_ms: i64,
    /// Countdown state from the last tick, if any was persisted.
    #[serde(default)]
    pub timer: Option<TimerState>,
}

impl PersistedSession {
    /// Whether the snapshot carries the minimum fields needed to restore
    /// a session: address, token, and account identifier.
    pub fn is_restorable(&self) -> bool {
        !self.email.is_empty() && !self.token.is_empty() && !self.account_id.is_empty()
    }
}

/// Computes the remaining seconds for a restored session.
///
/// Two independent derivations guard against a stale persisted timer
/// understating elapsed time (ticks can be skipped while a client is
/// suspended):
///
/// - from the persisted countdown: `remaining - seconds_since_save`
/// - from the creation anchor: `window - seconds_since_creation`
///
/// When the countdown-derived value is positive the smaller of the two
/// wins; when it has run out, the creation-derived value alone decides.
/// A result of zero means the session must be discarded, not restored.
pub fn restored_remaining(
    timer: Option<TimerState>,
    created_at_ms: i64,
    now_ms: i64,
    window_secs: i64,
) -> i64 {
    let elapsed_since_creation = (now_ms - created_at_ms) / 1000;
    let from_creation = (window_secs - elapsed_since_creation).clamp(0, window_secs);

    match timer {
        Some(timer) => {
            let elapsed_since_save = (now_ms - timer.saved_at_ms) / 1000;
            let from_timer = (timer.remaining_secs - elapsed_since_save).max(0);
            if from_timer > 0 {
                from_timer.min(from_creation)
            } else {
                from_creation
            }
        }
        None => from_creation,
    }
}
