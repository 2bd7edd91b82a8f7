//! Core enums shared across the crate.
//!
//! These types identify which mail backend owns a mailbox and which screen
//! the client is on; both are persisted as part of the session snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a concrete mail backend.
///
/// [`ProviderKind::MailTm`] is the fixed primary provider: it is the default
/// for new sessions and the target of the domain-listing fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// mail.tm, account/token based.
    MailTm,
    /// 1secmail, stateless address space.
    OneSec,
}

impl ProviderKind {
    /// The provider used by default and as the fallback target.
    pub const PRIMARY: ProviderKind = ProviderKind::MailTm;
}

impl Default for ProviderKind {
    fn default() -> Self {
        Self::PRIMARY
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::MailTm => write!(f, "mail.tm"),
            ProviderKind::OneSec => write!(f, "1secmail"),
        }
    }
}

/// The screen the client is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Address generation form, no active mailbox shown.
    Generator,
    /// Message list for the active mailbox.
    Inbox,
    /// A single opened message.
    Detail,
}

impl Default for View {
    fn default() -> Self {
        Self::Generator
    }
}
