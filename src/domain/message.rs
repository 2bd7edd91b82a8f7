//! Message domain types.
//!
//! Represents inbox summaries and fully fetched messages, normalized from
//! each provider's wire format at the adapter boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A message endpoint with optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Display name; empty when the provider reports none.
    #[serde(default)]
    pub name: String,
    /// Email address.
    pub address: String,
}

impl Address {
    /// Creates an address with no display name.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            address: address.into(),
        }
    }

    /// Creates an address with a display name.
    pub fn with_name(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// An inbox message summary.
///
/// `seen` is client-owned state: not every provider reports it, and the
/// client's value survives refresh cycles via [`merge_preserving_seen`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Provider-assigned message identifier.
    pub id: String,
    /// Sender.
    pub from: Address,
    /// Recipients.
    #[serde(default)]
    pub to: Vec<Address>,
    /// Subject line.
    #[serde(default)]
    pub subject: String,
    /// Short preview of the body.
    #[serde(default)]
    pub intro: String,
    /// Delivery timestamp.
    pub created_at: DateTime<Utc>,
    /// Whether the message has been opened.
    #[serde(default)]
    pub seen: bool,
}

/// A fully fetched message, body included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDetail {
    /// Provider-assigned message identifier.
    pub id: String,
    /// Sender.
    pub from: Address,
    /// Recipients.
    #[serde(default)]
    pub to: Vec<Address>,
    /// Subject line.
    #[serde(default)]
    pub subject: String,
    /// Short preview of the body.
    #[serde(default)]
    pub intro: String,
    /// Delivery timestamp.
    pub created_at: DateTime<Utc>,
    /// Whether the message has been opened.
    #[serde(default)]
    pub seen: bool,
    /// HTML body parts.
    #[serde(default)]
    pub html: Vec<String>,
    /// Plain text body.
    #[serde(default)]
    pub text: String,
}

impl MessageDetail {
    /// Returns the summary view of this message.
    pub fn summary(&self) -> Message {
        Message {
            id: self.id.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            subject: self.subject.clone(),
            intro: self.intro.clone(),
            created_at: self.created_at,
            seen: self.seen,
        }
    }
}

/// Merges a freshly fetched message list with the previous in-memory list.
///
/// For every id present in both lists the previous `seen` value wins, so a
/// provider that does not track read state cannot reset it. The merged list
/// is sorted by delivery time, newest first.
pub fn merge_preserving_seen(previous: &[Message], mut fetched: Vec<Message>) -> Vec<Message> {
    let seen_by_id: HashMap<&str, bool> = previous
        .iter()
        .map(|msg| (msg.id.as_str(), msg.seen))
        .collect();

    for msg in &mut fetched {
        if let Some(seen) = seen_by_id.get(msg.id.as_str()) {
            msg.seen = *seen;
        }
    }

    fetched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    fetched
}
