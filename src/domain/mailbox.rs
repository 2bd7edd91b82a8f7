//! Mailbox provisioning types.
//!
//! A mailbox lifetime starts with a [`Domain`] suggestion, becomes an
//! [`Account`] on registration, and is authenticated as an [`AuthToken`].
//! All three live and die within one session window.

use serde::{Deserialize, Serialize};

/// A mailbox suffix offered by a provider.
///
/// Provider response order is preserved; the first entry is the default
/// suggestion for generated addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Provider-assigned identifier.
    pub id: String,
    /// The bare domain name, e.g. `example.com`.
    pub domain: String,
}

/// A mailbox registered with a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Provider-assigned account identifier.
    pub id: String,
    /// Full email address.
    pub address: String,
    /// Password used to (re-)authenticate.
    #[serde(default)]
    pub password: String,
}

/// Bearer credential plus the account identifier it belongs to.
///
/// Re-derivable from the address/password pair when it expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    /// Opaque bearer token.
    pub token: String,
    /// Account identifier for authenticated calls.
    pub id: String,
}

impl Domain {
    /// Creates a domain entry.
    pub fn new(id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
        }
    }
}

/// Splits a full address into local part and domain.
///
/// Returns the whole input as local part when no `@` is present.
pub fn split_address(address: &str) -> (&str, &str) {
    match address.split_once('@') {
        Some((local, domain)) => (local, domain),
        None => (address, ""),
    }
}
