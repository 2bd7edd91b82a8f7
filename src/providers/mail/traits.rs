//! Mail provider trait definition.
//!
//! This module defines the [`MailProvider`] trait which abstracts over the
//! third-party disposable-mail backends. The two real backends differ
//! structurally (one registers accounts and authenticates with bearer
//! tokens, the other is a stateless address space polled by local part and
//! domain); the trait normalizes both into one capability surface so no
//! caller ever branches on provider identity.

use async_trait::async_trait;

use crate::domain::{Account, AuthToken, Domain, Message, MessageDetail, ProviderKind};

/// Result type alias for mail provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur during mail provider operations.
///
/// Classification happens at the adapter boundary, from HTTP status codes
/// and provider payloads; callers match on variants, never on message text.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request was abandoned after the configured deadline.
    #[error("request timed out")]
    Timeout,

    /// Transport failure or unexpected HTTP error status.
    #[error("network error: {0}")]
    Network(String),

    /// The provider signaled throttling; do not retry immediately.
    #[error("rate limited by provider")]
    RateLimited,

    /// The requested address is already registered.
    #[error("address already taken")]
    AddressTaken,

    /// Credentials were rejected during authentication.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A previously issued credential is no longer accepted.
    #[error("token expired")]
    TokenExpired,

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Provider-reported failure that fits no other variant.
    #[error("provider error: {0}")]
    Provider(String),
}

impl ProviderError {
    /// Classifies a reqwest transport error.
    ///
    /// Deadline expiry maps to [`ProviderError::Timeout`]; everything else
    /// is a generic transport failure.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Trait implemented by each disposable-mail backend adapter.
///
/// All methods are async and map provider wire formats into the common
/// domain model immediately; provider-specific field names never leak past
/// an implementation.
///
/// Message operations take the full mailbox address as provider scope: the
/// token-based backend ignores it, the stateless backend derives its
/// login/domain pair from it.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Returns which backend this adapter speaks to.
    fn kind(&self) -> ProviderKind;

    /// Lists the mailbox domains currently offered by the provider.
    ///
    /// Response order is preserved; the first entry is the default
    /// suggestion.
    async fn get_domains(&self) -> Result<Vec<Domain>>;

    /// Registers a mailbox for the given address.
    ///
    /// A stateless backend satisfies this without a network call by
    /// synthesizing the account from the requested address.
    ///
    /// # Errors
    ///
    /// [`ProviderError::RateLimited`] on throttling,
    /// [`ProviderError::AddressTaken`] on registration conflict.
    async fn create_account(&self, address: &str, password: &str) -> Result<Account>;

    /// Exchanges credentials for a bearer token.
    ///
    /// A stateless backend synthesizes the token deterministically from
    /// the local part of the address.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Auth`] on invalid credentials.
    async fn get_auth_token(&self, address: &str, password: &str) -> Result<AuthToken>;

    /// Lists inbox messages.
    ///
    /// Providers without a read-state concept report `seen = false` and
    /// leave merging with prior client state to the caller.
    ///
    /// # Errors
    ///
    /// [`ProviderError::TokenExpired`] when the credential is rejected.
    async fn get_messages(&self, token: &str, address: &str) -> Result<Vec<Message>>;

    /// Fetches one message including its body.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NotFound`] when the message does not exist.
    async fn get_message(&self, token: &str, address: &str, id: &str) -> Result<MessageDetail>;

    /// Deletes one message. Best-effort: backends without message deletion
    /// no-op successfully.
    async fn delete_message(&self, token: &str, id: &str) -> Result<()>;

    /// Deletes the remote account. Best-effort: backends without account
    /// deletion no-op successfully.
    async fn delete_account(&self, token: &str, account_id: &str) -> Result<()>;
}
