//! Provider selection and dispatch.
//!
//! The [`ProviderManager`] holds one adapter per [`ProviderKind`], the
//! active selection, and the active mailbox address from which
//! provider-specific scoping is derived. It is an explicitly constructed
//! value, injected into the session controller, so tests can substitute
//! fake adapters.
//!
//! Dispatch is thin: every capability call goes to the active adapter
//! unchanged. The single exception is domain listing, which falls back to
//! the primary provider once when the active one fails. No other
//! operation falls back, because switching providers mid-session would
//! orphan a real remote account.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{MailProvider, MailTmProvider, OneSecProvider, ProviderError, Result};
use crate::domain::{Account, AuthToken, Domain, Message, MessageDetail, ProviderKind};

/// Dispatches capability calls to the active provider adapter.
pub struct ProviderManager {
    adapters: HashMap<ProviderKind, Arc<dyn MailProvider>>,
    active: RwLock<ProviderKind>,
    /// Full address of the active mailbox; message operations pass it to
    /// the adapter as provider scope.
    mailbox: RwLock<Option<String>>,
}

impl ProviderManager {
    /// Creates a manager over the real backend adapters.
    pub fn new() -> Self {
        Self::with_adapters(vec![
            Arc::new(MailTmProvider::new()) as Arc<dyn MailProvider>,
            Arc::new(OneSecProvider::new()) as Arc<dyn MailProvider>,
        ])
    }

    /// Creates a manager over the given adapters, keyed by their kind.
    ///
    /// Later adapters of the same kind replace earlier ones.
    pub fn with_adapters(adapters: Vec<Arc<dyn MailProvider>>) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.kind(), adapter))
            .collect();

        Self {
            adapters,
            active: RwLock::new(ProviderKind::PRIMARY),
            mailbox: RwLock::new(None),
        }
    }

    /// Returns the currently active provider.
    pub async fn active(&self) -> ProviderKind {
        *self.active.read().await
    }

    /// Selects the active provider.
    pub async fn set_active(&self, kind: ProviderKind) {
        *self.active.write().await = kind;
    }

    /// Records the active mailbox address used as provider scope.
    pub async fn set_mailbox(&self, address: &str) {
        *self.mailbox.write().await = Some(address.to_string());
    }

    /// Clears the active mailbox address.
    pub async fn clear_mailbox(&self) {
        *self.mailbox.write().await = None;
    }

    fn adapter(&self, kind: ProviderKind) -> Result<&Arc<dyn MailProvider>> {
        self.adapters
            .get(&kind)
            .ok_or_else(|| ProviderError::Provider(format!("no adapter for {}", kind)))
    }

    async fn active_adapter(&self) -> Result<&Arc<dyn MailProvider>> {
        self.adapter(self.active().await)
    }

    async fn scope(&self) -> String {
        self.mailbox.read().await.clone().unwrap_or_default()
    }

    /// Lists domains from the active provider, falling back to the
    /// primary provider once if the active one fails.
    ///
    /// A failure of the primary itself propagates to the caller.
    pub async fn get_domains(&self) -> Result<Vec<Domain>> {
        let active = self.active().await;

        match self.adapter(active)?.get_domains().await {
            Ok(domains) => Ok(domains),
            Err(err) if active != ProviderKind::PRIMARY => {
                tracing::warn!(
                    provider = %active,
                    error = %err,
                    "domain listing failed, falling back to primary provider"
                );
                self.set_active(ProviderKind::PRIMARY).await;
                self.adapter(ProviderKind::PRIMARY)?.get_domains().await
            }
            Err(err) => Err(err),
        }
    }

    /// Registers a mailbox with the active provider.
    pub async fn create_account(&self, address: &str, password: &str) -> Result<Account> {
        self.active_adapter().await?.create_account(address, password).await
    }

    /// Authenticates against the active provider.
    pub async fn get_auth_token(&self, address: &str, password: &str) -> Result<AuthToken> {
        self.active_adapter().await?.get_auth_token(address, password).await
    }

    /// Lists inbox messages from the active provider.
    pub async fn get_messages(&self, token: &str) -> Result<Vec<Message>> {
        let scope = self.scope().await;
        self.active_adapter().await?.get_messages(token, &scope).await
    }

    /// Fetches one message from the active provider.
    pub async fn get_message(&self, token: &str, id: &str) -> Result<MessageDetail> {
        let scope = self.scope().await;
        self.active_adapter().await?.get_message(token, &scope, id).await
    }

    /// Deletes one message on the active provider.
    pub async fn delete_message(&self, token: &str, id: &str) -> Result<()> {
        self.active_adapter().await?.delete_message(token, id).await
    }

    /// Deletes the remote account on the active provider.
    pub async fn delete_account(&self, token: &str, account_id: &str) -> Result<()> {
        self.active_adapter().await?.delete_account(token, account_id).await
    }
}

impl Default for ProviderManager {
    fn default() -> Self {
        Self::new()
    }
}
