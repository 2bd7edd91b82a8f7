//! 1secmail adapter.
//!
//! Speaks the 1secmail query-parameter API. This backend is a stateless
//! address space: there is no registration or authentication step, inboxes
//! are polled by login and domain, and nothing can be deleted. The adapter
//! satisfies the full [`MailProvider`] contract by synthesizing the
//! account and token locally and treating deletions as successful no-ops.

use std::time::Duration;

use serde::Deserialize;

use super::{MailProvider, ProviderError, Result};
use crate::domain::{
    split_address, Account, Address, AuthToken, Domain, Message, MessageDetail, ProviderKind,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

const ONESEC_BASE: &str = "https://www.1secmail.com/api/v1/";

/// Deadline for every outbound call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// 1secmail message summary; the list endpoint returns no body fields.
#[derive(Debug, Deserialize)]
struct OneSecMessage {
    id: u64,
    #[serde(default)]
    from: String,
    #[serde(default)]
    subject: String,
    /// Delivery time as unix seconds.
    #[serde(default)]
    date: f64,
}

/// 1secmail full message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OneSecMessageDetail {
    id: u64,
    #[serde(default)]
    from: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    date: f64,
    #[serde(default)]
    body: String,
    #[serde(default)]
    text_body: String,
    #[serde(default)]
    html_body: String,
}

fn timestamp(seconds: f64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds as i64, 0).unwrap_or_default()
}

fn subject_or_placeholder(subject: &str) -> String {
    if subject.is_empty() {
        "(No Subject)".to_string()
    } else {
        subject.to_string()
    }
}

/// Adapter for the 1secmail backend.
pub struct OneSecProvider {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OneSecProvider {
    /// Creates an adapter against the public 1secmail endpoint.
    pub fn new() -> Self {
        Self::with_base_url(ONESEC_BASE)
    }

    /// Creates an adapter against a custom endpoint.
    ///
    /// Used by wire tests to point at a mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_config(base_url, REQUEST_TIMEOUT)
    }

    /// Creates an adapter with an explicit request deadline.
    pub fn with_config(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    fn mailbox_address(login: &str, domain: &str) -> Address {
        Address::new(format!("{}@{}", login, domain))
    }
}

impl Default for OneSecProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailProvider for OneSecProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OneSec
    }

    async fn get_domains(&self) -> Result<Vec<Domain>> {
        let response = self
            .http
            .get(&self.base_url)
            .timeout(self.timeout)
            .query(&[("action", "getDomainList")])
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        if !response.status().is_success() {
            return Err(ProviderError::Network(format!(
                "domain listing failed ({})",
                response.status()
            )));
        }

        let domains: Vec<String> = response
            .json()
            .await
            .map_err(ProviderError::from_transport)?;

        Ok(domains
            .into_iter()
            .enumerate()
            .map(|(index, domain)| Domain::new(index.to_string(), domain))
            .collect())
    }

    async fn create_account(&self, address: &str, password: &str) -> Result<Account> {
        // Stateless address space: any address exists as soon as it is
        // polled, so registration is a local synthesis with no network call.
        let (login, _) = split_address(address);
        Ok(Account {
            id: login.to_string(),
            address: address.to_string(),
            password: password.to_string(),
        })
    }

    async fn get_auth_token(&self, address: &str, _password: &str) -> Result<AuthToken> {
        // No authentication step; the login doubles as token and account id.
        let (login, _) = split_address(address);
        Ok(AuthToken {
            token: login.to_string(),
            id: login.to_string(),
        })
    }

    async fn get_messages(&self, token: &str, address: &str) -> Result<Vec<Message>> {
        let (_, domain) = split_address(address);

        let response = self
            .http
            .get(&self.base_url)
            .timeout(self.timeout)
            .query(&[("action", "getMessages"), ("login", token), ("domain", domain)])
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        if !response.status().is_success() {
            return Err(ProviderError::Network(format!(
                "message listing failed ({})",
                response.status()
            )));
        }

        let messages: Vec<OneSecMessage> = response
            .json()
            .await
            .map_err(ProviderError::from_transport)?;

        Ok(messages
            .into_iter()
            .map(|msg| Message {
                id: msg.id.to_string(),
                from: Address::with_name(msg.from.clone(), msg.from),
                to: vec![Self::mailbox_address(token, domain)],
                subject: subject_or_placeholder(&msg.subject),
                intro: msg.subject,
                created_at: timestamp(msg.date),
                // No read-state concept; the caller merges prior client state.
                seen: false,
            })
            .collect())
    }

    async fn get_message(&self, token: &str, address: &str, id: &str) -> Result<MessageDetail> {
        let (_, domain) = split_address(address);

        let response = self
            .http
            .get(&self.base_url)
            .timeout(self.timeout)
            .query(&[
                ("action", "readMessage"),
                ("login", token),
                ("domain", domain),
                ("id", id),
            ])
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                404 => ProviderError::NotFound(id.to_string()),
                _ => ProviderError::Network(format!("message fetch failed ({})", status)),
            });
        }

        let msg: OneSecMessageDetail = response
            .json()
            .await
            .map_err(ProviderError::from_transport)?;

        let text = if msg.text_body.is_empty() {
            msg.body
        } else {
            msg.text_body
        };
        let html = if msg.html_body.is_empty() {
            Vec::new()
        } else {
            vec![msg.html_body]
        };

        Ok(MessageDetail {
            id: msg.id.to_string(),
            from: Address::with_name(msg.from.clone(), msg.from),
            to: vec![Self::mailbox_address(token, domain)],
            subject: subject_or_placeholder(&msg.subject),
            intro: msg.subject,
            created_at: timestamp(msg.date),
            seen: true,
            html,
            text,
        })
    }

    async fn delete_message(&self, _token: &str, id: &str) -> Result<()> {
        tracing::debug!(message_id = %id, "1secmail does not support message deletion");
        Ok(())
    }

    async fn delete_account(&self, _token: &str, account_id: &str) -> Result<()> {
        tracing::debug!(account_id = %account_id, "1secmail does not support account deletion");
        Ok(())
    }
}
