//! mail.tm adapter.
//!
//! Speaks the mail.tm REST API: JSON bodies, hydra collection envelopes,
//! bearer-token authentication. This is the account/token-based backend
//! and the fixed primary provider.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;

use super::{MailProvider, ProviderError, Result};
use crate::domain::{Account, Address, AuthToken, Domain, Message, MessageDetail, ProviderKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

const MAILTM_BASE: &str = "https://api.mail.tm";

/// Deadline for every outbound call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Hydra collection envelope.
#[derive(Debug, Deserialize)]
struct HydraList<T> {
    #[serde(rename = "hydra:member", default = "Vec::new")]
    member: Vec<T>,
}

/// mail.tm domain entry.
#[derive(Debug, Deserialize)]
struct MailTmDomain {
    id: String,
    domain: String,
}

/// mail.tm account resource.
#[derive(Debug, Deserialize)]
struct MailTmAccount {
    id: String,
    address: String,
}

/// mail.tm token response.
#[derive(Debug, Deserialize)]
struct MailTmToken {
    token: String,
    id: String,
}

/// mail.tm message endpoint.
#[derive(Debug, Deserialize)]
struct MailTmAddress {
    #[serde(default)]
    name: String,
    address: String,
}

/// mail.tm message summary.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MailTmMessage {
    id: String,
    from: MailTmAddress,
    #[serde(default)]
    to: Vec<MailTmAddress>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    intro: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    seen: bool,
}

/// mail.tm message with body content.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MailTmMessageDetail {
    id: String,
    from: MailTmAddress,
    #[serde(default)]
    to: Vec<MailTmAddress>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    intro: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    seen: bool,
    #[serde(default)]
    html: Vec<String>,
    #[serde(default)]
    text: String,
}

/// Provider error payload; mail.tm uses several detail fields.
#[derive(Debug, Deserialize, Default)]
struct MailTmError {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "hydra:description", default)]
    description: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl From<MailTmAddress> for Address {
    fn from(addr: MailTmAddress) -> Self {
        Address {
            name: addr.name,
            address: addr.address,
        }
    }
}

impl From<MailTmMessage> for Message {
    fn from(msg: MailTmMessage) -> Self {
        Message {
            id: msg.id,
            from: msg.from.into(),
            to: msg.to.into_iter().map(Into::into).collect(),
            subject: msg.subject,
            intro: msg.intro,
            created_at: msg.created_at,
            seen: msg.seen,
        }
    }
}

impl From<MailTmMessageDetail> for MessageDetail {
    fn from(msg: MailTmMessageDetail) -> Self {
        MessageDetail {
            id: msg.id,
            from: msg.from.into(),
            to: msg.to.into_iter().map(Into::into).collect(),
            subject: msg.subject,
            intro: msg.intro,
            created_at: msg.created_at,
            seen: msg.seen,
            html: msg.html,
            text: msg.text,
        }
    }
}

/// Adapter for the mail.tm backend.
pub struct MailTmProvider {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl MailTmProvider {
    /// Creates an adapter against the public mail.tm endpoint.
    pub fn new() -> Self {
        Self::with_base_url(MAILTM_BASE)
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

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    /// Extracts the provider-reported detail from an error body.
    fn provider_detail(body: &str) -> String {
        let parsed: MailTmError = serde_json::from_str(body).unwrap_or_default();
        parsed
            .message
            .or(parsed.description)
            .or(parsed.detail)
            .unwrap_or_else(|| body.to_string())
    }

    /// Classifies a failed account-creation response.
    async fn account_error(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return ProviderError::RateLimited;
        }

        let body = response.text().await.unwrap_or_default();
        let detail = Self::provider_detail(&body);

        match status.as_u16() {
            400 | 409 | 422 if detail.to_ascii_lowercase().contains("already") => {
                ProviderError::AddressTaken
            }
            _ => ProviderError::Provider(detail),
        }
    }
}

impl Default for MailTmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailProvider for MailTmProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MailTm
    }

    async fn get_domains(&self) -> Result<Vec<Domain>> {
        let response = self
            .http
            .get(self.url("/domains"))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        if !response.status().is_success() {
            return Err(ProviderError::Network(format!(
                "domain listing failed ({})",
                response.status()
            )));
        }

        let list: HydraList<MailTmDomain> = response
            .json()
            .await
            .map_err(ProviderError::from_transport)?;

        Ok(list
            .member
            .into_iter()
            .map(|d| Domain::new(d.id, d.domain))
            .collect())
    }

    async fn create_account(&self, address: &str, password: &str) -> Result<Account> {
        let response = self
            .http
            .post(self.url("/accounts"))
            .timeout(self.timeout)
            .json(&serde_json::json!({ "address": address, "password": password }))
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        if !response.status().is_success() {
            return Err(Self::account_error(response).await);
        }

        let account: MailTmAccount = response
            .json()
            .await
            .map_err(ProviderError::from_transport)?;

        Ok(Account {
            id: account.id,
            address: account.address,
            password: password.to_string(),
        })
    }

    async fn get_auth_token(&self, address: &str, password: &str) -> Result<AuthToken> {
        let response = self
            .http
            .post(self.url("/token"))
            .timeout(self.timeout)
            .json(&serde_json::json!({ "address": address, "password": password }))
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                return Err(ProviderError::Auth("invalid credentials".to_string()));
            }
            return Err(ProviderError::Network(format!(
                "authentication failed ({})",
                status
            )));
        }

        let token: MailTmToken = response
            .json()
            .await
            .map_err(ProviderError::from_transport)?;

        Ok(AuthToken {
            token: token.token,
            id: token.id,
        })
    }

    async fn get_messages(&self, token: &str, _address: &str) -> Result<Vec<Message>> {
        let response = self
            .http
            .get(self.url("/messages"))
            .timeout(self.timeout)
            .headers(Self::bearer_headers(token))
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                return Err(ProviderError::TokenExpired);
            }
            return Err(ProviderError::Network(format!(
                "message listing failed ({})",
                status
            )));
        }

        let list: HydraList<MailTmMessage> = response
            .json()
            .await
            .map_err(ProviderError::from_transport)?;

        Ok(list.member.into_iter().map(Into::into).collect())
    }

    async fn get_message(&self, token: &str, _address: &str, id: &str) -> Result<MessageDetail> {
        let response = self
            .http
            .get(self.url(&format!("/messages/{}", id)))
            .timeout(self.timeout)
            .headers(Self::bearer_headers(token))
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::NOT_FOUND => ProviderError::NotFound(id.to_string()),
                StatusCode::UNAUTHORIZED => ProviderError::TokenExpired,
                _ => ProviderError::Network(format!("message fetch failed ({})", status)),
            });
        }

        let detail: MailTmMessageDetail = response
            .json()
            .await
            .map_err(ProviderError::from_transport)?;

        Ok(detail.into())
    }

    async fn delete_message(&self, token: &str, id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/messages/{}", id)))
            .timeout(self.timeout)
            .headers(Self::bearer_headers(token))
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::NOT_FOUND => ProviderError::NotFound(id.to_string()),
                StatusCode::UNAUTHORIZED => ProviderError::TokenExpired,
                _ => ProviderError::Network(format!("message delete failed ({})", status)),
            });
        }
        Ok(())
    }

    async fn delete_account(&self, token: &str, account_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/accounts/{}", account_id)))
            .timeout(self.timeout)
            .headers(Self::bearer_headers(token))
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::NOT_FOUND => ProviderError::NotFound(account_id.to_string()),
                StatusCode::UNAUTHORIZED => ProviderError::TokenExpired,
                _ => ProviderError::Network(format!("account delete failed ({})", status)),
            });
        }
        Ok(())
    }
}
