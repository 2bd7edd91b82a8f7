//! Mail provider implementations.
//!
//! This module contains the [`MailProvider`] trait and adapters for the
//! supported disposable-mail backends:
//!
//! - [`MailTmProvider`] - mail.tm, account/token based (primary)
//! - [`OneSecProvider`] - 1secmail, stateless address space
//!
//! plus the [`ProviderManager`], which owns the active selection and the
//! one-step domain-listing fallback.

mod mailtm;
mod manager;
mod onesec;
mod traits;

pub use mailtm::MailTmProvider;
pub use manager::ProviderManager;
pub use onesec::OneSecProvider;
pub use traits::{MailProvider, ProviderError, Result};
