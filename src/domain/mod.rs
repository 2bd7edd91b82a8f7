//! Domain layer types for the disposable-email session core.
//!
//! Everything the provider adapters normalize into and the session
//! controller operates on: mailbox provisioning types, message types, and
//! the provider/view enums persisted with each session.

mod mailbox;
mod message;
mod types;

pub use mailbox::{split_address, Account, AuthToken, Domain};
pub use message::{merge_preserving_seen, Address, Message, MessageDetail};
pub use types::{ProviderKind, View};
