//! Configuration and settings management.
//!
//! This module provides runtime settings types and persistence.
//! Settings are stored in the user's config directory as JSON.

mod settings;

pub use settings::{GenerationSettings, HttpSettings, SessionSettings, Settings};
