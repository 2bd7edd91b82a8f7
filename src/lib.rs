//! tempbox - disposable email session core
//!
//! This crate provides the core of a temporary-email client: a unified
//! interface over multiple third-party mail backends with fallback, and a
//! session lifecycle (generation, polling, countdown, persistence) that
//! survives restarts. Presentation is left to consumers; they call the
//! [`services::SessionService`] operations and render the returned
//! view-model data.

pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;
