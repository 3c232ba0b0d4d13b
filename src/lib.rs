//! enchat - session and chat-history synchronization backend
//!
//! This crate provides:
//! - Password verification against a durable user store
//! - Opaque session tokens with a fixed TTL in an ephemeral store
//! - Presence lookups (who is online, per-user last-seen watermark)
//! - Partitioning of the message log into seen and unread per user
//! - A host status page and a small JSON REST API

pub mod api;
pub mod config;
pub mod credentials;
pub mod expiration;
pub mod presence;
pub mod storage;
pub mod sync;
pub mod telemetry;
#[cfg(test)]
pub mod testutil;
pub mod tokens;

use std::sync::Arc;

use config::Config;
use storage::{DurableLog, EphemeralStore};
use telemetry::Telemetry;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub log: Arc<dyn DurableLog>,
    pub telemetry: Arc<dyn Telemetry>,
    pub tokens: Arc<dyn EphemeralStore>,
}
