//! Session token lifecycle over the ephemeral store.
//!
//! Tokens live under `token:<token>` and resolve to the username they were
//! issued for. This module is the only writer of those keys.

use std::time::Duration;
use thiserror::Error;

use crate::storage::{EphemeralStore, StoreError};

use super::generator::generate_token;

const KEY_PREFIX: &str = "token:";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Ephemeral store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// A freshly issued token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub ttl: Duration,
    pub username: String,
}

fn token_key(token: &str) -> String {
    format!("{KEY_PREFIX}{token}")
}

/// Issue and persist a new token bound to `username`
pub fn issue(
    store: &dyn EphemeralStore,
    username: &str,
    ttl: Duration,
) -> Result<IssuedToken, SessionError> {
    let token = generate_token();
    persist(store, &token, username, ttl)?;
    tracing::debug!(username = %username, ttl_seconds = ttl.as_secs(), "Issued session token");

    Ok(IssuedToken {
        token,
        ttl,
        username: username.to_string(),
    })
}

/// Bind `token` to `username` for `ttl`, replacing any existing binding
pub fn persist(
    store: &dyn EphemeralStore,
    token: &str,
    username: &str,
    ttl: Duration,
) -> Result<(), SessionError> {
    store.set_with_ttl(&token_key(token), username, ttl)?;
    Ok(())
}

/// Resolve a token to the username it was issued for
pub fn resolve(store: &dyn EphemeralStore, token: &str) -> Result<String, SessionError> {
    store
        .get(&token_key(token))?
        .ok_or(SessionError::InvalidToken)
}

/// Resolve a token together with its remaining lifetime
pub fn resolve_with_ttl(
    store: &dyn EphemeralStore,
    token: &str,
) -> Result<(String, Duration), SessionError> {
    store
        .get_with_ttl(&token_key(token))?
        .ok_or(SessionError::InvalidToken)
}

/// Time left before the token expires
pub fn remaining_ttl(store: &dyn EphemeralStore, token: &str) -> Result<Duration, SessionError> {
    resolve_with_ttl(store, token).map(|(_, ttl)| ttl)
}

/// Revoke a token. Returns false if it was already gone.
pub fn revoke(store: &dyn EphemeralStore, token: &str) -> Result<bool, SessionError> {
    let deleted = store.delete(&token_key(token))?;
    if deleted {
        tracing::debug!("Revoked session token");
    }
    Ok(deleted)
}

/// Clean up expired tokens (called by background task)
pub fn cleanup_expired(store: &dyn EphemeralStore) -> Result<usize, SessionError> {
    let cleaned = store.purge_expired()?;
    if cleaned > 0 {
        tracing::info!(count = cleaned, "Cleaned up expired session tokens");
    }
    Ok(cleaned)
}
