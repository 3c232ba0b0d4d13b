//! Read side of per-user presence records.

use thiserror::Error;

use crate::storage::models::LastSeen;
use crate::storage::{DurableLog, StoreError};

#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("No last_seen data found for user {0}")]
    NotFound(String),
    #[error("Last seen value for user {username} is {status:?}, not a timestamp")]
    NotNumeric { status: String, username: String },
    #[error("Durable store unavailable: {0}")]
    PersistenceUnavailable(#[from] StoreError),
}

/// Usernames whose presence record holds the `"online"` status
pub fn list_online(log: &dyn DurableLog) -> Result<Vec<String>, PresenceError> {
    Ok(log
        .presence_records()?
        .into_iter()
        .filter(|record| record.last_seen.is_online())
        .map(|record| record.username)
        .collect())
}

/// The stored last-seen value for `username`
pub fn last_seen_of(log: &dyn DurableLog, username: &str) -> Result<LastSeen, PresenceError> {
    log.presence(username)?
        .map(|record| record.last_seen)
        .ok_or_else(|| PresenceError::NotFound(username.to_string()))
}

/// The numeric watermark for `username`.
///
/// A status such as `"online"` carries no timestamp and is reported as
/// [`PresenceError::NotNumeric`] rather than coerced to a number.
pub fn watermark_of(log: &dyn DurableLog, username: &str) -> Result<i64, PresenceError> {
    match last_seen_of(log, username)? {
        LastSeen::At(ts) => Ok(ts),
        LastSeen::Status(status) => Err(PresenceError::NotNumeric {
            status,
            username: username.to_string(),
        }),
    }
}
