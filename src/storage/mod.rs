//! Store contracts and their redb-backed implementations.
//!
//! Two independent stores back the server:
//! - the ephemeral store holds session tokens with a per-key TTL
//! - the durable log holds users, presence records and the message log
//!
//! Both are injected as trait objects so handlers and tests can swap them.

pub mod db;
pub mod durable;
pub mod ephemeral;
pub mod models;
mod tables;

use std::time::Duration;
use thiserror::Error;

pub use db::{Database, DatabaseError};
pub use durable::{RedbLog, UnconfiguredLog};
pub use ephemeral::RedbEphemeralStore;
pub use tables::*;

use models::{Message, PresenceRecord, UserRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Malformed stored record: {0}")]
    Decode(String),
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<DatabaseError> for StoreError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Decode(_) => StoreError::Decode(e.to_string()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Keyed store with per-key expiry.
///
/// Expired entries must never be returned by reads, whether or not they
/// have been purged yet.
pub trait EphemeralStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any existing entry and its expiry
    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Value and remaining lifetime, read in one transaction
    fn get_with_ttl(&self, key: &str) -> Result<Option<(String, Duration)>, StoreError>;

    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Remove every expired entry, returning how many were removed
    fn purge_expired(&self) -> Result<usize, StoreError>;
}

/// Persistent store of users, presence records and chat messages.
pub trait DurableLog: Send + Sync {
    fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
    fn put_user(&self, user: &UserRecord) -> Result<(), StoreError>;
    fn remove_user(&self, username: &str) -> Result<bool, StoreError>;
    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;

    fn presence(&self, username: &str) -> Result<Option<PresenceRecord>, StoreError>;
    fn presence_records(&self) -> Result<Vec<PresenceRecord>, StoreError>;
    fn set_presence(&self, record: &PresenceRecord) -> Result<(), StoreError>;

    /// The full message log in insertion order
    fn messages(&self) -> Result<Vec<Message>, StoreError>;

    /// Append a message, returning its sequence number
    fn append_message(&self, message: &Message) -> Result<u64, StoreError>;
}

/// Run a synchronous store call on the blocking pool with a deadline.
///
/// A deadline miss surfaces as [`StoreError::Timeout`]. The blocking call
/// itself keeps running to completion; its transaction is released when it
/// returns.
pub async fn run_blocking<T, E, F>(limit: Duration, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<StoreError> + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(StoreError::Unavailable(format!("store task failed: {e}")).into()),
        Err(_) => Err(StoreError::Timeout(limit).into()),
    }
}
