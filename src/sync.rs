//! Chat history synchronization against a per-user watermark.

use serde::Serialize;
use thiserror::Error;

use crate::presence::{self, PresenceError};
use crate::storage::models::Message;
use crate::storage::{DurableLog, StoreError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to query messages: {0}")]
    PersistenceUnavailable(#[from] StoreError),
    #[error(transparent)]
    Watermark(#[from] PresenceError),
}

/// A message log split around a watermark
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Partition {
    /// Messages with `timestamp <= watermark`
    #[serde(rename = "messages")]
    pub seen: Vec<Message>,
    /// Messages with `timestamp > watermark`
    #[serde(rename = "unread_messages")]
    pub unread: Vec<Message>,
}

/// Split `messages` into seen and unread in a single pass.
///
/// Both halves keep the input order; nothing is re-sorted.
pub fn partition<I>(messages: I, watermark: i64) -> Partition
where
    I: IntoIterator<Item = Message>,
{
    let mut out = Partition::default();
    for message in messages {
        if message.timestamp <= watermark {
            out.seen.push(message);
        } else {
            out.unread.push(message);
        }
    }
    out
}

/// Load the watermark and the full log for `username`, then partition it.
///
/// The log is not read when the watermark is missing or non-numeric.
pub fn fetch_history(log: &dyn DurableLog, username: &str) -> Result<Partition, SyncError> {
    let watermark = presence::watermark_of(log, username)?;
    let messages = log.messages()?;
    let total = messages.len();

    let result = partition(messages, watermark);
    tracing::debug!(
        username = %username,
        watermark,
        total,
        unread = result.unread.len(),
        "Partitioned message log"
    );
    Ok(result)
}
