//! Shared test helpers for the crate's `#[cfg(test)]` modules

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use crate::config::{Config, ServerConfig, StoreConfig, TokenConfig};
use crate::storage::models::{LastSeen, Message, PresenceRecord, UserRecord};
use crate::storage::{
    DurableLog, EphemeralStore, RedbEphemeralStore, RedbLog, StoreError,
};
use crate::telemetry::{SystemStats, Telemetry, TelemetryError};
use crate::AppState;

/// Open a fresh ephemeral store in a temporary directory.
///
/// The caller must keep the `TempDir` alive for the duration of the test.
pub fn setup_ephemeral() -> (RedbEphemeralStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = RedbEphemeralStore::open(temp_dir.path()).unwrap();
    (store, temp_dir)
}

/// Open a fresh durable log in a temporary directory.
pub fn setup_log() -> (RedbLog, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let log = RedbLog::open(temp_dir.path()).unwrap();
    (log, temp_dir)
}

/// A minimal `Config` suitable for unit tests.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:8080".to_string(),
        },
        stores: StoreConfig {
            durable_path: None,
            ephemeral_path: "/tmp/test".into(),
            timeout_ms: 2_000,
        },
        tokens: TokenConfig::default(),
    }
}

/// Build an `Arc<AppState>` around the given stores with canned telemetry.
pub fn test_state(tokens: Arc<dyn EphemeralStore>, log: Arc<dyn DurableLog>) -> Arc<AppState> {
    Arc::new(AppState {
        config: test_config(),
        log,
        telemetry: Arc::new(FixedTelemetry),
        tokens,
    })
}

pub fn make_message(timestamp: i64, content: &str, username: &str) -> Message {
    Message {
        timestamp,
        content: content.to_string(),
        username: username.to_string(),
    }
}

pub fn set_presence(log: &dyn DurableLog, username: &str, last_seen: LastSeen) {
    log.set_presence(&PresenceRecord {
        last_seen,
        username: username.to_string(),
    })
    .unwrap();
}

pub fn add_legacy_user(log: &dyn DurableLog, username: &str, password: &str) {
    log.put_user(&UserRecord {
        password_digest: crate::credentials::legacy_digest(password),
        username: username.to_string(),
    })
    .unwrap();
}

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

/// Ephemeral store whose every call fails.
pub struct FailingEphemeralStore;

impl EphemeralStore for FailingEphemeralStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(down())
    }

    fn set_with_ttl(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(down())
    }

    fn get_with_ttl(&self, _key: &str) -> Result<Option<(String, Duration)>, StoreError> {
        Err(down())
    }

    fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        Err(down())
    }

    fn purge_expired(&self) -> Result<usize, StoreError> {
        Err(down())
    }
}

/// Durable log whose every call fails.
pub struct FailingLog;

impl DurableLog for FailingLog {
    fn find_user(&self, _username: &str) -> Result<Option<UserRecord>, StoreError> {
        Err(down())
    }

    fn put_user(&self, _user: &UserRecord) -> Result<(), StoreError> {
        Err(down())
    }

    fn remove_user(&self, _username: &str) -> Result<bool, StoreError> {
        Err(down())
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Err(down())
    }

    fn presence(&self, _username: &str) -> Result<Option<PresenceRecord>, StoreError> {
        Err(down())
    }

    fn presence_records(&self) -> Result<Vec<PresenceRecord>, StoreError> {
        Err(down())
    }

    fn set_presence(&self, _record: &PresenceRecord) -> Result<(), StoreError> {
        Err(down())
    }

    fn messages(&self) -> Result<Vec<Message>, StoreError> {
        Err(down())
    }

    fn append_message(&self, _message: &Message) -> Result<u64, StoreError> {
        Err(down())
    }
}

/// Wraps a durable log and counts every call that reaches it.
pub struct CountingLog<L> {
    calls: AtomicUsize,
    inner: L,
    message_reads: AtomicUsize,
}

impl<L: DurableLog> CountingLog<L> {
    pub fn new(inner: L) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            inner,
            message_reads: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn message_reads(&self) -> usize {
        self.message_reads.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl<L: DurableLog> DurableLog for CountingLog<L> {
    fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.hit();
        self.inner.find_user(username)
    }

    fn put_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        self.hit();
        self.inner.put_user(user)
    }

    fn remove_user(&self, username: &str) -> Result<bool, StoreError> {
        self.hit();
        self.inner.remove_user(username)
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.hit();
        self.inner.list_users()
    }

    fn presence(&self, username: &str) -> Result<Option<PresenceRecord>, StoreError> {
        self.hit();
        self.inner.presence(username)
    }

    fn presence_records(&self) -> Result<Vec<PresenceRecord>, StoreError> {
        self.hit();
        self.inner.presence_records()
    }

    fn set_presence(&self, record: &PresenceRecord) -> Result<(), StoreError> {
        self.hit();
        self.inner.set_presence(record)
    }

    fn messages(&self) -> Result<Vec<Message>, StoreError> {
        self.hit();
        self.message_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.messages()
    }

    fn append_message(&self, message: &Message) -> Result<u64, StoreError> {
        self.hit();
        self.inner.append_message(message)
    }
}

/// Telemetry source returning fixed numbers.
pub struct FixedTelemetry;

impl Telemetry for FixedTelemetry {
    fn collect(&self) -> Result<SystemStats, TelemetryError> {
        Ok(SystemStats {
            cpu_cores: 8,
            cpu_model: Some("Test CPU <fast>".to_string()),
            free_memory_gb: Some(3.5),
            load_average: Some(0.25),
            os: "linux".to_string(),
            total_memory_gb: Some(15.62),
            uptime: Some("1 days, 2 hours, 3 minutes".to_string()),
        })
    }
}

/// Telemetry source that always fails.
pub struct BrokenTelemetry;

impl Telemetry for BrokenTelemetry {
    fn collect(&self) -> Result<SystemStats, TelemetryError> {
        Err(TelemetryError::Unavailable("no /proc".to_string()))
    }
}
