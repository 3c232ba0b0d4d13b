use chrono::{DateTime, Utc};
use redb::ReadableTable;
use std::path::Path;
use std::time::Duration;

use super::db::{expiry_key, expiry_key_ms, Database, DatabaseError};
use super::models::EphemeralEntry;
use super::tables::*;
use super::{EphemeralStore, StoreError};

/// Ephemeral key-value store on an embedded redb file.
///
/// Expiry is enforced on read; the expiration index lets
/// [`EphemeralStore::purge_expired`] drop stale entries without a full scan.
#[derive(Clone)]
pub struct RedbEphemeralStore {
    db: Database,
}

impl RedbEphemeralStore {
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        let db = Database::open(data_dir, "ephemeral.redb")?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(EPHEMERAL)?;
            let _ = write_txn.open_table(EPHEMERAL_EXPIRY)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn read_entry(&self, key: &str) -> Result<Option<EphemeralEntry>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EPHEMERAL)?;

        match table.get(key)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    fn put_entry(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DatabaseError> {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| DatabaseError::InvalidTtl(format!("{ttl:?} is out of range")))?;
        let entry = EphemeralEntry {
            expires_at,
            value: value.to_string(),
        };

        let write_txn = self.db.begin_write()?;
        {
            // An overwrite must drop the old expiry index entry
            let previous: Option<EphemeralEntry> = {
                let table = write_txn.open_table(EPHEMERAL)?;
                let result = table.get(key)?;
                match result {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                }
            };

            let mut expiry_table = write_txn.open_table(EPHEMERAL_EXPIRY)?;
            if let Some(previous) = previous {
                expiry_table.remove(expiry_key(&previous.expires_at, key).as_str())?;
            }
            expiry_table.insert(expiry_key(&entry.expires_at, key).as_str(), key)?;

            let mut table = write_txn.open_table(EPHEMERAL)?;
            let data = rmp_serde::to_vec_named(&entry)?;
            table.insert(key, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove_entry(&self, key: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.db.begin_write()?;

        let entry: Option<EphemeralEntry> = {
            let mut table = write_txn.open_table(EPHEMERAL)?;
            let removed = table.remove(key)?;
            match removed {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            }
        };

        let deleted = match entry {
            Some(entry) => {
                let mut expiry_table = write_txn.open_table(EPHEMERAL_EXPIRY)?;
                expiry_table.remove(expiry_key(&entry.expires_at, key).as_str())?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    /// Delete expired entries using the expiration index.
    fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let now_ms = now.timestamp_millis();

        // Phase 1: collect expired index entries (index is sorted by expiry)
        let expired: Vec<(String, String)> = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(EPHEMERAL_EXPIRY)?;
            let mut result = Vec::new();
            for entry in table.iter()? {
                let (index_key, key) = entry?;
                let index_key = index_key.value().to_string();
                match expiry_key_ms(&index_key) {
                    Some(ms) if ms <= now_ms => result.push((index_key, key.value().to_string())),
                    _ => break,
                }
            }
            result
        };

        if expired.is_empty() {
            return Ok(0);
        }

        // Phase 2: remove them, skipping keys rewritten with a later expiry since phase 1
        let write_txn = self.db.begin_write()?;
        let mut removed = 0;
        {
            let mut table = write_txn.open_table(EPHEMERAL)?;
            let mut expiry_table = write_txn.open_table(EPHEMERAL_EXPIRY)?;

            for (index_key, key) in &expired {
                let current: Option<EphemeralEntry> = match table.get(key.as_str())? {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                };

                // The index entry stays as long as it still describes a live entry
                let drop_index = match current {
                    Some(entry) if entry.expires_at <= now => {
                        table.remove(key.as_str())?;
                        removed += 1;
                        true
                    }
                    Some(entry) => expiry_key(&entry.expires_at, key) != *index_key,
                    None => true,
                };
                if drop_index {
                    expiry_table.remove(index_key.as_str())?;
                }
            }
        }
        write_txn.commit()?;
        Ok(removed)
    }
}

impl EphemeralStore for RedbEphemeralStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get_with_ttl(key)?.map(|(value, _)| value))
    }

    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        Ok(self.put_entry(key, value, ttl)?)
    }

    fn get_with_ttl(&self, key: &str) -> Result<Option<(String, Duration)>, StoreError> {
        let now = Utc::now();
        match self.read_entry(key)? {
            Some(entry) if entry.expires_at > now => {
                let remaining = (entry.expires_at - now).to_std().unwrap_or(Duration::ZERO);
                Ok(Some((entry.value, remaining)))
            }
            _ => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.remove_entry(key)?)
    }

    fn purge_expired(&self) -> Result<usize, StoreError> {
        Ok(self.delete_expired(Utc::now())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::setup_ephemeral;
    use redb::ReadableTableMetadata;

    #[test]
    fn test_set_and_get() {
        let (store, _temp) = setup_ephemeral();

        store.set_with_ttl("token:abc", "alice", Duration::from_secs(60)).unwrap();
        assert_eq!(store.get("token:abc").unwrap().as_deref(), Some("alice"));
        assert!(store.get("token:missing").unwrap().is_none());
    }

    #[test]
    fn test_ttl_reported_with_value() {
        let (store, _temp) = setup_ephemeral();

        store.set_with_ttl("k", "v", Duration::from_secs(3600)).unwrap();
        let (value, ttl) = store.get_with_ttl("k").unwrap().unwrap();
        assert_eq!(value, "v");
        assert!(ttl <= Duration::from_secs(3600));
        assert!(ttl > Duration::from_secs(3590));
    }

    #[test]
    fn test_expired_entry_is_invisible_before_purge() {
        let (store, _temp) = setup_ephemeral();

        store.set_with_ttl("k", "v", Duration::ZERO).unwrap();
        assert!(store.get("k").unwrap().is_none());
        assert!(store.get_with_ttl("k").unwrap().is_none());
    }

    #[test]
    fn test_purge_removes_only_expired() {
        let (store, _temp) = setup_ephemeral();

        store.set_with_ttl("old-1", "a", Duration::ZERO).unwrap();
        store.set_with_ttl("old-2", "b", Duration::ZERO).unwrap();
        store.set_with_ttl("fresh", "c", Duration::from_secs(60)).unwrap();

        assert_eq!(store.purge_expired().unwrap(), 2);
        assert_eq!(store.purge_expired().unwrap(), 0);
        assert_eq!(store.get("fresh").unwrap().as_deref(), Some("c"));
        assert!(!store.delete("old-1").unwrap());
    }

    #[test]
    fn test_overwrite_replaces_expiry() {
        let (store, _temp) = setup_ephemeral();

        store.set_with_ttl("k", "first", Duration::ZERO).unwrap();
        store.set_with_ttl("k", "second", Duration::from_secs(60)).unwrap();

        assert_eq!(store.purge_expired().unwrap(), 0);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_purge_within_expiry_millisecond_keeps_index() {
        let (store, _temp) = setup_ephemeral();

        store.set_with_ttl("k", "v", Duration::from_secs(60)).unwrap();
        let expires_at = store.read_entry("k").unwrap().unwrap().expires_at;

        // Same millisecond as the expiry, but not yet past it
        let just_before = expires_at - chrono::Duration::nanoseconds(1);
        assert_eq!(store.delete_expired(just_before).unwrap(), 0);
        assert!(store.read_entry("k").unwrap().is_some());

        let after = expires_at + chrono::Duration::seconds(10);
        assert_eq!(store.delete_expired(after).unwrap(), 1);
        assert!(store.read_entry("k").unwrap().is_none());
    }

    #[test]
    fn test_purge_drops_stale_index_after_rewrite() {
        let (store, _temp) = setup_ephemeral();

        store.set_with_ttl("k", "old", Duration::from_secs(1)).unwrap();
        let first = store.read_entry("k").unwrap().unwrap().expires_at;
        store.set_with_ttl("k", "new", Duration::from_secs(3600)).unwrap();

        assert_eq!(store.delete_expired(first + chrono::Duration::seconds(5)).unwrap(), 0);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("new"));

        let read_txn = store.db.begin_read().unwrap();
        let index = read_txn.open_table(EPHEMERAL_EXPIRY).unwrap();
        assert_eq!(index.len().unwrap(), 1);
    }

    #[test]
    fn test_out_of_range_ttl_is_rejected() {
        let (store, _temp) = setup_ephemeral();

        let huge = Duration::from_secs(10_000_000_000_000);
        assert!(matches!(
            store.set_with_ttl("k", "v", huge),
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let (store, _temp) = setup_ephemeral();

        store.set_with_ttl("k", "v", Duration::from_secs(60)).unwrap();
        assert!(store.delete("k").unwrap());
        assert!(!store.delete("k").unwrap());
        assert!(store.get("k").unwrap().is_none());
        assert_eq!(store.purge_expired().unwrap(), 0);
    }
}
