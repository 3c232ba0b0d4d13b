use redb::ReadableTable;
use std::path::Path;

use super::db::{Database, DatabaseError};
use super::models::{Message, PresenceRecord, UserRecord};
use super::tables::*;
use super::{DurableLog, StoreError};

/// Durable log on an embedded redb file.
#[derive(Clone)]
pub struct RedbLog {
    db: Database,
}

impl RedbLog {
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        let db = Database::open(data_dir, "durable.redb")?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(PRESENCE)?;
            let _ = write_txn.open_table(MESSAGES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // ========================================================================
    // Users
    // ========================================================================

    fn get_user(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        match table.get(username)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    fn insert_user(&self, user: &UserRecord) -> Result<(), DatabaseError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            let data = rmp_serde::to_vec_named(user)?;
            table.insert(user.username.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete_user(&self, username: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(USERS)?;
            let removed = table.remove(username)?;
            removed.is_some()
        };
        if deleted {
            // Presence has no meaning without the user
            let mut presence = write_txn.open_table(PRESENCE)?;
            presence.remove(username)?;
        }
        write_txn.commit()?;
        Ok(deleted)
    }

    fn all_users(&self) -> Result<Vec<UserRecord>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        let mut users = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            users.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(users)
    }

    // ========================================================================
    // Presence
    // ========================================================================

    fn get_presence(&self, username: &str) -> Result<Option<PresenceRecord>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRESENCE)?;

        match table.get(username)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    fn all_presence(&self) -> Result<Vec<PresenceRecord>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRESENCE)?;

        let mut records = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            records.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(records)
    }

    fn put_presence(&self, record: &PresenceRecord) -> Result<(), DatabaseError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PRESENCE)?;
            let data = rmp_serde::to_vec_named(record)?;
            table.insert(record.username.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // ========================================================================
    // Messages
    // ========================================================================

    fn all_messages(&self) -> Result<Vec<Message>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MESSAGES)?;

        let mut messages = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            messages.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(messages)
    }

    fn push_message(&self, message: &Message) -> Result<u64, DatabaseError> {
        let write_txn = self.db.begin_write()?;
        let sequence = {
            let mut table = write_txn.open_table(MESSAGES)?;
            let last = table.last()?.map(|(key, _)| key.value());
            let sequence = last.map_or(1, |seq| seq + 1);
            let data = rmp_serde::to_vec_named(message)?;
            table.insert(sequence, data.as_slice())?;
            sequence
        };
        write_txn.commit()?;
        Ok(sequence)
    }
}

impl DurableLog for RedbLog {
    fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.get_user(username)?)
    }

    fn put_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        Ok(self.insert_user(user)?)
    }

    fn remove_user(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.delete_user(username)?)
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.all_users()?)
    }

    fn presence(&self, username: &str) -> Result<Option<PresenceRecord>, StoreError> {
        Ok(self.get_presence(username)?)
    }

    fn presence_records(&self) -> Result<Vec<PresenceRecord>, StoreError> {
        Ok(self.all_presence()?)
    }

    fn set_presence(&self, record: &PresenceRecord) -> Result<(), StoreError> {
        Ok(self.put_presence(record)?)
    }

    fn messages(&self) -> Result<Vec<Message>, StoreError> {
        Ok(self.all_messages()?)
    }

    fn append_message(&self, message: &Message) -> Result<u64, StoreError> {
        Ok(self.push_message(message)?)
    }
}

/// Stand-in used when no durable store is configured. Every call fails as unavailable.
pub struct UnconfiguredLog;

impl UnconfiguredLog {
    fn unavailable<T>() -> Result<T, StoreError> {
        Err(StoreError::Unavailable(
            "durable store is not configured".to_string(),
        ))
    }
}

impl DurableLog for UnconfiguredLog {
    fn find_user(&self, _username: &str) -> Result<Option<UserRecord>, StoreError> {
        Self::unavailable()
    }

    fn put_user(&self, _user: &UserRecord) -> Result<(), StoreError> {
        Self::unavailable()
    }

    fn remove_user(&self, _username: &str) -> Result<bool, StoreError> {
        Self::unavailable()
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Self::unavailable()
    }

    fn presence(&self, _username: &str) -> Result<Option<PresenceRecord>, StoreError> {
        Self::unavailable()
    }

    fn presence_records(&self) -> Result<Vec<PresenceRecord>, StoreError> {
        Self::unavailable()
    }

    fn set_presence(&self, _record: &PresenceRecord) -> Result<(), StoreError> {
        Self::unavailable()
    }

    fn messages(&self) -> Result<Vec<Message>, StoreError> {
        Self::unavailable()
    }

    fn append_message(&self, _message: &Message) -> Result<u64, StoreError> {
        Self::unavailable()
    }
}
