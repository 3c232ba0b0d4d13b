use redb::TableDefinition;

// Ephemeral store

/// Keyed entries with expiry: key -> EphemeralEntry (msgpack)
pub const EPHEMERAL: TableDefinition<&str, &[u8]> = TableDefinition::new("ephemeral");

/// Expiration index: "<millis>:<key>" -> key
pub const EPHEMERAL_EXPIRY: TableDefinition<&str, &str> = TableDefinition::new("ephemeral_expiry");

// Durable log

/// Users: username -> UserRecord (msgpack)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Presence: username -> PresenceRecord (msgpack)
pub const PRESENCE: TableDefinition<&str, &[u8]> = TableDefinition::new("last_seen");

/// Message log: insertion sequence -> Message (msgpack)
pub const MESSAGES: TableDefinition<u64, &[u8]> = TableDefinition::new("messages");
