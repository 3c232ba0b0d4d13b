use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Presence status that marks a user as currently connected
pub const ONLINE: &str = "online";

/// A value held in the ephemeral store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemeralEntry {
    /// When the entry stops being readable
    pub expires_at: DateTime<Utc>,
    pub value: String,
}

/// A registered chat user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Argon2 PHC string, or a legacy unsalted SHA-256 hex digest
    pub password_digest: String,
    pub username: String,
}

/// Last activity marker: either a concrete timestamp or a status such as `"online"`
///
/// Float timestamps are floored on the way in. Message timestamps are
/// integers, so `ts <= watermark` and `ts <= floor(watermark)` agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "RawLastSeen")]
pub enum LastSeen {
    At(i64),
    Status(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLastSeen {
    Int(i64),
    Float(f64),
    Status(String),
}

impl From<RawLastSeen> for LastSeen {
    fn from(raw: RawLastSeen) -> Self {
        match raw {
            RawLastSeen::Int(ts) => LastSeen::At(ts),
            RawLastSeen::Float(ts) => match floor_timestamp(ts) {
                Some(ts) => LastSeen::At(ts),
                None => LastSeen::Status(ts.to_string()),
            },
            RawLastSeen::Status(s) => LastSeen::Status(s),
        }
    }
}

fn floor_timestamp(ts: f64) -> Option<i64> {
    let floored = ts.floor();
    // i64::MAX is not exactly representable; the upper bound is exclusive
    (floored.is_finite() && floored >= i64::MIN as f64 && floored < i64::MAX as f64)
        .then_some(floored as i64)
}

impl LastSeen {
    pub fn online() -> Self {
        LastSeen::Status(ONLINE.to_string())
    }

    pub fn is_online(&self) -> bool {
        matches!(self, LastSeen::Status(s) if s == ONLINE)
    }

    /// The numeric timestamp, if this marker carries one
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            LastSeen::At(ts) => Some(*ts),
            LastSeen::Status(_) => None,
        }
    }
}

impl std::str::FromStr for LastSeen {
    type Err = std::convert::Infallible;

    /// Numbers become timestamps; anything else is kept as a status
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(ts) = s.parse::<i64>() {
            return Ok(LastSeen::At(ts));
        }
        Ok(match s.parse::<f64>().ok().and_then(floor_timestamp) {
            Some(ts) => LastSeen::At(ts),
            None => LastSeen::Status(s.to_string()),
        })
    }
}

impl std::fmt::Display for LastSeen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LastSeen::At(ts) => write!(f, "{ts}"),
            LastSeen::Status(s) => f.write_str(s),
        }
    }
}

/// Per-user presence record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub last_seen: LastSeen,
    pub username: String,
}

/// A chat message. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: i64,
    pub content: String,
    pub username: String,
}
