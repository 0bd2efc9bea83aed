//! Common types used across the Keystone engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A 32-byte account or package address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; 32]);

impl Address {
    /// The zero address.
    pub const ZERO: Address = Address([0; 32]);

    /// Create an address from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a short address such as `0x2`, right-aligned in 32 bytes.
    pub const fn from_u64(n: u64) -> Self {
        let be = n.to_be_bytes();
        let mut bytes = [0u8; 32];
        let mut i = 0;
        while i < 8 {
            bytes[24 + i] = be[i];
            i += 1;
        }
        Self(bytes)
    }

    /// Derive a deterministic address from a seed string.
    pub fn from_seed(seed: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Derive a fresh, unique address.
    pub fn fresh() -> Self {
        Self::from_seed(&Uuid::new_v4().to_string())
    }

    /// Raw bytes of the address.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Identifier of an externally-owned resource (object).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Create a new random object id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An externally supplied clock reading, in milliseconds.
///
/// The engine never reads wall time itself; callers pass the clock of the
/// current unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Clock {
    timestamp_ms: u64,
}

impl Clock {
    /// A clock reading at the given millisecond timestamp.
    pub fn at(timestamp_ms: u64) -> Self {
        Self { timestamp_ms }
    }

    /// A clock reading from a UTC date-time. Times before the epoch clamp to 0.
    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        Self::at(u64::try_from(time.timestamp_millis()).unwrap_or(0))
    }

    /// A clock reading of the current wall time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Milliseconds since the epoch.
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}
