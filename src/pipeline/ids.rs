//! Snapshot identifiers
//!
//! A `SnapshotId` is 12 bytes:
//!
//! | bytes  | content                                  |
//! |--------|------------------------------------------|
//! | 0..4   | creation time, unix seconds, big-endian  |
//! | 4..9   | random value chosen once per process     |
//! | 9..12  | insertion counter, big-endian            |
//!
//! Byte-wise comparison therefore orders ids by creation time, and ids
//! minted by one process within the same second by insertion order. The
//! wire form is 24 lowercase hex characters.
//!
//! The counter starts at a random value per process. Two processes minting
//! in the same second (e.g. across a restart) are ordered by their random
//! segments, not by which one inserted first.

use chrono::{DateTime, Utc};
use rand::Rng;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use thiserror::Error;

const COUNTER_MASK: u32 = 0x00FF_FFFF;
// Seed in the lower half so a process can mint millions of ids before wrapping
const COUNTER_SEED_MASK: u32 = 0x007F_FFFF;

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

/// Returned when a cursor string is not a 24-character hex id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid snapshot id: {0:?}")]
pub struct InvalidSnapshotId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId([u8; SnapshotId::LEN]);

impl SnapshotId {
    pub const LEN: usize = 12;

    /// Mint a new id stamped with the current time
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Mint a new id stamped with `time`
    ///
    /// Still unique: the process segment and counter are filled in as usual.
    pub fn at(time: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; Self::LEN];
        bytes[0..4].copy_from_slice(&unix_seconds(time).to_be_bytes());
        bytes[4..9].copy_from_slice(process_unique());

        let count = counter().fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);

        Self(bytes)
    }

    /// Smallest possible id for `time`
    ///
    /// Every id minted at or after `time` sorts at or above this value, every
    /// id minted in an earlier second sorts below it.
    pub fn floor(time: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; Self::LEN];
        bytes[0..4].copy_from_slice(&unix_seconds(time).to_be_bytes());
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Creation time embedded in the id (second precision)
    pub fn timestamp(&self) -> DateTime<Utc> {
        let secs = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        DateTime::from_timestamp(i64::from(secs), 0).unwrap_or_default()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for SnapshotId {
    type Err = InvalidSnapshotId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::LEN * 2 {
            return Err(InvalidSnapshotId(s.to_string()));
        }

        let mut bytes = [0u8; Self::LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| InvalidSnapshotId(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for SnapshotId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SnapshotId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl ToSql for SnapshotId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(&self.0[..]))
    }
}

impl FromSql for SnapshotId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let blob = value.as_blob()?;
        let bytes: [u8; Self::LEN] =
            blob.try_into().map_err(|_| FromSqlError::InvalidBlobSize {
                expected_size: Self::LEN,
                blob_size: blob.len(),
            })?;
        Ok(Self(bytes))
    }
}

fn unix_seconds(time: DateTime<Utc>) -> u32 {
    time.timestamp().clamp(0, i64::from(u32::MAX)) as u32
}

fn process_unique() -> &'static [u8; 5] {
    PROCESS_UNIQUE.get_or_init(|| rand::thread_rng().gen())
}

fn counter() -> &'static AtomicU32 {
    COUNTER.get_or_init(|| AtomicU32::new(rand::thread_rng().gen::<u32>() & COUNTER_SEED_MASK))
}
