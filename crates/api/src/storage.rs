// Path: crates/api/src/storage.rs

//! API for the local record store.
//!
//! The subsystem persists a handful of keyed records: the cached user, the
//! session bearer, and per-zone token inventories. Each record carries an
//! envelope with sensitivity flags and an optional absolute expiry; an
//! expired record is treated as absent by every implementation.

use async_trait::async_trait;
use bitflags::bitflags;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use veil_types::error::StorageError;

bitflags! {
    /// Sensitivity flags of a stored record.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct RecordFlags: u8 {
        /// The record holds secret material; never log its payload.
        const SECRET = 0b0000_0001;
        /// The record is crown-jewel material; exclude it from any
        /// export or sync surface.
        const CROWN_JEWEL = 0b0000_0010;
    }
}

/// A stored record: payload plus envelope metadata.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Record {
    /// Sensitivity flags.
    pub flags: RecordFlags,
    /// Absolute expiry in unix seconds; `None` means the record does not
    /// expire.
    pub expires_at: Option<u64>,
    /// The encoded payload.
    pub payload: Vec<u8>,
}

impl Record {
    /// Creates a plain, non-expiring record.
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            flags: RecordFlags::empty(),
            expires_at: None,
            payload,
        }
    }

    /// Marks the record secret and crown-jewel.
    pub fn secret(mut self) -> Self {
        self.flags |= RecordFlags::SECRET | RecordFlags::CROWN_JEWEL;
        self
    }

    /// Sets an absolute expiry `ttl` from now.
    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.expires_at = Some(now_secs() + ttl.as_secs());
        self
    }

    /// Whether the record has passed its expiry.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => at <= now_secs(),
            None => false,
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The local key-value record store.
///
/// Implementations must treat expired records as absent on read; whether
/// they reclaim the bytes eagerly is up to them.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Reads a record. Expired records read as `None`.
    async fn get(&self, key: &str) -> Result<Option<Record>, StorageError>;

    /// Writes a record, replacing any prior one under the key.
    async fn put(&self, key: &str, record: Record) -> Result<(), StorageError>;

    /// Deletes the record under the key, if any.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_absolute() {
        let fresh = Record::new(vec![1]).expires_in(Duration::from_secs(3600));
        assert!(!fresh.is_expired());

        let expired = Record {
            flags: RecordFlags::empty(),
            expires_at: Some(1),
            payload: vec![1],
        };
        assert!(expired.is_expired());
    }

    #[test]
    fn secret_sets_both_flags() {
        let record = Record::new(vec![]).secret();
        assert!(record.flags.contains(RecordFlags::SECRET));
        assert!(record.flags.contains(RecordFlags::CROWN_JEWEL));
    }
}
