// Path: crates/storage/src/record_db.rs

//! The redb-backed record store.
//!
//! One table maps record keys to envelope-framed payloads. The envelope
//! is packed by hand so the on-disk format is stable and
//! endian-independent:
//!
//! ```text
//! [ Magic: "VREC" (4) ]
//! [ Version: u8 (1) ]
//! [ Flags: u8 (1) ]
//! [ Expiry: u64 BE unix seconds, 0 = none (8) ]
//! [ Payload: N ]
//! ```
//!
//! Expired records read as absent; the bytes are reclaimed lazily on the
//! next write to the same key.

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use veil_api::storage::{Record, RecordFlags, RecordStore};
use veil_types::error::StorageError;

const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("RECORDS");

const ENVELOPE_MAGIC: &[u8; 4] = b"VREC";
const ENVELOPE_VERSION: u8 = 1;
const ENVELOPE_HEADER_LEN: usize = 4 + 1 + 1 + 8;

/// A durable record store over a single redb database file.
#[derive(Clone)]
pub struct RecordDb {
    db: Arc<Database>,
}

impl RecordDb {
    /// Opens or creates the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path).map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self { db: Arc::new(db) })
    }
}

fn pack(record: &Record) -> Vec<u8> {
    let mut out = Vec::with_capacity(ENVELOPE_HEADER_LEN + record.payload.len());
    out.extend_from_slice(ENVELOPE_MAGIC);
    out.push(ENVELOPE_VERSION);
    out.push(record.flags.bits());
    out.extend_from_slice(&record.expires_at.unwrap_or(0).to_be_bytes());
    out.extend_from_slice(&record.payload);
    out
}

fn unpack(bytes: &[u8]) -> Result<Record, StorageError> {
    if bytes.len() < ENVELOPE_HEADER_LEN || &bytes[..4] != ENVELOPE_MAGIC {
        return Err(StorageError::Decode("bad record envelope".into()));
    }
    let version = bytes[4];
    if version != ENVELOPE_VERSION {
        return Err(StorageError::UnsupportedVersion(version));
    }
    let flags = RecordFlags::from_bits_truncate(bytes[5]);
    let expires_raw = u64::from_be_bytes(
        bytes[6..14]
            .try_into()
            .map_err(|_| StorageError::Decode("bad expiry".into()))?,
    );
    Ok(Record {
        flags,
        expires_at: (expires_raw != 0).then_some(expires_raw),
        payload: bytes[ENVELOPE_HEADER_LEN..].to_vec(),
    })
}

#[async_trait]
impl RecordStore for RecordDb {
    async fn get(&self, key: &str) -> Result<Option<Record>, StorageError> {
        let read = self
            .db
            .begin_read()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let table = match read.open_table(RECORDS) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(StorageError::Backend(e.to_string())),
        };
        let Some(value) = table
            .get(key)
            .map_err(|e| StorageError::Backend(e.to_string()))?
        else {
            return Ok(None);
        };
        let record = unpack(value.value())?;
        if record.is_expired() {
            tracing::debug!(key, "record expired, treating as absent");
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn put(&self, key: &str, record: Record) -> Result<(), StorageError> {
        let write = self
            .db
            .begin_write()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        {
            let mut table = write
                .open_table(RECORDS)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            table
                .insert(key, pack(&record).as_slice())
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        write
            .commit()
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let write = self
            .db
            .begin_write()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        {
            let mut table = write
                .open_table(RECORDS)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            table
                .remove(key)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        write
            .commit()
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let db = RecordDb::open(dir.path().join("records.redb")).unwrap();

        let record = Record::new(b"payload".to_vec())
            .secret()
            .expires_in(Duration::from_secs(3600));
        db.put("core:test/key", record.clone()).await.unwrap();

        let loaded = db.get("core:test/key").await.unwrap().unwrap();
        assert_eq!(loaded.payload, b"payload");
        assert!(loaded.flags.contains(RecordFlags::SECRET));
        assert!(loaded.flags.contains(RecordFlags::CROWN_JEWEL));
        assert_eq!(loaded.expires_at, record.expires_at);

        db.delete("core:test/key").await.unwrap();
        assert!(db.get("core:test/key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_key_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let db = RecordDb::open(dir.path().join("records.redb")).unwrap();
        assert!(db.get("core:missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_record_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let db = RecordDb::open(dir.path().join("records.redb")).unwrap();

        let record = Record {
            flags: RecordFlags::empty(),
            expires_at: Some(1),
            payload: b"old".to_vec(),
        };
        db.put("core:test/expired", record).await.unwrap();
        assert!(db.get("core:test/expired").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.redb");
        {
            let db = RecordDb::open(&path).unwrap();
            db.put("core:test/key", Record::new(vec![7; 3])).await.unwrap();
        }
        let db = RecordDb::open(&path).unwrap();
        assert_eq!(
            db.get("core:test/key").await.unwrap().unwrap().payload,
            vec![7; 3]
        );
    }
}
