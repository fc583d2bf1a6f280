// Path: crates/access/src/persist.rs

//! Per-zone inventory persistence.
//!
//! On subsystem stop every persistent zone's inventory is wrapped into a
//! secret, crown-jewel record with an absolute expiry 30 days out. An
//! empty inventory deletes any prior record instead of writing one. On
//! start, malformed or expired records leave the zone empty with a
//! warning; they are never fatal.

use crate::zones::Registry;
use std::time::Duration;
use veil_api::handler::TokenHandler;
use veil_api::storage::{Record, RecordStore};
use veil_types::error::AccessError;
use veil_types::keys::token_storage_key;

/// How long a persisted inventory stays valid.
pub const INVENTORY_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Persists the inventories of the given zones.
pub async fn save_zones(
    registry: &Registry,
    store: &dyn RecordStore,
    zones: &[String],
) -> Result<(), AccessError> {
    for zone in zones {
        let Some(handler) = registry.get(zone) else {
            tracing::warn!(zone, "cannot persist unregistered zone");
            continue;
        };
        let key = token_storage_key(zone);
        match handler.save()? {
            Some(bytes) => {
                let record = Record::new(bytes).secret().expires_in(INVENTORY_TTL);
                store.put(&key, record).await?;
                tracing::debug!(zone, amount = handler.amount(), "persisted inventory");
            }
            None => {
                store.delete(&key).await?;
                tracing::debug!(zone, "inventory empty, deleted record");
            }
        }
    }
    Ok(())
}

/// Restores the inventories of the given zones.
pub async fn load_zones(
    registry: &Registry,
    store: &dyn RecordStore,
    zones: &[String],
) -> Result<(), AccessError> {
    for zone in zones {
        let Some(handler) = registry.get(zone) else {
            tracing::warn!(zone, "cannot restore unregistered zone");
            continue;
        };
        let key = token_storage_key(zone);
        let Some(record) = store.get(&key).await? else {
            continue;
        };
        if let Err(e) = handler.load(&record.payload) {
            tracing::warn!(zone, error = %e, "stored inventory rejected, starting empty");
            handler.clear();
        }
    }
    Ok(())
}
