// Path: crates/access/tests/persistence_e2e.rs

//! Inventory persistence across a restart: a hash zone filled by an
//! issuance batch survives stop/start against the durable store, and the
//! restored tokens still spend and verify.

use async_trait::async_trait;
use std::sync::Arc;
use veil_access::facade::AccessManager;
use veil_access::handlers::{HashConfig, HashHandler};
use veil_access::Registry;
use veil_api::handler::{HashBatchOps, TokenHandler};
use veil_api::issuer::{HealthChecker, IssuerStatus};
use veil_crypto::digests::DigestAlg;
use veil_storage::RecordDb;

struct NeverHealthy;

#[async_trait]
impl HealthChecker for NeverHealthy {
    async fn check_health(&self) -> bool {
        false
    }
}

fn build_manager(store: Arc<RecordDb>) -> AccessManager {
    let registry = Arc::new(Registry::new());
    let digests = vec![
        DigestAlg::Blake2b256.digest(b"issued-one"),
        DigestAlg::Blake2b256.digest(b"issued-two"),
        DigestAlg::Blake2b256.digest(b"issued-three"),
    ];
    registry
        .register_hash(HashHandler::new(HashConfig::verify_only(
            "alpha2",
            DigestAlg::Blake2b256,
            digests,
        )))
        .unwrap();
    AccessManager::new(
        registry,
        store,
        Arc::new(IssuerStatus::new()),
        Arc::new(NeverHealthy),
    )
    .with_persist_zones(vec!["alpha2".to_string()])
}

#[tokio::test]
async fn inventory_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.redb");

    // First life: receive an issued batch, then stop.
    {
        let store = Arc::new(RecordDb::open(&path).unwrap());
        let manager = build_manager(store);
        let handler = manager.registry().hash_zone("alpha2").unwrap();
        handler
            .process_issued_tokens(&[
                b"issued-one".to_vec(),
                b"issued-two".to_vec(),
                b"issued-three".to_vec(),
            ])
            .unwrap();
        assert_eq!(handler.amount(), 3);
        manager.save_inventories().await.unwrap();
    }

    // Second life: start from the same database file.
    let store = Arc::new(RecordDb::open(&path).unwrap());
    let manager = build_manager(store);
    manager.load_inventories().await.unwrap();

    let handler = manager.registry().get("alpha2").unwrap();
    assert_eq!(handler.amount(), 3);

    // The restored tokens spend and verify.
    let token = manager.get_token(&["alpha2"]).unwrap();
    let permission = manager.verify_token(&token).await.unwrap();
    assert!(!permission.is_empty());
}

#[tokio::test]
async fn emptied_inventory_clears_stored_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.redb");

    {
        let store = Arc::new(RecordDb::open(&path).unwrap());
        let manager = build_manager(store);
        let handler = manager.registry().hash_zone("alpha2").unwrap();
        handler
            .process_issued_tokens(&[b"issued-one".to_vec()])
            .unwrap();
        manager.save_inventories().await.unwrap();

        // Inventory emptied before the next stop: the record goes away.
        handler.clear();
        manager.save_inventories().await.unwrap();
    }

    let store = Arc::new(RecordDb::open(&path).unwrap());
    let manager = build_manager(store);
    manager.load_inventories().await.unwrap();
    assert_eq!(manager.registry().get("alpha2").unwrap().amount(), 0);
}
