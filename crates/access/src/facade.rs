// Path: crates/access/src/facade.rs

//! The access façade.
//!
//! [`AccessManager`] is the public surface of the subsystem: it owns the
//! registry handle, applies the zone-selection policies for spending and
//! verification, gates fallback zones on issuer health, maps verified
//! zones to permissions, and bridges low-inventory notifications to the
//! account-update worker through a bounded, coalescing trigger channel.

use crate::handlers::OnShouldRequest;
use crate::persist;
use crate::zones::Registry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use veil_api::handler::TokenHandler;
use veil_api::issuer::{HealthChecker, IssuerStatus};
use veil_api::storage::RecordStore;
use veil_types::error::AccessError;
use veil_types::permission::Permission;
use veil_types::token::Token;

/// A coalescing trigger for immediate account-update runs.
///
/// Backed by a capacity-one channel: any number of fire calls between two
/// worker wake-ups collapse into a single run, and firing never blocks
/// the handler that noticed its inventory running low.
#[derive(Clone)]
pub struct UpdateTrigger {
    tx: mpsc::Sender<()>,
}

impl UpdateTrigger {
    /// Creates the trigger and the receiver the worker listens on.
    pub fn channel() -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    /// Requests an update run. Never blocks; a pending request absorbs
    /// repeats.
    pub fn fire(&self) {
        let _ = self.tx.try_send(());
    }

    /// Adapts the trigger into a handler notification callback.
    pub fn as_should_request(&self) -> OnShouldRequest {
        let trigger = self.clone();
        Arc::new(move |zone: &str| {
            tracing::debug!(zone, "inventory low, requesting account update");
            trigger.fire();
        })
    }
}

/// Per-zone diagnostics.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ZoneStatus {
    /// The zone name.
    pub zone: String,
    /// Tokens currently in the inventory.
    pub amount: usize,
    /// Whether the zone is a fallback zone.
    pub fallback: bool,
}

/// The default zone → permission table of the reference deployment.
pub fn default_permissions() -> HashMap<String, Permission> {
    let both = Permission::MAY_EXPAND | Permission::MAY_CONNECT;
    let mut map = HashMap::new();
    map.insert("pblind1".to_string(), both);
    map.insert("alpha2".to_string(), both);
    map.insert("fallback1".to_string(), both);
    map
}

/// The access façade.
pub struct AccessManager {
    registry: Arc<Registry>,
    store: Arc<dyn RecordStore>,
    status: Arc<IssuerStatus>,
    health: Arc<dyn HealthChecker>,
    permissions: HashMap<String, Permission>,
    persist_zones: Vec<String>,
}

impl AccessManager {
    /// Builds the façade over its collaborators with the reference
    /// permission table.
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<dyn RecordStore>,
        status: Arc<IssuerStatus>,
        health: Arc<dyn HealthChecker>,
    ) -> Self {
        Self {
            registry,
            store,
            status,
            health,
            permissions: default_permissions(),
            persist_zones: veil_types::config::AccessConfig::default().persist_zones,
        }
    }

    /// Replaces the permission table.
    pub fn with_permissions(mut self, permissions: HashMap<String, Permission>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Replaces the set of persistent zones.
    pub fn with_persist_zones(mut self, zones: Vec<String>) -> Self {
        self.persist_zones = zones;
        self
    }

    /// The registry handle.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The shared issuer status.
    pub fn status(&self) -> &Arc<IssuerStatus> {
        &self.status
    }

    /// Takes a token for spending, trying `zones` in order.
    ///
    /// Fallback zones are skipped unless the issuer-failing latch is set.
    /// The first success wins; otherwise the last error is returned, or
    /// [`AccessError::Empty`] when no zone was usable at all.
    pub fn get_token(&self, zones: &[&str]) -> Result<Token, AccessError> {
        let mut last_err = None;
        for zone in zones {
            let Some(handler) = self.registry.get(zone) else {
                last_err = Some(AccessError::ZoneUnknown(zone.to_string()));
                continue;
            };
            if handler.is_fallback() && !self.status.is_failing() {
                continue;
            }
            match handler.get_token() {
                Ok(token) => return Ok(token),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or(AccessError::Empty))
    }

    /// Verifies a spent token and returns the zone's permission set.
    ///
    /// Fallback-zone tokens are rejected with
    /// [`AccessError::FallbackUnavailable`] while the issuer is healthy:
    /// the fallback scheme exists for outages only.
    pub async fn verify_token(&self, token: &Token) -> Result<Permission, AccessError> {
        let handler = self
            .registry
            .get(&token.zone)
            .ok_or_else(|| AccessError::ZoneUnknown(token.zone.clone()))?;

        if handler.is_fallback() && self.healthy().await {
            return Err(AccessError::FallbackUnavailable);
        }

        handler.verify(token)?;

        let permission = self.permissions.get(&token.zone).copied();
        if permission.is_none() {
            tracing::warn!(zone = %token.zone, "verified zone has no permission mapping");
        }
        Ok(permission.unwrap_or_else(Permission::empty))
    }

    /// Whether the issuer currently answers its health route. Cached for
    /// 30 seconds.
    pub async fn healthy(&self) -> bool {
        if let Some(cached) = self.status.cached_health() {
            return cached;
        }
        let ok = self.health.check_health().await;
        self.status.record_health(ok);
        ok
    }

    /// Restores persistent inventories on subsystem start.
    pub async fn load_inventories(&self) -> Result<(), AccessError> {
        persist::load_zones(&self.registry, self.store.as_ref(), &self.persist_zones).await
    }

    /// Persists inventories on subsystem stop.
    pub async fn save_inventories(&self) -> Result<(), AccessError> {
        persist::save_zones(&self.registry, self.store.as_ref(), &self.persist_zones).await
    }

    /// Per-zone diagnostics in registration order.
    pub fn zone_status(&self) -> Vec<ZoneStatus> {
        self.registry
            .zones()
            .into_iter()
            .filter_map(|zone| {
                let handler = self.registry.get(&zone)?;
                Some(ZoneStatus {
                    amount: handler.amount(),
                    fallback: handler.is_fallback(),
                    zone,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{HashConfig, HashHandler};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use veil_crypto::digests::DigestAlg;
    use veil_storage::MemoryStore;

    struct StubHealth {
        ok: AtomicBool,
    }

    #[async_trait]
    impl HealthChecker for StubHealth {
        async fn check_health(&self) -> bool {
            self.ok.load(Ordering::SeqCst)
        }
    }

    fn manager(health_ok: bool) -> (AccessManager, Arc<StubHealth>) {
        let registry = Arc::new(Registry::new());
        registry
            .register_hash(HashHandler::new(HashConfig {
                fallback: true,
                ..HashConfig::with_preimages(
                    "fallback1",
                    DigestAlg::Blake2b256,
                    vec![b"fp".to_vec()],
                )
            }))
            .unwrap();
        registry
            .register_hash(HashHandler::new(HashConfig::with_preimages(
                "alpha2",
                DigestAlg::Blake2b256,
                vec![b"ap".to_vec()],
            )))
            .unwrap();

        let health = Arc::new(StubHealth {
            ok: AtomicBool::new(health_ok),
        });
        let manager = AccessManager::new(
            registry,
            Arc::new(MemoryStore::new()),
            Arc::new(IssuerStatus::new()),
            health.clone(),
        );
        (manager, health)
    }

    #[test]
    fn fallback_skipped_while_issuer_ok() {
        let (manager, _) = manager(true);
        let token = manager.get_token(&["fallback1", "alpha2"]).unwrap();
        assert_eq!(token.zone, "alpha2");
    }

    #[test]
    fn fallback_used_while_issuer_failing() {
        let (manager, _) = manager(false);
        manager.status().set_failing(true);
        let token = manager.get_token(&["fallback1", "alpha2"]).unwrap();
        assert_eq!(token.zone, "fallback1");
    }

    #[tokio::test]
    async fn fallback_verification_gated_on_health() {
        let (manager, health) = manager(false);
        manager.status().set_failing(true);
        let token = manager.get_token(&["fallback1"]).unwrap();

        let permission = manager.verify_token(&token).await.unwrap();
        assert_eq!(
            permission,
            Permission::MAY_EXPAND | Permission::MAY_CONNECT
        );

        health.ok.store(true, Ordering::SeqCst);
        manager.status().set_failing(false);
        assert!(matches!(
            manager.verify_token(&token).await,
            Err(AccessError::FallbackUnavailable)
        ));
    }

    #[tokio::test]
    async fn unknown_zone_is_rejected() {
        let (manager, _) = manager(true);
        assert!(matches!(
            manager.get_token(&["nosuch"]),
            Err(AccessError::ZoneUnknown(_))
        ));
        let token = Token::new("nosuch", vec![1]);
        assert!(matches!(
            manager.verify_token(&token).await,
            Err(AccessError::ZoneUnknown(_))
        ));
    }

    #[test]
    fn trigger_coalesces() {
        let (trigger, mut rx) = UpdateTrigger::channel();
        for _ in 0..32 {
            trigger.fire();
        }
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
