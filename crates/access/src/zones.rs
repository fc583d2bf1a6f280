// Path: crates/access/src/zones.rs

//! The zone registry.
//!
//! An explicit handle mapping zone names to handlers, owned by the façade
//! and passed into components by reference; there are no hidden globals.
//! Two secondary lists are maintained in insertion order so the protocol
//! round-trip can enumerate each handler kind deterministically.

use crate::handlers::{BlindHandler, HashHandler};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use veil_api::handler::{BlindBatchOps, HashBatchOps, TokenHandler};
use veil_crypto::pblind::BlindCurve;
use veil_types::error::AccessError;

#[derive(Default)]
struct Inner {
    handlers: HashMap<String, Arc<dyn TokenHandler>>,
    order: Vec<String>,
    blind: Vec<Arc<dyn BlindBatchOps>>,
    hash: Vec<Arc<dyn HashBatchOps>>,
}

/// The registry of zone handlers.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn check_name(inner: &Inner, zone: &str) -> Result<(), AccessError> {
        if zone.is_empty() {
            return Err(AccessError::NoZone);
        }
        if inner.handlers.contains_key(zone) {
            return Err(AccessError::ZoneTaken(zone.to_string()));
        }
        Ok(())
    }

    /// Registers a blind-signature handler.
    pub fn register_blind<C: BlindCurve>(
        &self,
        handler: Arc<BlindHandler<C>>,
    ) -> Result<(), AccessError> {
        let mut inner = self.write()?;
        Self::check_name(&inner, handler.zone())?;
        let zone = handler.zone().to_string();
        inner.order.push(zone.clone());
        inner.handlers.insert(zone, handler.clone());
        inner.blind.push(handler);
        Ok(())
    }

    /// Registers a hash-preimage handler.
    pub fn register_hash(&self, handler: Arc<HashHandler>) -> Result<(), AccessError> {
        let mut inner = self.write()?;
        Self::check_name(&inner, handler.zone())?;
        let zone = handler.zone().to_string();
        inner.order.push(zone.clone());
        inner.handlers.insert(zone, handler.clone());
        inner.hash.push(handler);
        Ok(())
    }

    /// Looks up a handler by zone name.
    pub fn get(&self, zone: &str) -> Option<Arc<dyn TokenHandler>> {
        self.inner.read().ok()?.handlers.get(zone).cloned()
    }

    /// All zone names in registration order.
    pub fn zones(&self) -> Vec<String> {
        self.inner
            .read()
            .map(|inner| inner.order.clone())
            .unwrap_or_default()
    }

    /// Blind handlers in registration order.
    pub fn blind_zones(&self) -> Vec<Arc<dyn BlindBatchOps>> {
        self.inner
            .read()
            .map(|inner| inner.blind.clone())
            .unwrap_or_default()
    }

    /// A blind handler by zone name.
    pub fn blind_zone(&self, zone: &str) -> Option<Arc<dyn BlindBatchOps>> {
        self.inner
            .read()
            .ok()?
            .blind
            .iter()
            .find(|h| h.zone() == zone)
            .cloned()
    }

    /// Hash handlers in registration order.
    pub fn hash_zones(&self) -> Vec<Arc<dyn HashBatchOps>> {
        self.inner
            .read()
            .map(|inner| inner.hash.clone())
            .unwrap_or_default()
    }

    /// A hash handler by zone name.
    pub fn hash_zone(&self, zone: &str) -> Option<Arc<dyn HashBatchOps>> {
        self.inner
            .read()
            .ok()?
            .hash
            .iter()
            .find(|h| h.zone() == zone)
            .cloned()
    }

    /// Drops all registrations. Test use only.
    pub fn reset_for_test(&self) {
        if let Ok(mut inner) = self.inner.write() {
            *inner = Inner::default();
        }
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, AccessError> {
        self.inner
            .write()
            .map_err(|_| AccessError::InvalidToken("registry lock poisoned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HashConfig;
    use veil_crypto::digests::DigestAlg;

    fn hash_handler(zone: &str) -> Arc<HashHandler> {
        HashHandler::new(HashConfig::with_preimages(
            zone,
            DigestAlg::Blake2b256,
            vec![b"p".to_vec()],
        ))
    }

    #[test]
    fn registration_and_lookup() {
        let registry = Registry::new();
        registry.register_hash(hash_handler("alpha2")).unwrap();
        registry.register_hash(hash_handler("fallback1")).unwrap();

        assert!(registry.get("alpha2").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.zones(), vec!["alpha2", "fallback1"]);
        assert_eq!(registry.hash_zones().len(), 2);
        assert!(registry.blind_zones().is_empty());
    }

    #[test]
    fn duplicate_zone_is_rejected() {
        let registry = Registry::new();
        registry.register_hash(hash_handler("alpha2")).unwrap();
        assert!(matches!(
            registry.register_hash(hash_handler("alpha2")),
            Err(AccessError::ZoneTaken(_))
        ));
    }

    #[test]
    fn empty_zone_is_rejected() {
        let registry = Registry::new();
        assert!(matches!(
            registry.register_hash(hash_handler("")),
            Err(AccessError::NoZone)
        ));
    }

    #[test]
    fn reset_clears_everything() {
        let registry = Registry::new();
        registry.register_hash(hash_handler("alpha2")).unwrap();
        registry.reset_for_test();
        assert!(registry.zones().is_empty());
        assert!(registry.get("alpha2").is_none());
    }
}
