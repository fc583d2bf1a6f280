// Path: crates/access/src/handlers/hash.rs

//! The hash-preimage zone handler.
//!
//! The shared-secret fallback scheme: possession of a preimage whose
//! digest a verifier recognizes proves entitlement. Unlike blind tokens,
//! preimages are not single-use at this layer; `get_token` reads the
//! inventory head without consuming it, and a deployment that needs
//! single-use semantics enforces them at the verifier.
//!
//! The verifier set only grows at runtime. Issuance replaces the preimage
//! inventory wholesale; verification never removes a digest.

use super::OnShouldRequest;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use veil_api::handler::{HashBatchOps, TokenHandler};
use veil_crypto::digests::DigestAlg;
use veil_types::error::{AccessError, CryptoError};
use veil_types::token::Token;

/// Configuration of a hash-preimage handler.
pub struct HashConfig {
    /// The zone name.
    pub zone: String,
    /// The digest algorithm of the verifier set.
    pub algorithm: DigestAlg,
    /// Initial preimages; installed spendable and verifiable.
    pub preimages: Vec<Vec<u8>>,
    /// Initial verifier digests; installed verify-only.
    pub verifiers: Vec<Vec<u8>>,
    /// Whether this is a fallback zone.
    pub fallback: bool,
    /// Low-inventory notification.
    pub should_request: Option<OnShouldRequest>,
}

impl HashConfig {
    /// A primary zone seeded with verifier digests only.
    pub fn verify_only(
        zone: impl Into<String>,
        algorithm: DigestAlg,
        verifiers: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            zone: zone.into(),
            algorithm,
            preimages: Vec::new(),
            verifiers,
            fallback: false,
            should_request: None,
        }
    }

    /// A zone seeded with spendable preimages.
    pub fn with_preimages(
        zone: impl Into<String>,
        algorithm: DigestAlg,
        preimages: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            zone: zone.into(),
            algorithm,
            preimages,
            verifiers: Vec::new(),
            fallback: false,
            should_request: None,
        }
    }
}

/// The hash-preimage handler.
pub struct HashHandler {
    zone: String,
    algorithm: DigestAlg,
    fallback: bool,
    should_request_cb: Option<OnShouldRequest>,
    inventory: Mutex<Vec<Vec<u8>>>,
    verifiers: Mutex<HashSet<Vec<u8>>>,
}

impl HashHandler {
    /// Builds the handler, hashing every initial preimage into the
    /// verifier set.
    pub fn new(config: HashConfig) -> Arc<Self> {
        let mut verifiers: HashSet<Vec<u8>> = config.verifiers.into_iter().collect();
        for preimage in &config.preimages {
            verifiers.insert(config.algorithm.digest(preimage));
        }
        Arc::new(Self {
            zone: config.zone,
            algorithm: config.algorithm,
            fallback: config.fallback,
            should_request_cb: config.should_request,
            inventory: Mutex::new(config.preimages),
            verifiers: Mutex::new(verifiers),
        })
    }

    /// The configured digest algorithm.
    pub fn algorithm(&self) -> DigestAlg {
        self.algorithm
    }

    fn digest_known(&self, preimage: &[u8]) -> Result<bool, AccessError> {
        let digest = self.algorithm.digest(preimage);
        let verifiers = self
            .verifiers
            .lock()
            .map_err(|_| CryptoError::State("verifier lock poisoned".into()))?;
        Ok(verifiers.contains(&digest))
    }
}

impl TokenHandler for HashHandler {
    fn zone(&self) -> &str {
        &self.zone
    }

    fn amount(&self) -> usize {
        self.inventory.lock().map(|inv| inv.len()).unwrap_or(0)
    }

    fn should_request(&self) -> bool {
        !self.fallback && self.amount() == 0
    }

    fn is_fallback(&self) -> bool {
        self.fallback
    }

    fn get_token(&self) -> Result<Token, AccessError> {
        let head = {
            let inventory = self
                .inventory
                .lock()
                .map_err(|_| CryptoError::State("inventory lock poisoned".into()))?;
            inventory.first().cloned()
        };
        if head.is_none() {
            if let Some(cb) = &self.should_request_cb {
                if self.should_request() {
                    cb(&self.zone);
                }
            }
        }
        let preimage = head.ok_or(AccessError::Empty)?;
        Ok(Token::new(self.zone.clone(), preimage))
    }

    fn verify(&self, token: &Token) -> Result<(), AccessError> {
        if token.zone != self.zone {
            return Err(AccessError::ZoneMismatch {
                handler: self.zone.clone(),
                token: token.zone.clone(),
            });
        }
        if self.digest_known(&token.data)? {
            Ok(())
        } else {
            Err(AccessError::InvalidToken("unknown preimage digest".into()))
        }
    }

    fn save(&self) -> Result<Option<Vec<u8>>, AccessError> {
        let inventory = self
            .inventory
            .lock()
            .map_err(|_| CryptoError::State("inventory lock poisoned".into()))?;
        if inventory.is_empty() {
            return Ok(None);
        }
        let bytes = veil_types::codec::to_bytes_canonical(&*inventory)
            .map_err(|e| CryptoError::State(format!("inventory encode: {e}")))?;
        Ok(Some(bytes))
    }

    fn load(&self, data: &[u8]) -> Result<(), AccessError> {
        let preimages: Vec<Vec<u8>> = veil_types::codec::from_bytes_canonical(data)
            .map_err(AccessError::MalformedToken)?;
        for preimage in &preimages {
            if !self.digest_known(preimage)? {
                return Err(AccessError::InvalidToken(
                    "stored preimage not in verifier set".into(),
                ));
            }
        }
        let mut inventory = self
            .inventory
            .lock()
            .map_err(|_| CryptoError::State("inventory lock poisoned".into()))?;
        *inventory = preimages;
        Ok(())
    }

    fn clear(&self) {
        if let Ok(mut inventory) = self.inventory.lock() {
            inventory.clear();
        }
    }
}

impl HashBatchOps for HashHandler {
    fn issue_tokens(&self) -> Result<Vec<Vec<u8>>, AccessError> {
        let inventory = self
            .inventory
            .lock()
            .map_err(|_| CryptoError::State("inventory lock poisoned".into()))?;
        Ok(inventory.clone())
    }

    fn process_issued_tokens(&self, preimages: &[Vec<u8>]) -> Result<(), AccessError> {
        for preimage in preimages {
            if !self.digest_known(preimage)? {
                return Err(AccessError::InvalidToken(
                    "issued preimage not in verifier set".into(),
                ));
            }
        }
        let mut inventory = self
            .inventory
            .lock()
            .map_err(|_| CryptoError::State("inventory lock poisoned".into()))?;
        *inventory = preimages.to_vec();
        tracing::info!(zone = %self.zone, count = inventory.len(), "replaced preimage inventory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler_with_preimages() -> Arc<HashHandler> {
        HashHandler::new(HashConfig::with_preimages(
            "unittest",
            DigestAlg::Blake2b256,
            vec![b"alpha".to_vec(), b"beta".to_vec()],
        ))
    }

    #[test]
    fn initial_preimages_spend_and_verify() {
        let handler = handler_with_preimages();
        let token = handler.get_token().unwrap();
        handler.verify(&token).unwrap();
        assert_eq!(token.data, b"alpha");
    }

    #[test]
    fn get_token_does_not_consume() {
        let handler = handler_with_preimages();
        let first = handler.get_token().unwrap();
        let second = handler.get_token().unwrap();
        assert_eq!(first, second);
        assert_eq!(handler.amount(), 2);
    }

    #[test]
    fn verifier_only_zone_cannot_spend() {
        let digest = DigestAlg::Blake2b256.digest(b"secret");
        let handler = HashHandler::new(HashConfig::verify_only(
            "unittest",
            DigestAlg::Blake2b256,
            vec![digest],
        ));
        assert!(matches!(handler.get_token(), Err(AccessError::Empty)));
        handler
            .verify(&Token::new("unittest", b"secret".to_vec()))
            .unwrap();
    }

    #[test]
    fn verify_matches_digest_membership() {
        let handler = handler_with_preimages();
        assert!(handler
            .verify(&Token::new("unittest", b"alpha".to_vec()))
            .is_ok());
        assert!(matches!(
            handler.verify(&Token::new("unittest", b"gamma".to_vec())),
            Err(AccessError::InvalidToken(_))
        ));
        assert!(matches!(
            handler.verify(&Token::new("other", b"alpha".to_vec())),
            Err(AccessError::ZoneMismatch { .. })
        ));
    }

    #[test]
    fn issuance_replaces_inventory_wholesale() {
        let handler = handler_with_preimages();
        handler
            .process_issued_tokens(&[b"beta".to_vec()])
            .unwrap();
        assert_eq!(handler.amount(), 1);
        assert_eq!(handler.get_token().unwrap().data, b"beta");
    }

    #[test]
    fn one_unknown_preimage_rejects_whole_batch() {
        let handler = handler_with_preimages();
        let result =
            handler.process_issued_tokens(&[b"alpha".to_vec(), b"unknown".to_vec()]);
        assert!(result.is_err());
        // Inventory unchanged.
        assert_eq!(handler.amount(), 2);
    }

    #[test]
    fn save_load_roundtrip() {
        let handler = handler_with_preimages();
        let saved = handler.save().unwrap().unwrap();
        handler.clear();
        assert_eq!(handler.amount(), 0);
        handler.load(&saved).unwrap();
        assert_eq!(handler.amount(), 2);

        handler.clear();
        assert!(handler.save().unwrap().is_none());
    }

    #[test]
    fn load_rejects_foreign_preimages() {
        let handler = handler_with_preimages();
        let foreign =
            veil_types::codec::to_bytes_canonical(&vec![b"foreign".to_vec()]).unwrap();
        assert!(handler.load(&foreign).is_err());
    }

    #[test]
    fn fallback_never_requests() {
        let handler = HashHandler::new(HashConfig {
            fallback: true,
            ..HashConfig::with_preimages("fallback1", DigestAlg::Blake2b256, vec![])
        });
        assert!(!handler.should_request());
    }
}
