// Path: crates/access/src/handlers/blind.rs

//! The blind-signature zone handler.
//!
//! One handler type serves both protocol roles. A client handler holds the
//! issuer's public key and walks each batch through
//! `create_token_request` and `process_issued_tokens`; an issuer handler
//! holds the private key and answers with `create_setup` and
//! `issue_tokens`, retaining per-session signer state internally.
//!
//! Client-side request state (requester and secret per batch index) lives
//! behind its own mutex, separate from the inventory, and is taken out of
//! the handler at the start of `process_issued_tokens` so it is gone
//! whether processing succeeds or fails.

use super::{DoubleSpendGuard, OnShouldRequest};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use veil_api::handler::{BlindBatchOps, TokenHandler};
use veil_crypto::info::token_info_bytes;
use veil_crypto::pblind::{
    verify as pblind_verify, BlindCurve, Info, Requester, SignatureBytes, Signer, SigningKey,
    VerifyingKey,
};
use veil_crypto::rng::random_bytes32;
use veil_types::codec;
use veil_types::error::{AccessError, CryptoError};
use veil_types::protocol::{BatchIssued, BatchRequest, BatchSetup};
use veil_types::token::Token;
use zeroize::Zeroizing;

/// The default number of tokens per issuance batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A seed source for the post-validation shuffle. Defaults to the
/// operating system RNG; tests may inject a deterministic source.
pub type ShuffleSeed = Arc<dyn Fn() -> Result<[u8; 32], CryptoError> + Send + Sync>;

/// Configuration of a blind-signature handler.
pub struct BlindConfig<C: BlindCurve> {
    /// The zone name.
    pub zone: String,
    /// The signing key; present on the issuer side.
    pub signing_key: Option<SigningKey<C>>,
    /// The verification key; present on the client/verifier side.
    pub public_key: Option<VerifyingKey<C>>,
    /// Tokens per issuance batch.
    pub batch_size: usize,
    /// Whether each token's serial is bound into the signed info.
    pub use_serials: bool,
    /// Whether validated batches are shuffled before storage.
    pub randomize_order: bool,
    /// Whether this is a fallback zone.
    pub fallback: bool,
    /// Low-inventory notification.
    pub should_request: Option<OnShouldRequest>,
    /// Double-spend check applied on verify.
    pub double_spend_guard: Option<DoubleSpendGuard>,
    /// Shuffle seed source override.
    pub shuffle_seed: Option<ShuffleSeed>,
}

impl<C: BlindCurve> BlindConfig<C> {
    /// A client-side configuration with the given zone and public key.
    pub fn client(zone: impl Into<String>, public_key: VerifyingKey<C>) -> Self {
        Self {
            zone: zone.into(),
            signing_key: None,
            public_key: Some(public_key),
            batch_size: DEFAULT_BATCH_SIZE,
            use_serials: true,
            randomize_order: true,
            fallback: false,
            should_request: None,
            double_spend_guard: None,
            shuffle_seed: None,
        }
    }

    /// An issuer-side configuration with the given zone and signing key.
    pub fn issuer(zone: impl Into<String>, signing_key: SigningKey<C>) -> Self {
        Self {
            zone: zone.into(),
            signing_key: Some(signing_key),
            public_key: None,
            batch_size: DEFAULT_BATCH_SIZE,
            use_serials: true,
            randomize_order: true,
            fallback: false,
            should_request: None,
            double_spend_guard: None,
            shuffle_seed: None,
        }
    }
}

/// The token data a blind zone stores and spends.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct BlindTokenData {
    /// The batch serial, 0 when serials are disabled.
    pub serial: u64,
    /// The 32-byte token secret the signature covers.
    #[serde(with = "serde_bytes")]
    pub secret: Vec<u8>,
    /// The unblinded signature.
    pub signature: SignatureBytes,
}

struct PendingEntry<C: BlindCurve> {
    serial: u64,
    secret: Zeroizing<Vec<u8>>,
    requester: Requester<C>,
}

/// The blind-signature handler.
pub struct BlindHandler<C: BlindCurve> {
    zone: String,
    signing_key: Option<SigningKey<C>>,
    public_key: VerifyingKey<C>,
    batch_size: usize,
    use_serials: bool,
    randomize_order: bool,
    fallback: bool,
    should_request_cb: Option<OnShouldRequest>,
    double_spend_guard: Option<DoubleSpendGuard>,
    shuffle_seed: Option<ShuffleSeed>,
    inventory: Mutex<VecDeque<BlindTokenData>>,
    pending: Mutex<Option<Vec<PendingEntry<C>>>>,
    sessions: Mutex<HashMap<String, Vec<Signer<C>>>>,
    verify_gate: Mutex<()>,
}

impl<C: BlindCurve> BlindHandler<C> {
    /// Validates the configuration and builds the handler.
    ///
    /// At least one key must be supplied. Supplying both fails with
    /// [`CryptoError::KeyMismatch`] unless they belong together.
    pub fn new(config: BlindConfig<C>) -> Result<Arc<Self>, AccessError> {
        let public_key = match (&config.signing_key, &config.public_key) {
            (Some(signing), Some(public)) => {
                let derived = signing.verifying_key();
                if derived != *public {
                    return Err(CryptoError::KeyMismatch.into());
                }
                derived
            }
            (Some(signing), None) => signing.verifying_key(),
            (None, Some(public)) => *public,
            (None, None) => {
                return Err(CryptoError::State("blind handler needs a key".into()).into())
            }
        };

        Ok(Arc::new(Self {
            zone: config.zone,
            signing_key: config.signing_key,
            public_key,
            batch_size: config.batch_size.max(1),
            use_serials: config.use_serials,
            randomize_order: config.randomize_order,
            fallback: config.fallback,
            should_request_cb: config.should_request,
            double_spend_guard: config.double_spend_guard,
            shuffle_seed: config.shuffle_seed,
            inventory: Mutex::new(VecDeque::new()),
            pending: Mutex::new(None),
            sessions: Mutex::new(HashMap::new()),
            verify_gate: Mutex::new(()),
        }))
    }

    /// The configured batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn info_for(&self, serial: u64) -> Result<Info<C>, CryptoError> {
        let serial = self.use_serials.then_some(serial);
        Info::<C>::compress(&token_info_bytes(&self.zone, serial))
    }

    fn serial_for_index(&self, index: usize) -> u64 {
        if self.use_serials {
            index as u64 + 1
        } else {
            0
        }
    }

    fn check_serial(&self, serial: u64) -> Result<(), AccessError> {
        let ok = if self.use_serials {
            serial >= 1 && serial <= self.batch_size as u64
        } else {
            serial == 0
        };
        if ok {
            Ok(())
        } else {
            Err(AccessError::InvalidToken(format!(
                "serial {serial} out of range"
            )))
        }
    }

    fn check_signature(&self, data: &BlindTokenData) -> Result<(), AccessError> {
        self.check_serial(data.serial)?;
        let info = self.info_for(data.serial)?;
        pblind_verify::<C>(&self.public_key, &info, &data.secret, &data.signature)
            .map_err(|_| AccessError::InvalidToken("signature check failed".into()))
    }

    fn maybe_request_more(&self, remaining: usize) {
        if remaining * 10 <= self.batch_size {
            if let Some(cb) = &self.should_request_cb {
                cb(&self.zone);
            }
        }
    }
}

impl<C: BlindCurve> TokenHandler for BlindHandler<C> {
    fn zone(&self) -> &str {
        &self.zone
    }

    fn amount(&self) -> usize {
        self.inventory.lock().map(|inv| inv.len()).unwrap_or(0)
    }

    fn should_request(&self) -> bool {
        self.amount() * 10 <= self.batch_size
    }

    fn is_fallback(&self) -> bool {
        self.fallback
    }

    fn get_token(&self) -> Result<Token, AccessError> {
        let (token, remaining) = {
            let mut inventory = self
                .inventory
                .lock()
                .map_err(|_| CryptoError::State("inventory lock poisoned".into()))?;
            let token = inventory.pop_front();
            (token, inventory.len())
        };
        // The notification runs outside the inventory lock.
        self.maybe_request_more(remaining);
        let data = token.ok_or(AccessError::Empty)?;
        let bytes = codec::to_bytes_canonical(&data)
            .map_err(|e| CryptoError::State(format!("token encode: {e}")))?;
        Ok(Token::new(self.zone.clone(), bytes))
    }

    fn verify(&self, token: &Token) -> Result<(), AccessError> {
        if token.zone != self.zone {
            return Err(AccessError::ZoneMismatch {
                handler: self.zone.clone(),
                token: token.zone.clone(),
            });
        }
        let data: BlindTokenData = codec::from_bytes_canonical(&token.data)
            .map_err(AccessError::MalformedToken)?;

        // Two concurrent spends of the same token serialize here, so the
        // double-spend guard observes them in order.
        let _gate = self
            .verify_gate
            .lock()
            .map_err(|_| CryptoError::State("verify lock poisoned".into()))?;
        self.check_signature(&data)?;
        if let Some(guard) = &self.double_spend_guard {
            guard(&data.secret).map_err(|_| AccessError::AlreadyUsed)?;
        }
        Ok(())
    }

    fn save(&self) -> Result<Option<Vec<u8>>, AccessError> {
        let inventory = self
            .inventory
            .lock()
            .map_err(|_| CryptoError::State("inventory lock poisoned".into()))?;
        if inventory.is_empty() {
            return Ok(None);
        }
        let tokens: Vec<&BlindTokenData> = inventory.iter().collect();
        let bytes = codec::to_bytes_canonical(&tokens)
            .map_err(|e| CryptoError::State(format!("inventory encode: {e}")))?;
        Ok(Some(bytes))
    }

    fn load(&self, data: &[u8]) -> Result<(), AccessError> {
        let tokens: Vec<BlindTokenData> =
            codec::from_bytes_canonical(data).map_err(AccessError::MalformedToken)?;
        for token in &tokens {
            self.check_signature(token)?;
        }
        let mut inventory = self
            .inventory
            .lock()
            .map_err(|_| CryptoError::State("inventory lock poisoned".into()))?;
        *inventory = tokens.into();
        Ok(())
    }

    fn clear(&self) {
        if let Ok(mut inventory) = self.inventory.lock() {
            inventory.clear();
        }
        if let Ok(mut pending) = self.pending.lock() {
            *pending = None;
        }
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.clear();
        }
    }
}

impl<C: BlindCurve> BlindBatchOps for BlindHandler<C> {
    fn create_setup(&self, session_id: &str) -> Result<BatchSetup, AccessError> {
        let key = self
            .signing_key
            .as_ref()
            .ok_or_else(|| CryptoError::State("handler has no signing key".into()))?;

        let mut signers = Vec::with_capacity(self.batch_size);
        let mut setups = Vec::with_capacity(self.batch_size);
        for index in 0..self.batch_size {
            let info = self.info_for(self.serial_for_index(index))?;
            let (signer, setup) = Signer::new(key, &info, &mut OsRng);
            signers.push(signer);
            setups.push(setup);
        }

        self.sessions
            .lock()
            .map_err(|_| CryptoError::State("session lock poisoned".into()))?
            .insert(session_id.to_string(), signers);
        tracing::debug!(zone = %self.zone, session_id, batch = self.batch_size, "created signer batch");
        Ok(BatchSetup { setups })
    }

    fn issue_tokens(
        &self,
        session_id: &str,
        request: &BatchRequest,
    ) -> Result<BatchIssued, AccessError> {
        let signers = self
            .sessions
            .lock()
            .map_err(|_| CryptoError::State("session lock poisoned".into()))?
            .remove(session_id)
            .ok_or_else(|| CryptoError::State("unknown issuance session".into()))?;

        if signers.len() != self.batch_size || request.requests.len() != self.batch_size {
            return Err(CryptoError::BatchSize {
                expected: self.batch_size,
                got: request.requests.len(),
            }
            .into());
        }

        let mut issued = Vec::with_capacity(self.batch_size);
        for (signer, request) in signers.into_iter().zip(&request.requests) {
            issued.push(signer.issue(request)?);
        }
        Ok(BatchIssued { issued })
    }

    fn create_token_request(&self, setup: &BatchSetup) -> Result<BatchRequest, AccessError> {
        if setup.setups.len() != self.batch_size {
            return Err(CryptoError::BatchSize {
                expected: self.batch_size,
                got: setup.setups.len(),
            }
            .into());
        }

        let mut entries = Vec::with_capacity(self.batch_size);
        let mut requests = Vec::with_capacity(self.batch_size);
        for (index, setup_msg) in setup.setups.iter().enumerate() {
            let serial = self.serial_for_index(index);
            let secret = Zeroizing::new(random_bytes32()?.to_vec());
            let info = self.info_for(serial)?;
            let (requester, request) = Requester::new(
                &self.public_key,
                &info,
                secret.to_vec(),
                setup_msg,
                &mut OsRng,
            )?;
            entries.push(PendingEntry {
                serial,
                secret,
                requester,
            });
            requests.push(request);
        }

        *self
            .pending
            .lock()
            .map_err(|_| CryptoError::State("pending lock poisoned".into()))? = Some(entries);
        Ok(BatchRequest { requests })
    }

    fn process_issued_tokens(&self, issued: &BatchIssued) -> Result<(), AccessError> {
        // Taking the state up front guarantees it is gone at exit, on the
        // error paths as much as on success.
        let entries = self
            .pending
            .lock()
            .map_err(|_| CryptoError::State("pending lock poisoned".into()))?
            .take()
            .ok_or_else(|| CryptoError::State("no pending token request".into()))?;

        if issued.issued.len() != entries.len() {
            return Err(CryptoError::BatchSize {
                expected: entries.len(),
                got: issued.issued.len(),
            }
            .into());
        }

        let mut tokens = Vec::with_capacity(entries.len());
        for (entry, issued_msg) in entries.into_iter().zip(&issued.issued) {
            let signature = entry.requester.finalize(issued_msg)?;
            tokens.push(BlindTokenData {
                serial: entry.serial,
                secret: entry.secret.to_vec(),
                signature,
            });
        }

        if self.randomize_order {
            let seed = match &self.shuffle_seed {
                Some(source) => source()?,
                None => random_bytes32()?,
            };
            tokens.shuffle(&mut rand::rngs::StdRng::from_seed(seed));
        }

        let added = tokens.len();
        let mut inventory = self
            .inventory
            .lock()
            .map_err(|_| CryptoError::State("inventory lock poisoned".into()))?;
        inventory.extend(tokens);
        tracing::info!(zone = %self.zone, added, total = inventory.len(), "stored issued tokens");
        Ok(())
    }
}
