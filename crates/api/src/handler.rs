// Path: crates/api/src/handler.rs

//! The uniform token-handler interface.
//!
//! Every zone registers exactly one handler. The base [`TokenHandler`]
//! trait covers spending, verification, and persistence; the issuance
//! round-trip goes through the kind-specific [`BlindBatchOps`] and
//! [`HashBatchOps`] traits, which the protocol round-trip drives per zone.
//!
//! All methods take `&self`: implementations serialize internal mutation
//! behind their own locks, so handlers are safe to share across tasks.

use veil_types::error::AccessError;
use veil_types::protocol::{BatchIssued, BatchRequest, BatchSetup};
use veil_types::token::Token;

/// The interface every zone handler implements.
pub trait TokenHandler: Send + Sync {
    /// The zone this handler serves.
    fn zone(&self) -> &str;

    /// The number of tokens currently in the inventory.
    fn amount(&self) -> usize;

    /// Whether the handler wants a fresh issuance batch.
    fn should_request(&self) -> bool;

    /// Whether this is a fallback handler, spendable only while the issuer
    /// is failing.
    fn is_fallback(&self) -> bool;

    /// Takes a token for spending. Returns [`AccessError::Empty`] when the
    /// inventory has none.
    fn get_token(&self) -> Result<Token, AccessError>;

    /// Verifies a token minted for this zone.
    fn verify(&self, token: &Token) -> Result<(), AccessError>;

    /// Serializes the inventory for persistence. Returns `None` when the
    /// inventory is empty, in which case the caller deletes any prior
    /// record instead of writing one.
    fn save(&self) -> Result<Option<Vec<u8>>, AccessError>;

    /// Restores an inventory serialized by [`TokenHandler::save`]. Any
    /// element failing verification aborts the load.
    fn load(&self, data: &[u8]) -> Result<(), AccessError>;

    /// Drops all inventory and request-side state.
    fn clear(&self);
}

/// Issuance operations of a blind-signature handler.
///
/// The same handler type serves both roles: the issuer side retains
/// per-session signer state internally, keyed by the session id the
/// protocol round-trip hands it.
pub trait BlindBatchOps: TokenHandler {
    /// Issuer: creates a batch of signer setup messages and retains the
    /// signer state under `session_id`.
    fn create_setup(&self, session_id: &str) -> Result<BatchSetup, AccessError>;

    /// Issuer: advances the retained signers with the client's blinded
    /// requests, consuming the session state.
    fn issue_tokens(
        &self,
        session_id: &str,
        request: &BatchRequest,
    ) -> Result<BatchIssued, AccessError>;

    /// Client: consumes a setup batch, drawing fresh secrets and retaining
    /// requester state until [`BlindBatchOps::process_issued_tokens`].
    fn create_token_request(&self, setup: &BatchSetup) -> Result<BatchRequest, AccessError>;

    /// Client: unblinds and validates the issued batch, appending all
    /// tokens to the inventory atomically. Request-side state is cleared
    /// whether this succeeds or fails.
    fn process_issued_tokens(&self, issued: &BatchIssued) -> Result<(), AccessError>;
}

/// Issuance operations of a hash-preimage handler.
pub trait HashBatchOps: TokenHandler {
    /// Issuer: returns a copy of the current preimage inventory.
    fn issue_tokens(&self) -> Result<Vec<Vec<u8>>, AccessError>;

    /// Client: validates every received preimage against the verifier set
    /// and replaces the inventory wholesale. A single invalid preimage
    /// rejects the whole batch.
    fn process_issued_tokens(&self, preimages: &[Vec<u8>]) -> Result<(), AccessError>;
}
