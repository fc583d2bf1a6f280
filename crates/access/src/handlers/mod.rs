// Path: crates/access/src/handlers/mod.rs

//! The zone handler implementations.
//!
//! Two kinds exist and the set is closed: blind-signature handlers mint
//! unlinkable tokens through an interactive protocol with the issuer, and
//! hash-preimage handlers hold shared secrets whose digests a verifier
//! recognizes. Both implement the uniform
//! [`veil_api::handler::TokenHandler`] interface plus their kind-specific
//! batch operations.

pub mod blind;
pub mod hash;

pub use blind::{BlindConfig, BlindHandler};
pub use hash::{HashConfig, HashHandler};

use std::sync::Arc;

/// A fire-and-forget notification that a handler's inventory ran low.
///
/// Handlers call this outside their own locks; the façade backs it with a
/// bounded, coalescing channel to the account-update worker, so re-entry
/// into handler state is impossible.
pub type OnShouldRequest = Arc<dyn Fn(&str) + Send + Sync>;

/// A double-spend check. Receives the spent token's secret and returns an
/// error if it was seen before.
pub type DoubleSpendGuard =
    Arc<dyn Fn(&[u8]) -> Result<(), veil_types::error::AccessError> + Send + Sync>;
