// Path: crates/access/src/lib.rs

//! # Veil Access
//!
//! The anonymous access token subsystem: zone handlers, the zone registry,
//! the issuance protocol round-trip, inventory persistence, the access
//! façade, and the relay-session authorize operation.
//!
//! Tokens authorize the bearer to use the relay network without revealing
//! which customer performed a given request. Blind-signature zones mint
//! unlinkable single-use tokens in batches; hash-preimage zones provide a
//! shared-secret fallback for when the issuer is unreachable.

#![forbid(unsafe_code)]

/// The relay-session authorize operation.
pub mod authorize;
/// The access façade: zone selection, health gating, permissions.
pub mod facade;
/// The blind-signature and hash-preimage handlers.
pub mod handlers;
/// Per-zone inventory persistence.
pub mod persist;
/// The issuance protocol round-trip, client and issuer sides.
pub mod protocol;
/// The zone registry.
pub mod zones;

pub use facade::{AccessManager, UpdateTrigger};
pub use zones::Registry;
