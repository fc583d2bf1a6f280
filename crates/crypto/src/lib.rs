// Path: crates/crypto/src/lib.rs
//! Cryptographic scheme composition for the Veil client kernel.
//!
//! This crate does not implement primitives; it composes the RustCrypto
//! curve and digest crates into the two schemes the access token subsystem
//! needs: a partially-blind signature protocol over the NIST curves
//! ([`pblind`]) and a digest registry for the hash-preimage scheme
//! ([`digests`]).

#![forbid(unsafe_code)]

/// The digest algorithm registry for hash-preimage zones.
pub mod digests;
/// Length-prefixed framing of the public info bound into blind signatures.
pub mod info;
/// The partially-blind signature protocol.
pub mod pblind;
/// Strong-randomness helpers with explicit failure paths.
pub mod rng;
