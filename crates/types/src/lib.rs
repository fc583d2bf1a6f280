// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Veil Client Types
//!
//! This crate is the foundational library for the Veil client kernel,
//! containing the core data structures, error types, and configuration
//! objects of the anonymous access token subsystem.
//!
//! ## Architectural Role
//!
//! As the base crate, `veil-types` has minimal dependencies and is itself a
//! dependency for almost every other crate in the workspace. This structure
//! prevents circular dependencies and provides a stable, canonical
//! definition for shared types like [`token::Token`],
//! [`account::UserRecord`], and the error enums.

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::CoreError> = std::result::Result<T, E>;

/// Cached user, session, and subscription records.
pub mod account;
/// The canonical binary codec for at-rest and wire data.
pub mod codec;
/// Shared configuration structures for the access and account components.
pub mod config;
/// A unified set of all error types used across the subsystem.
pub mod error;
/// Constants for well-known record keys in the local key-value store.
pub mod keys;
/// The relay permission bit set.
pub mod permission;
/// Wire messages of the token issuance round-trip.
pub mod protocol;
/// The access token value type and its encodings.
pub mod token;
