// Path: crates/api/src/lib.rs

//! # Veil Client API
//!
//! Core traits and interfaces for the anonymous access token subsystem.
//! This crate defines the stable contract between the zone handlers, the
//! access façade, the account client, and the local record store.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented
    )
)]

/// The uniform token-handler interface and the per-kind batch interfaces.
pub mod handler;
/// The shared issuer status latch and the health-check interface.
pub mod issuer;
/// The record-store interface and the at-rest record envelope.
pub mod storage;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::handler::{BlindBatchOps, HashBatchOps, TokenHandler};
    pub use crate::issuer::{HealthChecker, IssuerStatus};
    pub use crate::storage::{Record, RecordFlags, RecordStore};
}
