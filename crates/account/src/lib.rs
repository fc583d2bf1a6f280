// Path: crates/account/src/lib.rs

//! # Veil Account
//!
//! The HTTPS client for the account server and the account-update worker.
//! The client authenticates the device session, rotates the session
//! bearer on every response, refreshes the cached user profile, and runs
//! the two-phase token-request RPC against the issuance protocol. The
//! worker schedules these refreshes and absorbs low-inventory triggers
//! from the zone handlers.

#![forbid(unsafe_code)]

/// The account server client.
pub mod client;
/// Tracing initialization for binaries and integration tests.
pub mod telemetry;
/// The account-update worker.
pub mod worker;
/// Wire-format negotiation for the account routes.
pub mod wire;

pub use client::{AccountClient, LogoutMode};
pub use worker::AccountWorker;
