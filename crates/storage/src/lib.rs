// Path: crates/storage/src/lib.rs
//! # Veil Record Store
//!
//! A small, durable key-value store for the handful of records the access
//! token subsystem persists: the cached user, the session bearer, and the
//! per-zone token inventories. Backed by `redb` with a single table; an
//! in-memory implementation is provided for tests.

#![forbid(unsafe_code)]

/// The in-memory store used in tests.
pub mod memory;
/// The redb-backed store.
pub mod record_db;

pub use memory::MemoryStore;
pub use record_db::RecordDb;
