// Path: crates/crypto/src/rng.rs

//! Strong-randomness helpers with explicit failure paths.
//!
//! Token secrets, session ids, and shuffle seeds all come from the
//! operating system RNG. A short read is a hard failure of the operation
//! drawing the bytes, never silently padded.

use rand::rngs::OsRng;
use rand::RngCore;
use veil_types::error::CryptoError;

/// Draws 32 bytes from the operating system RNG.
pub fn random_bytes32() -> Result<[u8; 32], CryptoError> {
    let mut out = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut out)
        .map_err(|e| CryptoError::ShortRead(e.to_string()))?;
    Ok(out)
}
