// Path: crates/types/src/codec.rs

//! Defines the canonical binary codec for all at-rest and wire data.
//!
//! This module provides simple wrappers around CBOR, which is the encoding
//! the account server and the local record store both speak. By centralizing
//! the codec logic here in the base `types` crate, we ensure that every
//! component uses the exact same serialization format for records and
//! protocol messages, so that a record written by one component can always
//! be read back by another.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a value into its canonical CBOR byte representation.
///
/// This function should be used for all data that is persisted to the local
/// record store or sent to the account server without a more specific wire
/// format.
pub fn to_bytes_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(v, &mut out).map_err(|e| format!("canonical encode failed: {e}"))?;
    Ok(out)
}

/// Decodes a value from its canonical CBOR byte representation.
///
/// This function fails fast on any decoding error, returning a descriptive
/// string. Trailing garbage after the encoded value is rejected.
pub fn from_bytes_canonical<T: DeserializeOwned>(b: &[u8]) -> Result<T, String> {
    let mut reader = std::io::Cursor::new(b);
    let value: T = ciborium::de::from_reader(&mut reader)
        .map_err(|e| format!("canonical decode failed: {e}"))?;
    if (reader.position() as usize) != b.len() {
        return Err("canonical decode failed: trailing bytes".to_string());
    }
    Ok(value)
}
