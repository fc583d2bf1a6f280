// Path: crates/types/src/token.rs

//! The access token value type.
//!
//! A [`Token`] pairs a zone name with opaque, zone-specific data. The zone
//! selects the handler that minted the token and is the only part a relay
//! inspects before dispatching to the matching verifier.
//!
//! Two serializations exist:
//! - *raw*: UTF-8 zone, a single `:` byte, then the raw data bytes;
//! - *string*: zone, `:`, then base58 of the data.
//!
//! Both obey the round-trip law `parse(encode(t)) == t`.

use crate::error::AccessError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The separator between the zone name and the token data.
const SEPARATOR: u8 = b':';

/// An anonymous access token: a zone name plus opaque per-zone data.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Token {
    /// The zone this token belongs to.
    pub zone: String,
    /// Opaque token data; its layout is defined by the zone's handler.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl Token {
    /// Creates a token from a zone name and raw data.
    pub fn new(zone: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            zone: zone.into(),
            data,
        }
    }

    /// Returns the raw encoding: `<zone bytes> 0x3A <data bytes>`.
    pub fn raw(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.zone.len() + 1 + self.data.len());
        out.extend_from_slice(self.zone.as_bytes());
        out.push(SEPARATOR);
        out.extend_from_slice(&self.data);
        out
    }

    /// Parses a token from its raw encoding.
    ///
    /// The zone is everything before the first `:` byte and must be valid
    /// UTF-8; the data is everything after it, unaltered.
    pub fn parse_raw(raw: &[u8]) -> Result<Self, AccessError> {
        let sep = raw
            .iter()
            .position(|&b| b == SEPARATOR)
            .ok_or_else(|| AccessError::MalformedToken("missing zone separator".into()))?;
        let zone = std::str::from_utf8(&raw[..sep])
            .map_err(|_| AccessError::MalformedToken("zone is not valid utf-8".into()))?;
        Ok(Self {
            zone: zone.to_string(),
            data: raw[sep + 1..].to_vec(),
        })
    }

    /// Parses a token from its string encoding `<zone>:<base58 data>`.
    pub fn parse(s: &str) -> Result<Self, AccessError> {
        let (zone, encoded) = s
            .split_once(':')
            .ok_or_else(|| AccessError::MalformedToken("missing zone separator".into()))?;
        let data = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| AccessError::DecodeError(e.to_string()))?;
        Ok(Self {
            zone: zone.to_string(),
            data,
        })
    }
}

impl fmt::Display for Token {
    /// Formats the token in its string encoding.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.zone, bs58::encode(&self.data).into_string())
    }
}
