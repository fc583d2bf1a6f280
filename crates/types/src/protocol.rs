// Path: crates/types/src/protocol.rs

//! Wire messages of the token issuance round-trip.
//!
//! A single round-trip with the issuer carries both protocol phases: the
//! setup phase produces per-zone blind setup batches and a server-side
//! session id, and the request/issue phase exchanges the blinded requests
//! for issued messages. The messages here are plain data; the round-trip
//! logic lives in the access crate and the transport in the account crate.
//!
//! Maps are keyed by zone name. All byte fields hold scheme-defined
//! encodings (curve points and scalars for blind zones, raw preimages for
//! hash zones) and are opaque at this layer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One signer's setup message of the partially-blind protocol.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct BlindSetupMsg {
    /// The signer's first commitment point.
    #[serde(with = "serde_bytes")]
    pub a: Vec<u8>,
    /// The signer's second commitment point.
    #[serde(with = "serde_bytes")]
    pub b: Vec<u8>,
}

/// One requester's blinded challenge.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct BlindRequestMsg {
    /// The blinded challenge scalar.
    #[serde(with = "serde_bytes")]
    pub e: Vec<u8>,
}

/// One signer's response to a blinded challenge.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct BlindIssuedMsg {
    /// Response scalar `r`.
    #[serde(with = "serde_bytes")]
    pub r: Vec<u8>,
    /// Response scalar `c`.
    #[serde(with = "serde_bytes")]
    pub c: Vec<u8>,
    /// Response scalar `s`.
    #[serde(with = "serde_bytes")]
    pub s: Vec<u8>,
    /// Response scalar `d`.
    #[serde(with = "serde_bytes")]
    pub d: Vec<u8>,
}

/// A batch of setup messages for one blind zone.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct BatchSetup {
    /// Setup messages, one per batch index.
    pub setups: Vec<BlindSetupMsg>,
}

/// A batch of blinded requests for one blind zone.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct BatchRequest {
    /// Blinded challenges, one per batch index.
    pub requests: Vec<BlindRequestMsg>,
}

/// A batch of issued messages for one blind zone.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct BatchIssued {
    /// Issued messages, one per batch index.
    pub issued: Vec<BlindIssuedMsg>,
}

/// The client's opt-in marker for a hash zone.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct HashTokenRequest {}

/// Phase one, client to issuer: which blind zones need setup.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct SetupRequest {
    /// Blind zones whose handlers opted in to a new batch.
    pub blind_zones: BTreeSet<String>,
}

/// Phase one, issuer to client: session id plus per-zone setup batches.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct SetupResponse {
    /// The issuer's session id; flows back in the token request.
    pub session_id: String,
    /// Per-zone setup batches.
    pub blind_setups: BTreeMap<String, BatchSetup>,
}

/// Phase two, client to issuer: blinded requests and hash-zone opt-ins.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct TokenRequest {
    /// The session id from the setup response, empty when no setup ran.
    pub session_id: String,
    /// Per-zone blinded request batches.
    pub blind_requests: BTreeMap<String, BatchRequest>,
    /// Hash zones requesting a fresh preimage batch.
    pub hash_requests: BTreeMap<String, HashTokenRequest>,
}

/// Phase two, issuer to client: issued messages and preimage batches.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct IssuedTokens {
    /// Per-zone issued batches.
    pub blind_issued: BTreeMap<String, BatchIssued>,
    /// Per-zone preimage batches.
    pub hash_issued: BTreeMap<String, Vec<serde_bytes::ByteBuf>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn messages_roundtrip_through_codec() {
        let mut setups = BTreeMap::new();
        setups.insert(
            "pblind1".to_string(),
            BatchSetup {
                setups: vec![BlindSetupMsg {
                    a: vec![2; 33],
                    b: vec![3; 33],
                }],
            },
        );
        let resp = SetupResponse {
            session_id: "abc".into(),
            blind_setups: setups,
        };
        let bytes = codec::to_bytes_canonical(&resp).unwrap();
        let back: SetupResponse = codec::from_bytes_canonical(&bytes).unwrap();
        assert_eq!(resp, back);
    }
}
