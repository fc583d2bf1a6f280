// Path: crates/account/src/wire.rs

//! Wire-format negotiation for the account routes.
//!
//! The account server speaks JSON on the user-facing routes and MsgPack on
//! the token-request routes; CBOR is accepted everywhere. The selection is
//! carried in the `Content-Type`/`Accept` headers and resolved here.

use serde::de::DeserializeOwned;
use serde::Serialize;
use veil_types::error::AccountError;

/// A wire format the account client can encode and decode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WireFormat {
    /// `application/json`
    Json,
    /// `application/cbor`
    Cbor,
    /// `application/msgpack`
    MsgPack,
}

impl WireFormat {
    /// The content-type string of this format.
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Cbor => "application/cbor",
            Self::MsgPack => "application/msgpack",
        }
    }

    /// Resolves a content-type header value, ignoring parameters.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or("").trim();
        match essence {
            "application/json" => Some(Self::Json),
            "application/cbor" => Some(Self::Cbor),
            "application/msgpack" | "application/x-msgpack" => Some(Self::MsgPack),
            _ => None,
        }
    }

    /// Encodes a value in this format.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, AccountError> {
        match self {
            Self::Json => serde_json::to_vec(value)
                .map_err(|e| AccountError::Unknown(format!("json encode: {e}"))),
            Self::Cbor => {
                let mut out = Vec::new();
                ciborium::ser::into_writer(value, &mut out)
                    .map_err(|e| AccountError::Unknown(format!("cbor encode: {e}")))?;
                Ok(out)
            }
            Self::MsgPack => rmp_serde::to_vec_named(value)
                .map_err(|e| AccountError::Unknown(format!("msgpack encode: {e}"))),
        }
    }

    /// Decodes a value in this format.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, AccountError> {
        match self {
            Self::Json => serde_json::from_slice(bytes)
                .map_err(|e| AccountError::Unknown(format!("json decode: {e}"))),
            Self::Cbor => ciborium::de::from_reader(bytes)
                .map_err(|e| AccountError::Unknown(format!("cbor decode: {e}"))),
            Self::MsgPack => rmp_serde::from_slice(bytes)
                .map_err(|e| AccountError::Unknown(format!("msgpack decode: {e}"))),
        }
    }
}
