// Path: crates/access/src/authorize.rs

//! The relay-session authorize operation.
//!
//! A short operation of type `auth`, run once per relay session: the
//! client spends a token, sends its raw encoding as the operation's init
//! payload, and expects an explicit acknowledgement within ten seconds.
//! The relay parses and verifies the token and attaches the resulting
//! permission to the session.
//!
//! Framing is a u32 big-endian length prefix followed by the payload,
//! then a single status byte in the other direction.

use crate::facade::AccessManager;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use veil_types::error::AccessError;
use veil_types::permission::Permission;
use veil_types::token::Token;

/// The operation type id.
pub const OP_TYPE_AUTH: &str = "auth";

/// How long the client waits for the relay's acknowledgement.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on the init payload; tokens are far smaller.
const MAX_TOKEN_FRAME: u32 = 4096;

const ACK_OK: u8 = 0x06;
const ACK_DENIED: u8 = 0x15;

/// Failure modes of the authorize operation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum OpError {
    /// The token was rejected by the verifier.
    #[error("permission denied")]
    PermissionDenied,
    /// The init payload was not a parseable token.
    #[error("malformed data")]
    MalformedData,
    /// The operation failed for an internal reason.
    #[error("internal error: {0}")]
    InternalError(String),
    /// The relay did not acknowledge within [`ACK_TIMEOUT`].
    #[error("no acknowledgement within {}s", ACK_TIMEOUT.as_secs())]
    AckTimeout,
}

/// Client side: spends a token over `zones` and redeems it on the relay
/// session stream.
pub async fn authorize_session<S>(
    stream: &mut S,
    manager: &AccessManager,
    zones: &[&str],
) -> Result<(), OpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let token = manager
        .get_token(zones)
        .map_err(|e| OpError::InternalError(e.to_string()))?;
    let raw = token.raw();

    stream
        .write_all(&(raw.len() as u32).to_be_bytes())
        .await
        .map_err(|e| OpError::InternalError(e.to_string()))?;
    stream
        .write_all(&raw)
        .await
        .map_err(|e| OpError::InternalError(e.to_string()))?;
    stream
        .flush()
        .await
        .map_err(|e| OpError::InternalError(e.to_string()))?;

    let mut ack = [0u8; 1];
    match tokio::time::timeout(ACK_TIMEOUT, stream.read_exact(&mut ack)).await {
        Err(_) => Err(OpError::AckTimeout),
        Ok(Err(e)) => Err(OpError::InternalError(e.to_string())),
        Ok(Ok(_)) if ack[0] == ACK_OK => Ok(()),
        Ok(Ok(_)) => Err(OpError::PermissionDenied),
    }
}

/// Relay side: reads the init payload, verifies the token, acknowledges,
/// and returns the permission to attach to the session.
pub async fn handle_authorize<S>(
    stream: &mut S,
    manager: &AccessManager,
) -> Result<Permission, OpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut len_bytes = [0u8; 4];
    stream
        .read_exact(&mut len_bytes)
        .await
        .map_err(|e| OpError::InternalError(e.to_string()))?;
    let len = u32::from_be_bytes(len_bytes);
    if len == 0 || len > MAX_TOKEN_FRAME {
        deny(stream).await;
        return Err(OpError::MalformedData);
    }

    let mut raw = vec![0u8; len as usize];
    stream
        .read_exact(&mut raw)
        .await
        .map_err(|e| OpError::InternalError(e.to_string()))?;

    let token = match Token::parse_raw(&raw) {
        Ok(token) => token,
        Err(_) => {
            deny(stream).await;
            return Err(OpError::MalformedData);
        }
    };

    match manager.verify_token(&token).await {
        Ok(permission) => {
            stream
                .write_all(&[ACK_OK])
                .await
                .map_err(|e| OpError::InternalError(e.to_string()))?;
            stream
                .flush()
                .await
                .map_err(|e| OpError::InternalError(e.to_string()))?;
            Ok(permission)
        }
        Err(AccessError::Storage(e)) => {
            deny(stream).await;
            Err(OpError::InternalError(e.to_string()))
        }
        Err(_) => {
            deny(stream).await;
            Err(OpError::PermissionDenied)
        }
    }
}

async fn deny<S: AsyncWrite + Unpin>(stream: &mut S) {
    // Best effort; the operation already failed.
    let _ = stream.write_all(&[ACK_DENIED]).await;
    let _ = stream.flush().await;
}
