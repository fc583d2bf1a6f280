// Path: crates/types/src/error/mod.rs
//! Core error types for the Veil client kernel.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors surfaced by token handlers, the zone registry, and the access
/// façade.
#[derive(Error, Debug)]
pub enum AccessError {
    /// No token is available in any of the requested zones.
    #[error("No token available in the requested zones")]
    Empty,
    /// The named zone is not registered.
    #[error("Unknown zone: {0}")]
    ZoneUnknown(String),
    /// A token was presented to a handler of a different zone.
    #[error("Zone mismatch: handler {handler} received a token for {token}")]
    ZoneMismatch {
        /// The zone of the handler that rejected the token.
        handler: String,
        /// The zone named in the token.
        token: String,
    },
    /// A zone with this name is already registered.
    #[error("Zone already registered: {0}")]
    ZoneTaken(String),
    /// A handler was registered with an empty zone name.
    #[error("Zone name must not be empty")]
    NoZone,
    /// The token bytes do not form a structurally valid token.
    #[error("Malformed token: {0}")]
    MalformedToken(String),
    /// The token's string encoding carries invalid base58.
    #[error("Token decode error: {0}")]
    DecodeError(String),
    /// The token is well-formed but fails verification.
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    /// The token was already spent.
    #[error("Token already used")]
    AlreadyUsed,
    /// A fallback-zone token was presented while the issuer is healthy.
    #[error("Fallback zone unavailable while the issuer is reachable")]
    FallbackUnavailable,
    /// A cryptographic operation failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// The record store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ErrorCode for AccessError {
    fn code(&self) -> &'static str {
        match self {
            Self::Empty => "ACCESS_EMPTY",
            Self::ZoneUnknown(_) => "ACCESS_ZONE_UNKNOWN",
            Self::ZoneMismatch { .. } => "ACCESS_ZONE_MISMATCH",
            Self::ZoneTaken(_) => "ACCESS_ZONE_TAKEN",
            Self::NoZone => "ACCESS_NO_ZONE",
            Self::MalformedToken(_) => "ACCESS_MALFORMED_TOKEN",
            Self::DecodeError(_) => "ACCESS_DECODE_ERROR",
            Self::InvalidToken(_) => "ACCESS_INVALID_TOKEN",
            Self::AlreadyUsed => "ACCESS_ALREADY_USED",
            Self::FallbackUnavailable => "ACCESS_FALLBACK_UNAVAILABLE",
            Self::Crypto(e) => e.code(),
            Self::Storage(e) => e.code(),
        }
    }
}

/// Errors surfaced by the account client and the account-update worker.
#[derive(Error, Debug)]
pub enum AccountError {
    /// No user record exists, or the user is logged out.
    #[error("Not logged in")]
    NotLoggedIn,
    /// The issuer rejected the credentials or the device identity.
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// The account has reached its device limit.
    #[error("Device limit reached")]
    DeviceLimitReached,
    /// The device has been locked by the issuer.
    #[error("Device is locked")]
    DeviceIsLocked,
    /// The user's plan does not permit relay access.
    #[error("The current plan does not permit relay access")]
    MayNotUseRelay,
    /// A transport-level error talking to the issuer.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The issuer returned an unexpected status.
    #[error("Unexpected issuer response: {0}")]
    Unknown(String),
    /// The rotated session bearer could not be persisted.
    #[error("Bearer rotation failed: {0}")]
    Rotation(String),
    /// A token-handling error during the issuance round-trip.
    #[error(transparent)]
    Access(#[from] AccessError),
    /// The record store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ErrorCode for AccountError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotLoggedIn => "ACCOUNT_NOT_LOGGED_IN",
            Self::InvalidCredentials => "ACCOUNT_INVALID_CREDENTIALS",
            Self::DeviceLimitReached => "ACCOUNT_DEVICE_LIMIT",
            Self::DeviceIsLocked => "ACCOUNT_DEVICE_LOCKED",
            Self::MayNotUseRelay => "ACCOUNT_MAY_NOT_USE_RELAY",
            Self::Connection(_) => "ACCOUNT_CONNECTION",
            Self::Unknown(_) => "ACCOUNT_UNKNOWN",
            Self::Rotation(_) => "ACCOUNT_ROTATION_FAILED",
            Self::Access(e) => e.code(),
            Self::Storage(e) => e.code(),
        }
    }
}

/// Errors from the composition of the cryptographic schemes.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// A supplied private key does not match the supplied public key.
    #[error("Private and public key do not match")]
    KeyMismatch,
    /// The strong random number source returned a short read.
    #[error("Random source failed: {0}")]
    ShortRead(String),
    /// A byte string did not decode to a valid curve point.
    #[error("Invalid curve point")]
    InvalidPoint,
    /// A byte string did not decode to a valid scalar.
    #[error("Invalid scalar")]
    InvalidScalar,
    /// A signature failed verification.
    #[error("Signature verification failed")]
    InvalidSignature,
    /// A batched message array had the wrong length.
    #[error("Batch size mismatch: expected {expected}, got {got}")]
    BatchSize {
        /// The configured batch size.
        expected: usize,
        /// The observed element count.
        got: usize,
    },
    /// Public info could not be compressed to a curve point.
    #[error("Info compression failed for the configured curve")]
    InfoCompression,
    /// A batched protocol call arrived in the wrong state.
    #[error("Protocol state error: {0}")]
    State(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::KeyMismatch => "CRYPTO_KEY_MISMATCH",
            Self::ShortRead(_) => "CRYPTO_SHORT_READ",
            Self::InvalidPoint => "CRYPTO_INVALID_POINT",
            Self::InvalidScalar => "CRYPTO_INVALID_SCALAR",
            Self::InvalidSignature => "CRYPTO_INVALID_SIGNATURE",
            Self::BatchSize { .. } => "CRYPTO_BATCH_SIZE",
            Self::InfoCompression => "CRYPTO_INFO_COMPRESSION",
            Self::State(_) => "CRYPTO_STATE",
        }
    }
}

/// Errors from the local record store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
    /// A stored record could not be decoded.
    #[error("Record decode error: {0}")]
    Decode(String),
    /// A stored record uses an unsupported envelope version.
    #[error("Unsupported record version: {0}")]
    UnsupportedVersion(u8),
}

impl ErrorCode for StorageError {
    fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "STORAGE_BACKEND",
            Self::Decode(_) => "STORAGE_DECODE",
            Self::UnsupportedVersion(_) => "STORAGE_UNSUPPORTED_VERSION",
        }
    }
}

/// The top-level error type unifying all subsystem errors.
#[derive(Error, Debug)]
pub enum CoreError {
    /// An access-layer error.
    #[error(transparent)]
    Access(#[from] AccessError),
    /// An account-layer error.
    #[error(transparent)]
    Account(#[from] AccountError),
    /// A cryptographic error.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// A storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ErrorCode for CoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Access(e) => e.code(),
            Self::Account(e) => e.code(),
            Self::Crypto(e) => e.code(),
            Self::Storage(e) => e.code(),
        }
    }
}
