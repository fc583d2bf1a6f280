// Path: crates/crypto/src/pblind/mod.rs

//! The partially-blind signature protocol.
//!
//! Three messages, two roles. The signer commits to fresh nonces and the
//! public info point (setup), the requester blinds its message and returns
//! a challenge (request), and the signer answers with the response scalars
//! (issued). Unblinding yields a signature the signer cannot link to the
//! request, while the info point binds the zone and serial into the signed
//! material.
//!
//! With generator `G`, signer key `y = x·G`, and info point `Z`:
//!
//! - setup: nonces `u, s, d`; `a = u·G`, `b = s·G + d·Z`
//! - request: blinds `t1..t4`; `α = a + t1·G + t2·y`,
//!   `β = b + t3·G + t4·Z`, `ε = H(α ‖ β ‖ Z ‖ m)`, `e = ε − t2 − t4`
//! - issued: `c = e − d`, `r = u − c·x`
//! - unblind: `ρ = r + t1`, `ω = c + t2`, `σ = s + t3`, `δ = d + t4`
//! - verify: `ω + δ == H(ρ·G + ω·y ‖ σ·G + δ·Z ‖ Z ‖ m)`

use crate::info::encode_block;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use veil_types::error::CryptoError;
use veil_types::protocol::{BlindIssuedMsg, BlindRequestMsg, BlindSetupMsg};

pub mod curves;

pub use curves::{
    point_from_bytes, point_to_bytes, scalar_from_bytes, scalar_to_bytes, BlindCurve, NistP256,
    NistP384, NistP521,
};

use curves::random_scalar;
use elliptic_curve::group::Group;

/// A signer's private key.
#[derive(Clone)]
pub struct SigningKey<C: BlindCurve> {
    x: C::Scalar,
    y: C::Point,
}

impl<C: BlindCurve> SigningKey<C> {
    /// Generates a fresh signing key.
    pub fn random(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        let x = random_scalar::<C>(rng);
        Self {
            x,
            y: C::Point::generator() * x,
        }
    }

    /// Restores a signing key from its canonical scalar bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let x = scalar_from_bytes::<C>(bytes)?;
        Ok(Self {
            x,
            y: C::Point::generator() * x,
        })
    }

    /// The canonical scalar bytes of the private key.
    pub fn to_bytes(&self) -> Vec<u8> {
        scalar_to_bytes::<C>(&self.x)
    }

    /// The matching verification key.
    pub fn verifying_key(&self) -> VerifyingKey<C> {
        VerifyingKey { y: self.y }
    }
}

/// A signer's public key.
#[derive(Clone, Copy)]
pub struct VerifyingKey<C: BlindCurve> {
    y: C::Point,
}

impl<C: BlindCurve> VerifyingKey<C> {
    /// Restores a verification key from compressed point bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            y: point_from_bytes::<C>(bytes)?,
        })
    }

    /// The compressed point bytes of the key.
    pub fn to_bytes(&self) -> Vec<u8> {
        point_to_bytes::<C>(&self.y)
    }
}

impl<C: BlindCurve> PartialEq for VerifyingKey<C> {
    fn eq(&self, other: &Self) -> bool {
        self.y == other.y
    }
}
impl<C: BlindCurve> Eq for VerifyingKey<C> {}

impl<C: BlindCurve> std::fmt::Debug for VerifyingKey<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyingKey")
            .field("y", &point_to_bytes::<C>(&self.y))
            .finish()
    }
}

/// The public info point binding zone and serial into the signature.
#[derive(Clone, Copy)]
pub struct Info<C: BlindCurve> {
    z: C::Point,
}

impl<C: BlindCurve> Info<C> {
    /// Compresses framed info bytes onto the curve.
    pub fn compress(info_bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            z: C::hash_to_point(info_bytes)?,
        })
    }
}

/// An unblinded signature, in canonical scalar bytes.
///
/// Kept as plain bytes so it can be embedded in token data without
/// dragging curve generics through the storage layer.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct SignatureBytes {
    /// Unblinded response scalar `ρ`.
    #[serde(with = "serde_bytes")]
    pub rho: Vec<u8>,
    /// Unblinded challenge share `ω`.
    #[serde(with = "serde_bytes")]
    pub omega: Vec<u8>,
    /// Unblinded response scalar `σ`.
    #[serde(with = "serde_bytes")]
    pub sigma: Vec<u8>,
    /// Unblinded challenge share `δ`.
    #[serde(with = "serde_bytes")]
    pub delta: Vec<u8>,
}

/// Signer-side state of one protocol run. Created by [`Signer::new`],
/// consumed by [`Signer::issue`].
pub struct Signer<C: BlindCurve> {
    x: C::Scalar,
    u: C::Scalar,
    s: C::Scalar,
    d: C::Scalar,
}

impl<C: BlindCurve> Signer<C> {
    /// Starts a protocol run, producing the setup message.
    pub fn new(
        key: &SigningKey<C>,
        info: &Info<C>,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> (Self, BlindSetupMsg) {
        let u = random_scalar::<C>(rng);
        let s = random_scalar::<C>(rng);
        let d = random_scalar::<C>(rng);
        let a = C::Point::generator() * u;
        let b = C::Point::generator() * s + info.z * d;
        (
            Self { x: key.x, u, s, d },
            BlindSetupMsg {
                a: point_to_bytes::<C>(&a),
                b: point_to_bytes::<C>(&b),
            },
        )
    }

    /// Answers the requester's blinded challenge, consuming the run state.
    pub fn issue(self, request: &BlindRequestMsg) -> Result<BlindIssuedMsg, CryptoError> {
        let e = scalar_from_bytes::<C>(&request.e)?;
        let c = e - self.d;
        let r = self.u - c * self.x;
        Ok(BlindIssuedMsg {
            r: scalar_to_bytes::<C>(&r),
            c: scalar_to_bytes::<C>(&c),
            s: scalar_to_bytes::<C>(&self.s),
            d: scalar_to_bytes::<C>(&self.d),
        })
    }
}

/// Requester-side state of one protocol run. Created by
/// [`Requester::new`], consumed by [`Requester::finalize`].
pub struct Requester<C: BlindCurve> {
    y: C::Point,
    z: C::Point,
    msg: Vec<u8>,
    t1: C::Scalar,
    t2: C::Scalar,
    t3: C::Scalar,
    t4: C::Scalar,
}

impl<C: BlindCurve> Requester<C> {
    /// Consumes a setup message, blinding `msg` into a challenge.
    pub fn new(
        key: &VerifyingKey<C>,
        info: &Info<C>,
        msg: Vec<u8>,
        setup: &BlindSetupMsg,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Self, BlindRequestMsg), CryptoError> {
        let a = point_from_bytes::<C>(&setup.a)?;
        let b = point_from_bytes::<C>(&setup.b)?;
        let t1 = random_scalar::<C>(rng);
        let t2 = random_scalar::<C>(rng);
        let t3 = random_scalar::<C>(rng);
        let t4 = random_scalar::<C>(rng);

        let alpha = a + C::Point::generator() * t1 + key.y * t2;
        let beta = b + C::Point::generator() * t3 + info.z * t4;
        let eps = challenge::<C>(&alpha, &beta, &info.z, &msg);
        let e = eps - t2 - t4;

        Ok((
            Self {
                y: key.y,
                z: info.z,
                msg,
                t1,
                t2,
                t3,
                t4,
            },
            BlindRequestMsg {
                e: scalar_to_bytes::<C>(&e),
            },
        ))
    }

    /// Unblinds the issued message into a signature, verifying it against
    /// the signer's key before returning it.
    pub fn finalize(self, issued: &BlindIssuedMsg) -> Result<SignatureBytes, CryptoError> {
        let r = scalar_from_bytes::<C>(&issued.r)?;
        let c = scalar_from_bytes::<C>(&issued.c)?;
        let s = scalar_from_bytes::<C>(&issued.s)?;
        let d = scalar_from_bytes::<C>(&issued.d)?;

        let rho = r + self.t1;
        let omega = c + self.t2;
        let sigma = s + self.t3;
        let delta = d + self.t4;

        let signature = SignatureBytes {
            rho: scalar_to_bytes::<C>(&rho),
            omega: scalar_to_bytes::<C>(&omega),
            sigma: scalar_to_bytes::<C>(&sigma),
            delta: scalar_to_bytes::<C>(&delta),
        };
        verify_with_points::<C>(&self.y, &self.z, &self.msg, &signature)?;
        Ok(signature)
    }
}

/// Verifies an unblinded signature over `msg` under `key` and `info`.
pub fn verify<C: BlindCurve>(
    key: &VerifyingKey<C>,
    info: &Info<C>,
    msg: &[u8],
    signature: &SignatureBytes,
) -> Result<(), CryptoError> {
    verify_with_points::<C>(&key.y, &info.z, msg, signature)
}

fn verify_with_points<C: BlindCurve>(
    y: &C::Point,
    z: &C::Point,
    msg: &[u8],
    signature: &SignatureBytes,
) -> Result<(), CryptoError> {
    let rho = scalar_from_bytes::<C>(&signature.rho)?;
    let omega = scalar_from_bytes::<C>(&signature.omega)?;
    let sigma = scalar_from_bytes::<C>(&signature.sigma)?;
    let delta = scalar_from_bytes::<C>(&signature.delta)?;

    let alpha = C::Point::generator() * rho + *y * omega;
    let beta = C::Point::generator() * sigma + *z * delta;
    let eps = challenge::<C>(&alpha, &beta, z, msg);

    if omega + delta == eps {
        Ok(())
    } else {
        Err(CryptoError::InvalidSignature)
    }
}

/// The challenge transcript: every component is length-framed so no two
/// distinct transcripts can collide byte-wise.
fn challenge<C: BlindCurve>(
    alpha: &C::Point,
    beta: &C::Point,
    z: &C::Point,
    msg: &[u8],
) -> C::Scalar {
    let mut transcript = Vec::new();
    encode_block(&mut transcript, &point_to_bytes::<C>(alpha));
    encode_block(&mut transcript, &point_to_bytes::<C>(beta));
    encode_block(&mut transcript, &point_to_bytes::<C>(z));
    encode_block(&mut transcript, msg);
    C::hash_to_scalar(&transcript)
}
