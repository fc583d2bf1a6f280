// Path: crates/crypto/src/pblind/curves.rs

//! Curve backends for the partially-blind signature protocol.
//!
//! The protocol itself is generic over [`BlindCurve`]; the trait is
//! implemented once per supported NIST curve on top of the RustCrypto
//! arithmetic. Info compression is try-and-increment: the framed info
//! bytes are expanded to an x-coordinate candidate and retried with an
//! incremented counter until the candidate decompresses to a valid,
//! non-identity point. Both protocol roles link this module, so the
//! mapping agrees bit-for-bit on both sides.

use elliptic_curve::group::{Group, GroupEncoding};
use elliptic_curve::{Field, PrimeField};
use veil_types::error::CryptoError;

/// A curve usable by the partially-blind signature protocol.
pub trait BlindCurve: Copy + Clone + PartialEq + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// The canonical curve name, e.g. `P-256`.
    const NAME: &'static str;

    /// The scalar field.
    type Scalar: PrimeField + Send + Sync;

    /// The curve group.
    type Point: Group<Scalar = Self::Scalar> + GroupEncoding + Copy + Send + Sync;

    /// Reduces a transcript onto the scalar field.
    fn hash_to_scalar(data: &[u8]) -> Self::Scalar;

    /// Maps framed info bytes onto a curve point.
    fn hash_to_point(info: &[u8]) -> Result<Self::Point, CryptoError>;
}

/// Encodes a point in its compressed form.
pub fn point_to_bytes<C: BlindCurve>(p: &C::Point) -> Vec<u8> {
    p.to_bytes().as_ref().to_vec()
}

/// Decodes a compressed point, rejecting wrong lengths and off-curve data.
pub fn point_from_bytes<C: BlindCurve>(bytes: &[u8]) -> Result<C::Point, CryptoError> {
    let mut repr = <C::Point as GroupEncoding>::Repr::default();
    if bytes.len() != repr.as_ref().len() {
        return Err(CryptoError::InvalidPoint);
    }
    repr.as_mut().copy_from_slice(bytes);
    Option::<C::Point>::from(C::Point::from_bytes(&repr)).ok_or(CryptoError::InvalidPoint)
}

/// Encodes a scalar in its canonical field representation.
pub fn scalar_to_bytes<C: BlindCurve>(s: &C::Scalar) -> Vec<u8> {
    s.to_repr().as_ref().to_vec()
}

/// Decodes a canonical scalar, rejecting wrong lengths and out-of-range
/// values.
pub fn scalar_from_bytes<C: BlindCurve>(bytes: &[u8]) -> Result<C::Scalar, CryptoError> {
    let mut repr = <C::Scalar as PrimeField>::Repr::default();
    if bytes.len() != repr.as_ref().len() {
        return Err(CryptoError::InvalidScalar);
    }
    repr.as_mut().copy_from_slice(bytes);
    Option::<C::Scalar>::from(C::Scalar::from_repr(repr)).ok_or(CryptoError::InvalidScalar)
}

macro_rules! impl_blind_curve {
    ($marker:ident, $name:literal, $krate:ident, $uint:ty, $digest:ty, $field_size:expr, $top_mask:expr) => {
        /// Marker type selecting this curve as the protocol backend.
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        pub struct $marker;

        impl BlindCurve for $marker {
            const NAME: &'static str = $name;
            type Scalar = $krate::Scalar;
            type Point = $krate::ProjectivePoint;

            fn hash_to_scalar(data: &[u8]) -> Self::Scalar {
                use elliptic_curve::ops::Reduce;
                use sha2::Digest;
                let digest = <$digest>::digest(data);
                let mut fb = $krate::FieldBytes::default();
                let fb_len = fb.as_slice().len();
                let take = digest.len().min(fb_len);
                fb.as_mut_slice()[fb_len - take..]
                    .copy_from_slice(&digest[digest.len() - take..]);
                <$krate::Scalar as Reduce<$uint>>::reduce_bytes(&fb)
            }

            fn hash_to_point(info: &[u8]) -> Result<Self::Point, CryptoError> {
                use sha2::Digest;
                for ctr in 0u8..=255 {
                    // Expand the info bytes to a field-sized x candidate.
                    let mut x = Vec::with_capacity($field_size);
                    let mut block = 0u8;
                    while x.len() < $field_size {
                        let mut h = <$digest>::new();
                        h.update([ctr, block]);
                        h.update(info);
                        x.extend_from_slice(&h.finalize());
                        block = block.wrapping_add(1);
                    }
                    x.truncate($field_size);
                    // Keep the candidate below the field prime.
                    x[0] &= $top_mask;

                    let mut repr =
                        <Self::Point as GroupEncoding>::Repr::default();
                    let repr_bytes: &mut [u8] = repr.as_mut();
                    repr_bytes[0] = 0x02 | (ctr & 1);
                    repr_bytes[1..].copy_from_slice(&x);

                    if let Some(p) =
                        Option::<Self::Point>::from(Self::Point::from_bytes(&repr))
                    {
                        if !bool::from(p.is_identity()) {
                            return Ok(p);
                        }
                    }
                }
                Err(CryptoError::InfoCompression)
            }
        }
    };
}

impl_blind_curve!(
    NistP256,
    "P-256",
    p256,
    elliptic_curve::bigint::U256,
    sha2::Sha256,
    32,
    0xff
);
impl_blind_curve!(
    NistP384,
    "P-384",
    p384,
    elliptic_curve::bigint::U384,
    sha2::Sha384,
    48,
    0xff
);
impl_blind_curve!(
    NistP521,
    "P-521",
    p521,
    elliptic_curve::bigint::U576,
    sha2::Sha512,
    66,
    0x01
);

/// Draws a uniformly random non-zero scalar.
pub fn random_scalar<C: BlindCurve>(rng: &mut (impl rand::RngCore + rand::CryptoRng)) -> C::Scalar {
    loop {
        let s = C::Scalar::random(&mut *rng);
        if !bool::from(s.is_zero()) {
            return s;
        }
    }
}
