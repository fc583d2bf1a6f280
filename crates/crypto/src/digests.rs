// Path: crates/crypto/src/digests.rs
//! Digest algorithms available to hash-preimage zones.

use blake2::digest::consts::U32;
use blake2::Blake2b;
use sha2::{Digest, Sha256};

/// BLAKE2b with a 256-bit digest.
type Blake2b256 = Blake2b<U32>;

/// A digest algorithm a hash-preimage zone can be configured with.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DigestAlg {
    /// BLAKE2b-256, the reference deployment's algorithm.
    Blake2b256,
    /// SHA-256.
    Sha256,
}

impl DigestAlg {
    /// Hashes `data` with this algorithm.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Blake2b256 => Blake2b256::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
        }
    }

    /// The digest size in bytes.
    pub fn size(&self) -> usize {
        32
    }

    /// The canonical algorithm name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blake2b256 => "BLAKE2b-256",
            Self::Sha256 => "SHA-256",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_sizes() {
        for alg in [DigestAlg::Blake2b256, DigestAlg::Sha256] {
            assert_eq!(alg.digest(b"x").len(), alg.size());
        }
    }

    #[test]
    fn algorithms_differ() {
        assert_ne!(
            DigestAlg::Blake2b256.digest(b"input"),
            DigestAlg::Sha256.digest(b"input")
        );
    }
}
