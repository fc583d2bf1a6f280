// Path: crates/crypto/src/info.rs

//! Length-prefixed framing of the public info bound into blind signatures.
//!
//! The info input commits the signer and the requester to the same public
//! metadata: the zone name, and the batch serial when serials are in use.
//! Both roles build the byte string with the functions here, so the
//! framing agrees bit-for-bit by construction. The framed bytes are then
//! compressed onto the curve by [`crate::pblind::Info::compress`].

/// Appends a length-prefixed block: u16 big-endian length, then the bytes.
pub fn encode_block(out: &mut Vec<u8>, block: &[u8]) {
    debug_assert!(block.len() <= u16::MAX as usize);
    out.extend_from_slice(&(block.len() as u16).to_be_bytes());
    out.extend_from_slice(block);
}

/// Appends a fixed-width big-endian integer.
pub fn encode_int(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// Builds the info bytes for a zone and an optional serial.
pub fn token_info_bytes(zone: &str, serial: Option<u64>) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + zone.len() + 8);
    encode_block(&mut out, zone.as_bytes());
    if let Some(serial) = serial {
        encode_int(&mut out, serial);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_layout() {
        let bytes = token_info_bytes("pblind1", Some(3));
        assert_eq!(&bytes[..2], &[0x00, 0x07]);
        assert_eq!(&bytes[2..9], b"pblind1");
        assert_eq!(&bytes[9..], &[0, 0, 0, 0, 0, 0, 0, 3]);
    }

    #[test]
    fn serial_changes_info() {
        assert_ne!(
            token_info_bytes("z", Some(1)),
            token_info_bytes("z", Some(2))
        );
        assert_ne!(token_info_bytes("z", None), token_info_bytes("z", Some(0)));
    }
}
