//! Per-packet authentication tag.
//!
//! A packet is bound to its position in the stream by hashing the packet
//! counter, the framed (compressed) payload, and the shared secret:
//!
//! ```text
//! tag = SHA256( LE64(counter) || payload || secret )[0..8]
//! ```
//!
//! The counter never travels on the wire; both peers derive it from call
//! order, which is why delivery below this layer must be reliable and
//! strictly FIFO.

use sha2::{Digest, Sha256};

use crate::{SecretKey, TAG_LEN};

/// Computes the 8-byte tag for a packet.
///
/// Pure and deterministic. `payload` is the compressed packet body before
/// the tag is appended.
#[must_use]
pub fn packet_tag(counter: u64, payload: &[u8], secret: &SecretKey) -> [u8; TAG_LEN] {
    let mut digest = Sha256::new();
    digest.update(counter.to_le_bytes());
    digest.update(payload);
    digest.update(secret.as_bytes());
    let hash = digest.finalize();

    let mut tag = [0_u8; TAG_LEN];
    tag.copy_from_slice(&hash[..TAG_LEN]);
    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(byte: u8) -> SecretKey {
        SecretKey::from_bytes([byte; 32])
    }

    #[test]
    fn tag_is_deterministic() {
        let tag_a = packet_tag(3, b"payload", &secret(0x42));
        let tag_b = packet_tag(3, b"payload", &secret(0x42));

        assert_eq!(tag_a, tag_b);
    }

    #[test]
    fn tag_depends_on_every_input() {
        let base = packet_tag(0, b"payload", &secret(0x42));

        assert_ne!(base, packet_tag(1, b"payload", &secret(0x42)));
        assert_ne!(base, packet_tag(0, b"payloae", &secret(0x42)));
        assert_ne!(base, packet_tag(0, b"payload", &secret(0x43)));
    }

    #[test]
    fn counter_is_hashed_little_endian() {
        let secret = secret(0x42);
        let tag = packet_tag(1, b"payload", &secret);

        let mut digest = Sha256::new();
        digest.update([1, 0, 0, 0, 0, 0, 0, 0]);
        digest.update(b"payload");
        digest.update(secret.as_bytes());

        assert_eq!(tag.as_slice(), &digest.finalize()[..TAG_LEN]);
    }

    #[test]
    fn empty_payload_is_valid() {
        let tag = packet_tag(0, b"", &secret(0x01));
        assert_eq!(tag.len(), TAG_LEN);
    }
}
