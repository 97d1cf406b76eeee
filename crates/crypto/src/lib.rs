//! Packet-level cryptography for wireseal connections.
//!
//! Two primitives the framing layer builds on:
//!
//! - [`checksum`]: the truncated SHA-256 tag binding a packet to its
//!   position in the stream.
//! - [`cipher`]: stateful AES-256-CFB8 engines, one per direction, with an
//!   accelerated and a portable backend producing identical output.
//!
//! Key material is supplied once per connection by the handshake layer and
//! never renegotiated here.

use core::fmt;

use thiserror::Error;
use zeroize::Zeroize;

pub mod checksum;
pub mod cipher;

pub use checksum::packet_tag;
pub use cipher::{Backend, Decryptor, Encryptor};

/// Length of the shared connection secret in bytes.
pub const SECRET_LEN: usize = 32;

/// Length of the cipher initialization vector in bytes.
pub const IV_LEN: usize = 16;

/// Length of the packet authentication tag in bytes.
pub const TAG_LEN: usize = 8;

/// Cipher initialization vector, supplied by the handshake layer.
pub type Iv = [u8; IV_LEN];

/// Error type for cipher engine construction failures.
///
/// These are programming or handshake-contract errors, not recoverable
/// runtime conditions; the surrounding connection must be aborted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CipherError {
    /// The shared secret is not [`SECRET_LEN`] bytes.
    #[error("invalid key length: expected {SECRET_LEN}, got {0}")]
    InvalidKeyLength(usize),

    /// The initialization vector is not [`IV_LEN`] bytes.
    #[error("invalid iv length: expected {IV_LEN}, got {0}")]
    InvalidIvLength(usize),
}

/// Shared connection secret.
///
/// Zeroized on drop; the `Debug` impl does not reveal the key bytes.
#[derive(Clone)]
pub struct SecretKey([u8; SECRET_LEN]);

impl SecretKey {
    /// Wraps an already-sized secret.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrows the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for SecretKey {
    type Error = CipherError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes = bytes
            .try_into()
            .map_err(|_| CipherError::InvalidKeyLength(bytes.len()))?;

        Ok(Self(bytes))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_key_accepts_exactly_32_bytes() -> eyre::Result<()> {
        let key = SecretKey::try_from([0x11_u8; 32].as_slice())?;
        assert_eq!(key.as_bytes(), &[0x11; 32]);

        Ok(())
    }

    #[test]
    fn secret_key_rejects_other_lengths() {
        for len in [0_usize, 16, 31, 33, 64] {
            let bytes = vec![0_u8; len];
            let result = SecretKey::try_from(bytes.as_slice());
            assert!(matches!(result, Err(CipherError::InvalidKeyLength(l)) if l == len));
        }
    }

    #[test]
    fn secret_key_debug_is_redacted() {
        let key = SecretKey::from_bytes([0xab; 32]);
        assert_eq!(format!("{key:?}"), "SecretKey(..)");
    }
}
