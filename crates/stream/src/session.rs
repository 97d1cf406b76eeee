//! Connection crypto state and the packet encode/decode state machines.
//!
//! [`SessionCrypto`] is created once per connection from the handshake's
//! secret and iv, then split into two direction halves. Each half owns its
//! counter and cipher engine; neither is shared across connections, and a
//! reconnect must mint fresh key material (counters restart at 0).
//!
//! Both halves are `&mut self` state machines: the counters and keystreams
//! mutate on every call, so the borrow checker is what rules out two
//! packets racing through the same direction.

use subtle::ConstantTimeEq;
use tracing::{trace, warn};
use wireseal_crypto::{packet_tag, Backend, CipherError, Decryptor, Encryptor, Iv, SecretKey, TAG_LEN};

use crate::compress::CompressionAdapter;
use crate::config::SessionConfig;
use crate::error::WireError;

/// Per-connection crypto state.
///
/// Holds the shared secret, both counters, and the two independent cipher
/// engines. Use it directly for lockstep request/response traffic, or
/// [`split`](Self::split) it so each direction can live on its own task.
#[derive(Debug)]
pub struct SessionCrypto {
    encoder: PacketEncoder,
    decoder: PacketDecoder,
}

impl SessionCrypto {
    /// Builds the connection state from the handshake's opaque key
    /// material.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Engine`] if `secret` is not 32 bytes or `iv`
    /// is not 16 bytes.
    pub fn new(secret: &[u8], iv: &[u8], config: SessionConfig) -> Result<Self, WireError> {
        let secret = SecretKey::try_from(secret)?;
        let iv: Iv = iv
            .try_into()
            .map_err(|_| CipherError::InvalidIvLength(iv.len()))?;

        let backend = config.backend.unwrap_or_else(Backend::detect);
        let compression = CompressionAdapter::new(config.compression_level);

        Ok(Self {
            encoder: PacketEncoder {
                cipher: Encryptor::with_backend(backend, &secret, &iv),
                compression,
                secret: secret.clone(),
                counter: 0,
            },
            decoder: PacketDecoder {
                cipher: Decryptor::with_backend(backend, &secret, &iv),
                compression,
                secret,
                counter: 0,
                poisoned: false,
            },
        })
    }

    /// Splits the state into its two independently-driven halves.
    #[must_use]
    pub fn split(self) -> (PacketEncoder, PacketDecoder) {
        (self.encoder, self.decoder)
    }

    /// Seals one outbound packet. See [`PacketEncoder::encode`].
    pub fn encode(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, WireError> {
        self.encoder.encode(plaintext)
    }

    /// Opens one inbound wire unit. See [`PacketDecoder::decode`].
    pub fn decode(&mut self, unit: Vec<u8>) -> Result<Vec<u8>, WireError> {
        self.decoder.decode(unit)
    }
}

/// Send half: owns the send counter and the encrypt-direction engine.
#[derive(Debug)]
pub struct PacketEncoder {
    secret: SecretKey,
    cipher: Encryptor,
    compression: CompressionAdapter,
    counter: u64,
}

impl PacketEncoder {
    /// Seals `plaintext` into a wire unit.
    ///
    /// The pipeline order is load-bearing: compress, tag with the current
    /// send counter, append the tag, encrypt the whole unit on the
    /// continuous keystream, then advance the counter. Units must reach
    /// the transport in the order this method returns them; the peer's
    /// keystream and counter only move forward.
    ///
    /// Compression is the only fallible step and runs before any state is
    /// touched, so a failed call leaves counter and keystream unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Compress`] if the deflate state fails.
    pub fn encode(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, WireError> {
        let mut unit = self.compression.compress(plaintext)?;

        let counter = self.counter;
        let tag = packet_tag(counter, &unit, &self.secret);
        unit.extend_from_slice(&tag);
        self.cipher.apply(&mut unit);
        self.counter += 1;

        trace!(counter, len = unit.len(), "packet sealed");

        Ok(unit)
    }

    /// Number of packets sealed so far (also the next packet's counter).
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.counter
    }
}

/// Receive half: owns the receive counter and the decrypt-direction
/// engine.
#[derive(Debug)]
pub struct PacketDecoder {
    secret: SecretKey,
    cipher: Decryptor,
    compression: CompressionAdapter,
    counter: u64,
    poisoned: bool,
}

impl PacketDecoder {
    /// Opens one wire unit, in arrival order.
    ///
    /// The unit is decrypted on the continuous keystream, the trailing
    /// [`TAG_LEN`] bytes are checked in constant time against the tag
    /// recomputed from the current receive counter, and only a verified
    /// payload is inflated and returned. The counter advances whether or
    /// not verification succeeds, keeping it in lockstep with a
    /// well-behaved peer; a mismatch means this stream can never
    /// resynchronize, so the decoder poisons itself and every later call
    /// fails fast.
    ///
    /// # Errors
    ///
    /// - [`WireError::Desynchronized`] after any earlier integrity
    ///   failure.
    /// - [`WireError::Truncated`] for units shorter than the tag; the
    ///   keystream has already consumed them, so this also poisons.
    /// - [`WireError::Integrity`] on tag mismatch; the payload is
    ///   discarded, never delivered.
    /// - [`WireError::Decode`] if the verified payload does not inflate.
    pub fn decode(&mut self, mut unit: Vec<u8>) -> Result<Vec<u8>, WireError> {
        if self.poisoned {
            return Err(WireError::Desynchronized);
        }

        self.cipher.apply(&mut unit);

        let counter = self.counter;
        self.counter += 1;

        let Some(split) = unit.len().checked_sub(TAG_LEN) else {
            self.poisoned = true;
            warn!(counter, len = unit.len(), "wire unit shorter than its tag");
            return Err(WireError::Truncated { len: unit.len() });
        };

        let (payload, received) = unit.split_at(split);
        let expected = packet_tag(counter, payload, &self.secret);

        if !bool::from(expected[..].ct_eq(received)) {
            self.poisoned = true;
            warn!(counter, "packet integrity check failed");
            return Err(WireError::Integrity { counter });
        }

        trace!(counter, len = payload.len(), "packet verified");

        self.compression.decompress(payload)
    }

    /// Number of wire units consumed so far.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.counter
    }

    /// Whether an integrity failure has permanently desynchronized this
    /// stream.
    #[must_use]
    pub const fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}
