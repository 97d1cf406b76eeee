//! Error taxonomy for the framing layer.

use core::fmt::Display;

use thiserror::Error;
use wireseal_crypto::CipherError;

/// Errors produced while sealing or opening packets.
///
/// Every variant is a connection-level failure: this layer attempts no
/// recovery, and none is silently swallowed. Integrity and truncation
/// faults additionally poison the receive half, because its counter and
/// keystream have advanced past the point of disagreement and cannot
/// resynchronize without fresh key material.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WireError {
    /// A cipher engine was handed malformed key material.
    #[error("cipher engine fault")]
    Engine(#[from] CipherError),

    /// The deflate state failed while compressing an outbound packet.
    #[error("compression failed")]
    Compress(#[from] flate2::CompressError),

    /// An inbound packet's compressed payload is corrupt or truncated.
    #[error("malformed compressed payload: {detail}")]
    Decode {
        /// What the inflate state reported.
        detail: String,
    },

    /// An inbound packet's tag did not match the expected sequence.
    ///
    /// The payload was discarded. The receive counter and keystream have
    /// already advanced, so the decoder is now poisoned.
    #[error("integrity check failed for packet {counter}")]
    Integrity {
        /// Receive counter the packet was verified against.
        counter: u64,
    },

    /// A wire unit was shorter than the authentication tag.
    #[error("wire unit of {len} bytes is shorter than the tag")]
    Truncated {
        /// Length of the offending unit.
        len: usize,
    },

    /// The decoder refused input after an earlier integrity failure.
    #[error("stream is desynchronized; the connection must be renegotiated")]
    Desynchronized,
}

impl WireError {
    pub(crate) fn decode(detail: impl Display) -> Self {
        Self::Decode {
            detail: detail.to_string(),
        }
    }
}
