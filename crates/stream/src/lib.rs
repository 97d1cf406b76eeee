//! Encrypted, compressed packet framing for a persistent connection.
//!
//! Turns plaintext payloads into wire units of the form
//!
//! ```text
//! encrypt( deflate_raw(plaintext) || tag )
//! ```
//!
//! where `tag` authenticates the packet's position in the stream (see
//! [`wireseal_crypto::packet_tag`]) and `encrypt` is a continuous
//! AES-256-CFB8 keystream per direction. Both peers derive the per-packet
//! counter from call order alone (no nonce travels on the wire), so the
//! transport below must deliver wire units reliably, in order, exactly
//! once. Violations surface as [`WireError::Integrity`] faults and
//! permanently poison the receive half.
//!
//! # Usage
//!
//! ```rust
//! use wireseal_stream::{SessionConfig, SessionCrypto};
//!
//! # fn main() -> Result<(), wireseal_stream::WireError> {
//! let secret = [7_u8; 32];
//! let iv = [9_u8; 16];
//!
//! // Mirror of the state the peer builds from the same handshake.
//! let mut sender = SessionCrypto::new(&secret, &iv, SessionConfig::default())?;
//! let mut receiver = SessionCrypto::new(&secret, &iv, SessionConfig::default())?;
//!
//! let unit = sender.encode(b"hello")?;
//! assert_eq!(receiver.decode(unit)?, b"hello".to_vec());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod compress;
mod config;
pub mod error;
pub mod pipeline;
mod session;

pub use config::SessionConfig;
pub use error::WireError;
pub use session::{PacketDecoder, PacketEncoder, SessionCrypto};
