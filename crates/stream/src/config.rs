//! Session configuration.

use wireseal_crypto::Backend;

use crate::compress::DEFAULT_COMPRESSION_LEVEL;

/// Tunables for one connection's framing layer.
///
/// Nothing here is negotiated with the peer: deflate output is
/// level-agnostic to inflate, and the cipher backends are byte-identical,
/// so peers may configure these independently.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Deflate level for outbound packets (0-9).
    pub compression_level: u32,
    /// Cipher backend override; `None` probes the CPU.
    pub backend: Option<Backend>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            backend: None,
        }
    }
}
