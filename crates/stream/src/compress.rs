//! Per-packet raw DEFLATE.
//!
//! Every packet compresses to a complete, self-contained headerless
//! deflate stream and inflates the same way, so no packet ever depends on
//! bytes from its neighbours and the compressor never buffers input across
//! packet boundaries into a state the peer cannot drain independently.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::WireError;

/// Default compression level; balances ratio against per-packet latency.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 7;

/// Raw-deflate compressor/decompressor pair.
///
/// Holds only configuration: each call runs a fresh deflate or inflate
/// state, flushed to completion, which is what keeps packets
/// independently decodable.
#[derive(Debug, Clone, Copy)]
pub struct CompressionAdapter {
    level: Compression,
}

impl CompressionAdapter {
    /// Creates an adapter compressing at `level`, clamped to 0-9.
    #[must_use]
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }

    /// Deflates `data` into a self-contained raw stream.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Compress`] if the deflate state fails; this
    /// does not happen for in-memory input but is surfaced rather than
    /// swallowed.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, WireError> {
        let mut deflate = Compress::new(self.level, false);
        let mut out = Vec::with_capacity(data.len() / 2 + 64);

        loop {
            let consumed = deflate.total_in() as usize;
            if out.len() == out.capacity() {
                out.reserve(out.capacity().max(64));
            }

            match deflate.compress_vec(&data[consumed..], &mut out, FlushCompress::Finish)? {
                Status::StreamEnd => return Ok(out),
                Status::Ok | Status::BufError => {}
            }
        }
    }

    /// Inflates one self-contained raw stream produced by
    /// [`CompressionAdapter::compress`].
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Decode`] if the input is corrupt, ends before
    /// the stream does, or carries trailing bytes after it.
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, WireError> {
        let mut inflate = Decompress::new(false);
        let mut out = Vec::with_capacity(data.len().saturating_mul(4).max(64));

        loop {
            let consumed = inflate.total_in() as usize;
            if out.len() == out.capacity() {
                out.reserve(out.capacity().max(64));
            }

            let status = inflate
                .decompress_vec(&data[consumed..], &mut out, FlushDecompress::Finish)
                .map_err(WireError::decode)?;

            match status {
                Status::StreamEnd => {
                    return if inflate.total_in() as usize == data.len() {
                        Ok(out)
                    } else {
                        Err(WireError::decode("trailing bytes after deflate stream"))
                    };
                }
                Status::Ok | Status::BufError => {
                    // Stalled with all input drained and output space to
                    // spare: the stream ends beyond the bytes we were given.
                    if inflate.total_in() as usize == data.len() && out.len() < out.capacity() {
                        return Err(WireError::decode("deflate stream ended prematurely"));
                    }
                }
            }
        }
    }
}

impl Default for CompressionAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}
