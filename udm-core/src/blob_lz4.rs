//! `BlobLz4`: compressed bytes plus the declared uncompressed size
//! (spec.md §3 "Blob vs BlobLz4").

use bytes::Bytes;

use crate::error::{Result, UdmError};
use crate::lz4;

#[derive(Debug, Clone, PartialEq)]
pub struct BlobLz4 {
    compressed: Bytes,
    uncompressed_size: u64,
}

impl BlobLz4 {
    pub fn empty() -> Self {
        BlobLz4 {
            compressed: Bytes::new(),
            uncompressed_size: 0,
        }
    }

    /// Compress `raw` and store the result alongside its declared size.
    pub fn from_raw(raw: &[u8]) -> Result<Self> {
        if raw.is_empty() {
            return Ok(Self::empty());
        }
        let compressed = lz4::compress(raw)?;
        Ok(BlobLz4 {
            compressed: Bytes::from(compressed),
            uncompressed_size: raw.len() as u64,
        })
    }

    /// Construct directly from already-compressed bytes, as read from a
    /// binary file.
    pub fn from_compressed(compressed: Bytes, uncompressed_size: u64) -> Self {
        BlobLz4 {
            compressed,
            uncompressed_size,
        }
    }

    pub fn compressed_bytes(&self) -> &Bytes {
        &self.compressed
    }

    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    /// Decompress, validating the result's length against the declared
    /// uncompressed size (spec.md §7 *Compression*).
    pub fn decompress(&self) -> Result<Vec<u8>> {
        if self.uncompressed_size == 0 {
            return Ok(Vec::new());
        }
        let data = lz4::decompress(&self.compressed, self.uncompressed_size as usize)?;
        if data.len() as u64 != self.uncompressed_size {
            return Err(UdmError::Compression(format!(
                "decompressed {} bytes, expected {}",
                data.len(),
                self.uncompressed_size
            )));
        }
        Ok(data)
    }
}
