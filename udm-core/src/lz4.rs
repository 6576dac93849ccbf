//! Thin wrapper around the LZ4 primitive.
//!
//! spec.md §1 treats "the LZ4 codec itself" as an assumed-available
//! primitive and out of scope for this specification. We still need a real
//! implementation to compress/decompress against — `lz4_flex` is a
//! published, pure-Rust LZ4 block codec; nothing here reimplements LZ4
//! itself, it only adapts `lz4_flex`'s block API to UDM's
//! declared-uncompressed-size framing (spec.md §4.6's `array_lz4`/`blob_lz4`
//! bodies both carry the uncompressed size alongside the compressed bytes,
//! so we use the "size prepended" variant of the primitive rather than the
//! frame format).

use crate::error::{Result, UdmError};

pub fn compress(raw: &[u8]) -> Result<Vec<u8>> {
    Ok(lz4_flex::block::compress(raw))
}

pub fn decompress(compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    lz4_flex::block::decompress(compressed, uncompressed_size)
        .map_err(|e| UdmError::Compression(e.to_string()))
}
