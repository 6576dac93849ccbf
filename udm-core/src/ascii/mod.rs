//! ASCII codec (spec.md §4.7, C7): a human-readable, self-describing
//! rendering of a document, keyed by the same `Type::ascii_name` table
//! `udm-types` exposes for the binary codec's type tags.

pub mod reader;
pub mod tokenizer;
pub mod writer;

bitflags::bitflags! {
    /// Flags accepted by [`writer::write_document`] (spec.md §6).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AsciiWriterFlags: u32 {
        /// Emit the root's `assetType`/`assetVersion`/`assetData` wrapper
        /// explicitly, rather than writing `assetData`'s children flat at
        /// the top level.
        const INCLUDE_HEADER = 1 << 0;
        /// Downgrade every `ArrayLz4` to the plain `Array` ascii form (omit
        /// the `;lz4` array-header marker; spec.md §4.7).
        const DONT_COMPRESS_LZ4_ARRAYS = 1 << 1;
    }
}
