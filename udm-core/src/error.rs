//! Error taxonomy (spec.md §7).
//!
//! Mirrors the shape of `apfs_core::block::BlockReadError`: one
//! `thiserror`-derived enum, `#[error("...")]` per variant, `#[from]` for
//! the I/O boundary.

use thiserror::Error;
use udm_types::Type;

/// Every fallible UDM operation returns this error (or a narrower `BlobResult`
/// for [`crate::property::Property::get_blob_data`], which is a routine
/// return value rather than an exceptional path — see spec.md §4.3/§7).
#[derive(Debug, Error)]
pub enum UdmError {
    /// Caller violated a precondition: wrong kind, bad path, struct size
    /// mismatch, and so on.
    #[error("invalid usage: {0}")]
    InvalidUsage(String),

    /// LZ4 compression or decompression failed, or a decompressed size
    /// didn't match the size declared on disk.
    #[error("compression error: {0}")]
    Compression(String),

    /// The underlying source or sink could not be opened, read, or written.
    #[error("I/O error: {0}")]
    File(#[from] std::io::Error),

    /// Binary header identifier/version mismatch, or a required root child
    /// is missing or has the wrong kind.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Lazy `load_property` could not locate or traverse the requested path.
    #[error("failed to load property at path {path:?}: {reason}")]
    PropertyLoad { path: String, reason: String },

    /// An array index was `>= size`.
    #[error("index {index} out of bounds (size {size})")]
    OutOfBounds { index: usize, size: usize },

    /// Internal assertion failure; should be unreachable in correct code.
    #[error("internal error: {0}")]
    Implementation(String),

    /// A value/conversion logic contradiction (e.g. a `Property` somehow
    /// carrying a payload that doesn't match its own kind).
    #[error("logic error: {0}")]
    Logic(String),

    /// The ASCII tokenizer or parser hit an unexpected token.
    #[error("ascii syntax error at {line}:{column}: {message}")]
    AsciiSyntax {
        line: u32,
        column: u32,
        message: String,
    },

    /// The ASCII value parser failed to coerce a token list into the
    /// declared type.
    #[error("ascii data error at {line}:{column}: {message}")]
    AsciiData {
        line: u32,
        column: u32,
        message: String,
    },
}

impl UdmError {
    pub fn type_mismatch(expected: Type, found: Type) -> Self {
        UdmError::InvalidUsage(format!("expected type {expected:?}, found {found:?}"))
    }

    pub fn invalid_usage(msg: impl Into<String>) -> Self {
        UdmError::InvalidUsage(msg.into())
    }

    pub fn logic(msg: impl Into<String>) -> Self {
        UdmError::Logic(msg.into())
    }

    pub fn ascii_syntax(line: u32, column: u32, msg: impl Into<String>) -> Self {
        UdmError::AsciiSyntax {
            line,
            column,
            message: msg.into(),
        }
    }

    pub fn ascii_data(line: u32, column: u32, msg: impl Into<String>) -> Self {
        UdmError::AsciiData {
            line,
            column,
            message: msg.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, UdmError>;

/// Routine return value for [`crate::property::Property::get_blob_data`]
/// (spec.md §4.3). Not folded into [`UdmError`]: callers probe capacity with
/// a null/zero-size buffer as a matter of course, so this is an expected
/// outcome, not an exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobResult {
    Success,
    /// Decompressed size didn't match the caller-declared size.
    DecompressedSizeMismatch,
    /// `out_buf` was too small; `required_size` has been set to the exact
    /// byte count needed.
    InsufficientSize { required_size: usize },
    /// The property holds a kind that isn't a blob-compatible value.
    ValueTypeMismatch,
    /// The property's kind has no byte-view representation at all
    /// (e.g. `Element`).
    NotABlobType,
}
