//! Binary codec (spec.md §4.6): framed header, typed property read/write,
//! and skip-scan lazy path lookup.

pub mod body;
pub mod primitive;
pub mod reader;
pub mod writer;

/// File magic for the binary form (spec.md §6): ASCII `"UDMB"`.
pub const MAGIC: [u8; 4] = *b"UDMB";

/// Only version ever written; kept explicit so a future format bump has
/// somewhere to branch from.
pub const VERSION: u32 = 1;
