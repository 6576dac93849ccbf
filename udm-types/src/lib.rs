//! Type tag enumeration and pure categorization helpers for the Universal
//! Data Model (UDM).
//!
//! This crate only knows about the *kind* a UDM value carries — the single
//! byte that identifies it on disk and the handful of pure functions that
//! classify and measure it. It owns no tree structures and no codecs; those
//! live in `udm-core`, which depends on this crate the way `apfs-core`
//! depends on `apfs-types`.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

/// Error returned by [`Type::size_of`] and [`Type::size_of_base`] for kinds
/// that have no fixed, context-free byte size.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("type {0:?} has no fixed size")]
pub struct NoFixedSize(pub Type);

/// One of UDM's 33+ value kinds.
///
/// Discriminants are the on-disk tag byte (spec.md §4.6). [`Type::Invalid`]
/// is pinned to `0xFF` per spec.md §6; everything else is assigned in
/// declaration order starting at zero. [`Type::Count`] is a sentinel used to
/// size tag-indexed tables, never written to disk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, IntoPrimitive, TryFromPrimitive,
)]
#[repr(u8)]
pub enum Type {
    // --- Numeric (12) ---
    I8 = 0,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Bool,
    Half,

    // --- Fixed-size generic ---
    Vec2,
    Vec3,
    Vec4,
    Vec2i,
    Vec3i,
    Vec4i,
    Quat,
    Euler,
    Srgba,
    Hdr,
    Transform,
    Stransform,
    Mat4,
    Mat3x4,
    Nil,

    // --- Non-trivial (9) ---
    String,
    Utf8,
    Blob,
    BlobLz4,
    Element,
    Array,
    ArrayLz4,
    Reference,
    Struct,

    /// Sentinel: number of real kinds. Never serialized.
    Count,

    /// Sentinel: absence of a valid kind. Pinned to `0xFF` on disk.
    Invalid = 0xFF,
}

impl Type {
    /// All real (non-sentinel) kinds, in declaration order.
    pub const ALL: &'static [Type] = &[
        Type::I8,
        Type::U8,
        Type::I16,
        Type::U16,
        Type::I32,
        Type::U32,
        Type::I64,
        Type::U64,
        Type::F32,
        Type::F64,
        Type::Bool,
        Type::Half,
        Type::Vec2,
        Type::Vec3,
        Type::Vec4,
        Type::Vec2i,
        Type::Vec3i,
        Type::Vec4i,
        Type::Quat,
        Type::Euler,
        Type::Srgba,
        Type::Hdr,
        Type::Transform,
        Type::Stransform,
        Type::Mat4,
        Type::Mat3x4,
        Type::Nil,
        Type::String,
        Type::Utf8,
        Type::Blob,
        Type::BlobLz4,
        Type::Element,
        Type::Array,
        Type::ArrayLz4,
        Type::Reference,
        Type::Struct,
    ];

    /// True for the 12 plain numeric scalar kinds.
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Type::I8
                | Type::U8
                | Type::I16
                | Type::U16
                | Type::I32
                | Type::U32
                | Type::I64
                | Type::U64
                | Type::F32
                | Type::F64
                | Type::Bool
                | Type::Half
        )
    }

    /// True for fixed-size composite (vector/matrix/quat/transform/color)
    /// kinds, including `nil`.
    pub const fn is_generic(self) -> bool {
        matches!(
            self,
            Type::Vec2
                | Type::Vec3
                | Type::Vec4
                | Type::Vec2i
                | Type::Vec3i
                | Type::Vec4i
                | Type::Quat
                | Type::Euler
                | Type::Srgba
                | Type::Hdr
                | Type::Transform
                | Type::Stransform
                | Type::Mat4
                | Type::Mat3x4
                | Type::Nil
        )
    }

    /// True for the 9 kinds whose construction/destruction is non-trivial
    /// (own heap storage or a back-reference).
    pub const fn is_non_trivial(self) -> bool {
        matches!(
            self,
            Type::String
                | Type::Utf8
                | Type::Blob
                | Type::BlobLz4
                | Type::Element
                | Type::Array
                | Type::ArrayLz4
                | Type::Reference
                | Type::Struct
        )
    }

    /// `!is_non_trivial`.
    pub const fn is_trivial(self) -> bool {
        !self.is_non_trivial()
    }

    /// True for the two array kinds (`Array`, `ArrayLz4`).
    pub const fn is_array(self) -> bool {
        matches!(self, Type::Array | Type::ArrayLz4)
    }

    /// Byte size of one value of `self`, independent of any instance.
    ///
    /// Undefined (returns [`NoFixedSize`]) for `element`, `array`,
    /// `array_lz4`, `string`, `utf8`, `blob`, `blob_lz4`, `reference`,
    /// `struct` — those kinds either have variable length or their size
    /// depends on instance data (a `StructDescription`).
    pub const fn size_of(self) -> Result<usize, NoFixedSize> {
        Ok(match self {
            Type::I8 | Type::U8 | Type::Bool => 1,
            Type::I16 | Type::U16 | Type::Half => 2,
            Type::I32 | Type::U32 | Type::F32 => 4,
            Type::I64 | Type::U64 | Type::F64 => 8,
            Type::Vec2 => 8,
            Type::Vec3 => 12,
            Type::Vec4 => 16,
            Type::Vec2i => 8,
            Type::Vec3i => 12,
            Type::Vec4i => 16,
            Type::Quat => 16,
            Type::Euler => 12,
            Type::Srgba => 4,
            Type::Hdr => 6,
            Type::Transform => 28,
            Type::Stransform => 40,
            Type::Mat4 => 64,
            Type::Mat3x4 => 48,
            Type::Nil => 0,
            _ => return Err(NoFixedSize(self)),
        })
    }

    /// Size of the storage cell used by a trivial [`Array`](https://docs.rs/udm-core)
    /// of this value type — i.e. the stride between consecutive elements.
    /// Defined exactly where [`Type::size_of`] is defined.
    pub const fn size_of_base(self) -> Result<usize, NoFixedSize> {
        self.size_of()
    }

    /// Number of scalar components making up one value, used by the ASCII
    /// codec's bracketed-list parser/writer. `0` for kinds with no scalar
    /// decomposition (`nil` and all non-trivial kinds).
    pub const fn num_components(self) -> usize {
        match self {
            Type::I8
            | Type::U8
            | Type::I16
            | Type::U16
            | Type::I32
            | Type::U32
            | Type::I64
            | Type::U64
            | Type::F32
            | Type::F64
            | Type::Bool
            | Type::Half => 1,
            Type::Vec2 | Type::Vec2i => 2,
            Type::Vec3 | Type::Vec3i | Type::Euler | Type::Hdr => 3,
            Type::Vec4 | Type::Vec4i | Type::Quat | Type::Srgba => 4,
            Type::Transform => 7,
            Type::Stransform => 10,
            Type::Mat3x4 => 12,
            Type::Mat4 => 16,
            _ => 0,
        }
    }

    /// The ASCII type-name token for this kind, matching `enum_type_to_ascii`
    /// (spec.md §6) exactly. [`Type::ArrayLz4`] shares `"array"` with
    /// [`Type::Array`] — see DESIGN.md for why no distinct ASCII keyword is
    /// minted for the compressed array kind.
    pub const fn ascii_name(self) -> &'static str {
        match self {
            Type::Nil => "nil",
            Type::String => "string",
            Type::Utf8 => "utf8",
            Type::I8 => "int8",
            Type::U8 => "uint8",
            Type::I16 => "int16",
            Type::U16 => "uint16",
            Type::I32 => "int32",
            Type::U32 => "uint32",
            Type::I64 => "int64",
            Type::U64 => "uint64",
            Type::F32 => "float",
            Type::F64 => "double",
            Type::Bool => "bool",
            Type::Half => "half",
            Type::Vec2 => "vec2",
            Type::Vec3 => "vec3",
            Type::Vec4 => "vec4",
            Type::Vec2i => "vec2i",
            Type::Vec3i => "vec3i",
            Type::Vec4i => "vec4i",
            Type::Quat => "quat",
            Type::Euler => "ang",
            Type::Srgba => "srgba",
            Type::Hdr => "hdr",
            Type::Transform => "transform",
            Type::Stransform => "stransform",
            Type::Mat4 => "mat4",
            Type::Mat3x4 => "mat3x4",
            Type::Blob => "blob",
            Type::BlobLz4 => "lz4",
            Type::Array => "array",
            Type::ArrayLz4 => "array",
            Type::Element => "element",
            Type::Reference => "ref",
            Type::Struct => "struct",
            Type::Count | Type::Invalid => "invalid",
        }
    }

    /// Parse an ASCII type-name token back into a [`Type`]. Since
    /// `array_lz4` shares `"array"` with `array`, this always resolves
    /// `"array"` to [`Type::Array`]; callers that need to distinguish the
    /// compressed form read the explicit `;lz4` marker in the array header
    /// instead (see `udm-core`'s ASCII array grammar).
    pub fn from_ascii_name(name: &str) -> Option<Type> {
        Some(match name {
            "nil" => Type::Nil,
            "string" => Type::String,
            "utf8" => Type::Utf8,
            "int8" => Type::I8,
            "uint8" => Type::U8,
            "int16" => Type::I16,
            "uint16" => Type::U16,
            "int32" => Type::I32,
            "uint32" => Type::U32,
            "int64" => Type::I64,
            "uint64" => Type::U64,
            "float" => Type::F32,
            "double" => Type::F64,
            "bool" => Type::Bool,
            "half" => Type::Half,
            "vec2" => Type::Vec2,
            "vec3" => Type::Vec3,
            "vec4" => Type::Vec4,
            "vec2i" => Type::Vec2i,
            "vec3i" => Type::Vec3i,
            "vec4i" => Type::Vec4i,
            "quat" => Type::Quat,
            "ang" => Type::Euler,
            "srgba" => Type::Srgba,
            "hdr" => Type::Hdr,
            "transform" => Type::Transform,
            "stransform" => Type::Stransform,
            "mat4" => Type::Mat4,
            "mat3x4" => Type::Mat3x4,
            "blob" => Type::Blob,
            "lz4" => Type::BlobLz4,
            "array" => Type::Array,
            "element" => Type::Element,
            "ref" => Type::Reference,
            "struct" => Type::Struct,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorization_is_total_and_exclusive() {
        for &t in Type::ALL {
            let numeric = t.is_numeric();
            let generic = t.is_generic();
            let non_trivial = t.is_non_trivial();
            // Every real kind falls into exactly one of the three buckets.
            assert_eq!(
                [numeric, generic, non_trivial].iter().filter(|b| **b).count(),
                1,
                "{t:?} should be in exactly one category"
            );
            assert_eq!(t.is_trivial(), !non_trivial);
        }
    }

    #[test]
    fn size_of_undefined_for_non_trivial_and_array_like() {
        for t in [
            Type::Element,
            Type::Array,
            Type::ArrayLz4,
            Type::String,
            Type::Utf8,
            Type::Blob,
            Type::BlobLz4,
            Type::Reference,
            Type::Struct,
        ] {
            assert!(t.size_of().is_err());
        }
    }

    #[test]
    fn size_of_known_fixed_kinds() {
        assert_eq!(Type::I32.size_of().unwrap(), 4);
        assert_eq!(Type::Quat.size_of().unwrap(), 16);
        assert_eq!(Type::Transform.size_of().unwrap(), 28);
        assert_eq!(Type::Stransform.size_of().unwrap(), 40);
        assert_eq!(Type::Mat4.size_of().unwrap(), 64);
        assert_eq!(Type::Mat3x4.size_of().unwrap(), 48);
        assert_eq!(Type::Srgba.size_of().unwrap(), 4);
        assert_eq!(Type::Hdr.size_of().unwrap(), 6);
        assert_eq!(Type::Nil.size_of().unwrap(), 0);
    }

    #[test]
    fn num_components_matches_table() {
        assert_eq!(Type::Vec3.num_components(), 3);
        assert_eq!(Type::Quat.num_components(), 4);
        assert_eq!(Type::Transform.num_components(), 7);
        assert_eq!(Type::Stransform.num_components(), 10);
        assert_eq!(Type::Mat3x4.num_components(), 12);
        assert_eq!(Type::Mat4.num_components(), 16);
        assert_eq!(Type::Element.num_components(), 0);
    }

    #[test]
    fn ascii_name_round_trips() {
        for &t in Type::ALL {
            if t == Type::ArrayLz4 {
                // Shares "array" with Type::Array by design; not a bijection.
                continue;
            }
            let name = t.ascii_name();
            assert_eq!(Type::from_ascii_name(name), Some(t), "{t:?} -> {name}");
        }
    }

    #[test]
    fn invalid_is_pinned_to_0xff() {
        assert_eq!(u8::from(Type::Invalid), 0xFF);
    }

    #[test]
    fn tag_byte_round_trips_through_try_from() {
        for &t in Type::ALL {
            let byte: u8 = t.into();
            assert_eq!(Type::try_from(byte).unwrap(), t);
        }
    }
}
