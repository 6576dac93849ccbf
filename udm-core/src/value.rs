//! Opaque math value classes (spec.md §1: "Math types… are treated as
//! opaque value classes with the component counts listed in §3") and the
//! [`Value`] sum type each [`crate::property::Property`] owns exactly one
//! of.

use half::f16;
use udm_types::Type;

macro_rules! vecn {
    ($name:ident, $scalar:ty, $n:expr, [$($field:ident),+]) => {
        #[derive(Debug, Clone, Copy, PartialEq, Default)]
        pub struct $name {
            $(pub $field: $scalar),+
        }

        impl $name {
            pub const COMPONENTS: usize = $n;

            pub fn from_components(c: &[$scalar]) -> Self {
                let mut idx = 0;
                $(
                    let $field = c[idx];
                    idx += 1;
                )+
                let _ = idx;
                Self { $($field),+ }
            }

            pub fn components(&self) -> [$scalar; $n] {
                [$(self.$field),+]
            }
        }
    };
}

vecn!(Vec2, f32, 2, [x, y]);
vecn!(Vec3, f32, 3, [x, y, z]);
vecn!(Vec4, f32, 4, [x, y, z, w]);
vecn!(Vec2i, i32, 2, [x, y]);
vecn!(Vec3i, i32, 3, [x, y, z]);
vecn!(Vec4i, i32, 4, [x, y, z, w]);

/// Euler angles, in-memory as `(pitch, yaw, roll)` — a plain 3-float tuple,
/// distinct from [`Vec3`] only so the conversion matrix (spec.md §4.2) can
/// dispatch `euler -> quat/transform/mat4/mat3x4` on the type, not on usage.
pub type Euler = Vec3;

/// Quaternion. In-memory component order is `(x, y, z, w)`; the ASCII form
/// is `(w, x, y, z)` (spec.md §4.2, §4.7) — `udm-core`'s ASCII reader/writer
/// apply the permutation, this type always stores `(x, y, z, w)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Quat {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

impl Quat {
    /// Build from in-memory order `(x, y, z, w)`.
    pub fn from_xyzw(x: f32, y: f32, z: f32, w: f32) -> Self {
        Quat { x, y, z, w }
    }

    /// Build from ASCII order `(w, x, y, z)`, applying
    /// `translate_quaternion_index` (spec.md §4.2).
    pub fn from_wxyz(w: f32, x: f32, y: f32, z: f32) -> Self {
        Quat { x, y, z, w }
    }

    /// Component order as stored in memory: `(x, y, z, w)`.
    pub fn to_xyzw(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }

    /// Component order as written in ASCII: `(w, x, y, z)`.
    pub fn to_wxyz(self) -> [f32; 4] {
        [self.w, self.x, self.y, self.z]
    }
}

/// 4 x `u8` color, alpha last.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Srgba(pub [u8; 4]);

/// 3 x `u16` HDR color (no alpha channel).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hdr(pub [u16; 3]);

/// Rigid transform: position + rotation (7 floats).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Scaled transform: position + rotation + scale (10 floats).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Stransform {
    fn default() -> Self {
        Stransform {
            position: Vec3::default(),
            rotation: Quat::default(),
            scale: Vec3 {
                x: 1.0,
                y: 1.0,
                z: 1.0,
            },
        }
    }
}

/// Column-major 4x4 matrix (16 floats).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4(pub [f32; 16]);

impl Default for Mat4 {
    fn default() -> Self {
        Mat4([0.0; 16])
    }
}

/// 3x4 matrix (12 floats), used for transforms without a perspective row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3x4(pub [f32; 12]);

impl Default for Mat3x4 {
    fn default() -> Self {
        Mat3x4([0.0; 12])
    }
}

impl Transform {
    pub fn to_mat4(self) -> Mat4 {
        crate::conversion::transform_to_mat4(&self)
    }

    pub fn to_mat3x4(self) -> Mat3x4 {
        crate::conversion::transform_to_mat3x4(&self)
    }
}

impl Stransform {
    pub fn to_mat4(self) -> Mat4 {
        crate::conversion::stransform_to_mat4(&self)
    }

    pub fn to_mat3x4(self) -> Mat3x4 {
        crate::conversion::stransform_to_mat3x4(&self)
    }
}

/// The payload a [`crate::property::Property`] owns. Exactly one variant is
/// ever live at a time; the discriminant IS the property's [`Type`].
///
/// `PartialEq` is implemented by hand rather than derived: spec.md §4.3
/// requires floats to compare bitwise with no epsilon, so every
/// float-bearing variant compares via `to_bits()` instead of `==`.
#[derive(Debug, Clone)]
pub enum Value {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Half(f16),

    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Vec2i(Vec2i),
    Vec3i(Vec3i),
    Vec4i(Vec4i),
    Quat(Quat),
    Euler(Euler),
    Srgba(Srgba),
    Hdr(Hdr),
    Transform(Transform),
    Stransform(Stransform),
    Mat4(Mat4),
    Mat3x4(Mat3x4),
    Nil,

    String(String),
    Utf8(Vec<u8>),
    Blob(bytes::Bytes),
    BlobLz4(crate::blob_lz4::BlobLz4),
    Element(crate::element::Element),
    Array(crate::array::Array),
    ArrayLz4(crate::array_lz4::ArrayLz4),
    Reference(crate::reference::Reference),
    Struct(crate::struct_::Struct),
}

impl Value {
    pub fn kind(&self) -> Type {
        match self {
            Value::I8(_) => Type::I8,
            Value::U8(_) => Type::U8,
            Value::I16(_) => Type::I16,
            Value::U16(_) => Type::U16,
            Value::I32(_) => Type::I32,
            Value::U32(_) => Type::U32,
            Value::I64(_) => Type::I64,
            Value::U64(_) => Type::U64,
            Value::F32(_) => Type::F32,
            Value::F64(_) => Type::F64,
            Value::Bool(_) => Type::Bool,
            Value::Half(_) => Type::Half,
            Value::Vec2(_) => Type::Vec2,
            Value::Vec3(_) => Type::Vec3,
            Value::Vec4(_) => Type::Vec4,
            Value::Vec2i(_) => Type::Vec2i,
            Value::Vec3i(_) => Type::Vec3i,
            Value::Vec4i(_) => Type::Vec4i,
            Value::Quat(_) => Type::Quat,
            Value::Euler(_) => Type::Euler,
            Value::Srgba(_) => Type::Srgba,
            Value::Hdr(_) => Type::Hdr,
            Value::Transform(_) => Type::Transform,
            Value::Stransform(_) => Type::Stransform,
            Value::Mat4(_) => Type::Mat4,
            Value::Mat3x4(_) => Type::Mat3x4,
            Value::Nil => Type::Nil,
            Value::String(_) => Type::String,
            Value::Utf8(_) => Type::Utf8,
            Value::Blob(_) => Type::Blob,
            Value::BlobLz4(_) => Type::BlobLz4,
            Value::Element(_) => Type::Element,
            Value::Array(_) => Type::Array,
            Value::ArrayLz4(_) => Type::ArrayLz4,
            Value::Reference(_) => Type::Reference,
            Value::Struct(_) => Type::Struct,
        }
    }

    /// Default-initialized payload for `kind`. Used by
    /// [`crate::property::Property::create`].
    pub fn default_for(kind: Type) -> Self {
        match kind {
            Type::I8 => Value::I8(0),
            Type::U8 => Value::U8(0),
            Type::I16 => Value::I16(0),
            Type::U16 => Value::U16(0),
            Type::I32 => Value::I32(0),
            Type::U32 => Value::U32(0),
            Type::I64 => Value::I64(0),
            Type::U64 => Value::U64(0),
            Type::F32 => Value::F32(0.0),
            Type::F64 => Value::F64(0.0),
            Type::Bool => Value::Bool(false),
            Type::Half => Value::Half(f16::from_f32(0.0)),
            Type::Vec2 => Value::Vec2(Vec2::default()),
            Type::Vec3 => Value::Vec3(Vec3::default()),
            Type::Vec4 => Value::Vec4(Vec4::default()),
            Type::Vec2i => Value::Vec2i(Vec2i::default()),
            Type::Vec3i => Value::Vec3i(Vec3i::default()),
            Type::Vec4i => Value::Vec4i(Vec4i::default()),
            Type::Quat => Value::Quat(Quat::default()),
            Type::Euler => Value::Euler(Euler::default()),
            Type::Srgba => Value::Srgba(Srgba::default()),
            Type::Hdr => Value::Hdr(Hdr::default()),
            Type::Transform => Value::Transform(Transform::default()),
            Type::Stransform => Value::Stransform(Stransform::default()),
            Type::Mat4 => Value::Mat4(Mat4::default()),
            Type::Mat3x4 => Value::Mat3x4(Mat3x4::default()),
            Type::Nil => Value::Nil,
            Type::String => Value::String(String::new()),
            Type::Utf8 => Value::Utf8(Vec::new()),
            Type::Blob => Value::Blob(bytes::Bytes::new()),
            Type::BlobLz4 => Value::BlobLz4(crate::blob_lz4::BlobLz4::empty()),
            Type::Element => Value::Element(crate::element::Element::new()),
            Type::Array => Value::Array(crate::array::Array::new(Type::Nil)),
            Type::ArrayLz4 => Value::ArrayLz4(crate::array_lz4::ArrayLz4::new(Type::Nil)),
            Type::Reference => Value::Reference(crate::reference::Reference::new(String::new())),
            Type::Struct => Value::Struct(crate::struct_::Struct::empty()),
            Type::Count | Type::Invalid => Value::Nil,
        }
    }
}

fn f32s_bits_eq(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Half(a), Value::Half(b)) => a.to_bits() == b.to_bits(),
            (Value::Vec2(a), Value::Vec2(b)) => f32s_bits_eq(&a.components(), &b.components()),
            (Value::Vec3(a), Value::Vec3(b)) => f32s_bits_eq(&a.components(), &b.components()),
            (Value::Vec4(a), Value::Vec4(b)) => f32s_bits_eq(&a.components(), &b.components()),
            (Value::Vec2i(a), Value::Vec2i(b)) => a.components() == b.components(),
            (Value::Vec3i(a), Value::Vec3i(b)) => a.components() == b.components(),
            (Value::Vec4i(a), Value::Vec4i(b)) => a.components() == b.components(),
            (Value::Quat(a), Value::Quat(b)) => f32s_bits_eq(&a.to_xyzw(), &b.to_xyzw()),
            (Value::Euler(a), Value::Euler(b)) => f32s_bits_eq(&a.components(), &b.components()),
            (Value::Srgba(a), Value::Srgba(b)) => a.0 == b.0,
            (Value::Hdr(a), Value::Hdr(b)) => a.0 == b.0,
            (Value::Transform(a), Value::Transform(b)) => {
                f32s_bits_eq(&a.position.components(), &b.position.components())
                    && f32s_bits_eq(&a.rotation.to_xyzw(), &b.rotation.to_xyzw())
            }
            (Value::Stransform(a), Value::Stransform(b)) => {
                f32s_bits_eq(&a.position.components(), &b.position.components())
                    && f32s_bits_eq(&a.rotation.to_xyzw(), &b.rotation.to_xyzw())
                    && f32s_bits_eq(&a.scale.components(), &b.scale.components())
            }
            (Value::Mat4(a), Value::Mat4(b)) => f32s_bits_eq(&a.0, &b.0),
            (Value::Mat3x4(a), Value::Mat3x4(b)) => f32s_bits_eq(&a.0, &b.0),
            (Value::Nil, Value::Nil) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Utf8(a), Value::Utf8(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            (Value::BlobLz4(a), Value::BlobLz4(b)) => a == b,
            (Value::Element(a), Value::Element(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::ArrayLz4(a), Value::ArrayLz4(b)) => a == b,
            (Value::Reference(a), Value::Reference(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            _ => false,
        }
    }
}
