//! Property (spec.md §3, §4.3): exclusive owner of a single typed value.

use udm_types::Type;

use crate::array::Array;
use crate::array_lz4::ArrayLz4;
use crate::conversion;
use crate::element::Element;
use crate::error::{BlobResult, Result, UdmError};
use crate::reference::Reference;
use crate::struct_::Struct;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Property {
    value: Value,
}

impl Property {
    /// `create(kind)`: allocate and default-initialize payload.
    pub fn create(kind: Type) -> Self {
        Property {
            value: Value::default_for(kind),
        }
    }

    /// `create(value)`: infer kind from value type.
    pub fn new(value: Value) -> Self {
        Property { value }
    }

    pub fn kind(&self) -> Type {
        self.value.kind()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// `assign(value)`: overwrite in place if the kind matches; otherwise
    /// convert via the conversion matrix (spec.md §4.3). Reshaping an
    /// Element/Array-typed Property from a sequence/map literal is handled
    /// one level up, by [`crate::wrapper`] and [`Element::add`], which are
    /// the only callers that know the target shape ahead of time.
    pub fn assign(&mut self, value: Value) -> Result<()> {
        if value.kind() == self.kind() {
            self.value = value;
            return Ok(());
        }
        self.value = conversion::convert(&value, self.kind())?;
        Ok(())
    }

    /// `get<T>`: borrow the value, failing on kind mismatch. Exposed as
    /// narrow typed getters rather than a generic `get::<T>()` — Rust has no
    /// `TypeMismatch`-raising generic downcast as clean as the original's
    /// templated accessor, so each variant gets its own method via the
    /// `as_*` family below instead of one `get<T>`.
    pub fn as_i32(&self) -> Result<i32> {
        match &self.value {
            Value::I32(v) => Ok(*v),
            _ => Err(UdmError::type_mismatch(Type::I32, self.kind())),
        }
    }

    pub fn as_string(&self) -> Result<&str> {
        match &self.value {
            Value::String(v) => Ok(v.as_str()),
            _ => Err(UdmError::type_mismatch(Type::String, self.kind())),
        }
    }

    pub fn as_element(&self) -> Result<&Element> {
        match &self.value {
            Value::Element(e) => Ok(e),
            _ => Err(UdmError::type_mismatch(Type::Element, self.kind())),
        }
    }

    pub fn as_element_mut(&mut self) -> Result<&mut Element> {
        match &mut self.value {
            Value::Element(e) => Ok(e),
            _ => Err(UdmError::type_mismatch(Type::Element, self.kind())),
        }
    }

    pub fn as_array(&self) -> Result<&Array> {
        match &self.value {
            Value::Array(a) => Ok(a),
            _ => Err(UdmError::type_mismatch(Type::Array, self.kind())),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Array> {
        match &mut self.value {
            Value::Array(a) => Ok(a),
            _ => Err(UdmError::type_mismatch(Type::Array, self.kind())),
        }
    }

    pub fn as_array_lz4(&self) -> Result<&ArrayLz4> {
        match &self.value {
            Value::ArrayLz4(a) => Ok(a),
            _ => Err(UdmError::type_mismatch(Type::ArrayLz4, self.kind())),
        }
    }

    pub fn as_array_lz4_mut(&mut self) -> Result<&mut ArrayLz4> {
        match &mut self.value {
            Value::ArrayLz4(a) => Ok(a),
            _ => Err(UdmError::type_mismatch(Type::ArrayLz4, self.kind())),
        }
    }

    pub fn as_struct(&self) -> Result<&Struct> {
        match &self.value {
            Value::Struct(s) => Ok(s),
            _ => Err(UdmError::type_mismatch(Type::Struct, self.kind())),
        }
    }

    pub fn as_reference(&self) -> Result<&Reference> {
        match &self.value {
            Value::Reference(r) => Ok(r),
            _ => Err(UdmError::type_mismatch(Type::Reference, self.kind())),
        }
    }

    pub fn as_reference_mut(&mut self) -> Result<&mut Reference> {
        match &mut self.value {
            Value::Reference(r) => Ok(r),
            _ => Err(UdmError::type_mismatch(Type::Reference, self.kind())),
        }
    }

    /// `to_value<T>`: attempt conversion via the conversion matrix, absent
    /// on unconvertible pairs.
    pub fn to_i32(&self) -> Option<i32> {
        conversion::convert(&self.value, Type::I32)
            .ok()
            .map(|v| match v {
                Value::I32(v) => v,
                _ => unreachable!(),
            })
    }

    pub fn to_f32(&self) -> Option<f32> {
        conversion::convert(&self.value, Type::F32).ok().map(|v| match v {
            Value::F32(v) => v,
            _ => unreachable!(),
        })
    }

    pub fn to_string_value(&self) -> Option<String> {
        conversion::convert(&self.value, Type::String)
            .ok()
            .map(|v| match v {
                Value::String(v) => v,
                _ => unreachable!(),
            })
    }

    pub fn to_value(&self, target: Type) -> Option<Value> {
        conversion::convert(&self.value, target).ok()
    }

    /// `get_blob_data` (spec.md §4.3): byte view for Blob/BlobLz4, or a
    /// trivial Array's raw storage. `out_buf` is filled up to its capacity;
    /// the exact required size is always reported.
    pub fn get_blob_data(&self, out_buf: &mut [u8]) -> (BlobResult, usize) {
        let bytes: Vec<u8> = match &self.value {
            Value::Blob(b) => b.to_vec(),
            Value::BlobLz4(b) => match b.decompress() {
                Ok(data) => {
                    if data.len() as u64 != b.uncompressed_size() {
                        return (BlobResult::DecompressedSizeMismatch, 0);
                    }
                    data
                }
                Err(_) => return (BlobResult::DecompressedSizeMismatch, 0),
            },
            Value::Array(a) => match a.trivial_bytes() {
                Some(bytes) => bytes.to_vec(),
                None => return (BlobResult::ValueTypeMismatch, 0),
            },
            Value::Element(_) | Value::ArrayLz4(_) | Value::Struct(_) | Value::Reference(_) => {
                return (BlobResult::NotABlobType, 0)
            }
            _ => return (BlobResult::ValueTypeMismatch, 0),
        };

        if out_buf.len() < bytes.len() {
            return (
                BlobResult::InsufficientSize {
                    required_size: bytes.len(),
                },
                bytes.len(),
            );
        }
        out_buf[..bytes.len()].copy_from_slice(&bytes);
        (BlobResult::Success, bytes.len())
    }
}

/// Runtime-kind-to-static-type dispatch over the 12 numeric kinds (spec.md
/// §4.1 C1). One method per concrete Rust type, the same shape `serde`'s
/// `Serializer` trait uses to turn a runtime value into a statically typed
/// callback — the idiomatic stand-in for the original's `visit(kind, f)`
/// template.
pub trait NumericVisitor {
    type Output;
    fn visit_i8(self, v: i8) -> Self::Output;
    fn visit_u8(self, v: u8) -> Self::Output;
    fn visit_i16(self, v: i16) -> Self::Output;
    fn visit_u16(self, v: u16) -> Self::Output;
    fn visit_i32(self, v: i32) -> Self::Output;
    fn visit_u32(self, v: u32) -> Self::Output;
    fn visit_i64(self, v: i64) -> Self::Output;
    fn visit_u64(self, v: u64) -> Self::Output;
    fn visit_f32(self, v: f32) -> Self::Output;
    fn visit_f64(self, v: f64) -> Self::Output;
    fn visit_bool(self, v: bool) -> Self::Output;
    fn visit_half(self, v: half::f16) -> Self::Output;
}

/// Dispatch over the 15 fixed-size "generic" kinds (vectors, quat, euler,
/// colors, transforms, matrices, nil).
pub trait GenericVisitor {
    type Output;
    fn visit_vec2(self, v: crate::value::Vec2) -> Self::Output;
    fn visit_vec3(self, v: crate::value::Vec3) -> Self::Output;
    fn visit_vec4(self, v: crate::value::Vec4) -> Self::Output;
    fn visit_vec2i(self, v: crate::value::Vec2i) -> Self::Output;
    fn visit_vec3i(self, v: crate::value::Vec3i) -> Self::Output;
    fn visit_vec4i(self, v: crate::value::Vec4i) -> Self::Output;
    fn visit_quat(self, v: crate::value::Quat) -> Self::Output;
    fn visit_euler(self, v: crate::value::Euler) -> Self::Output;
    fn visit_srgba(self, v: crate::value::Srgba) -> Self::Output;
    fn visit_hdr(self, v: crate::value::Hdr) -> Self::Output;
    fn visit_transform(self, v: crate::value::Transform) -> Self::Output;
    fn visit_stransform(self, v: crate::value::Stransform) -> Self::Output;
    fn visit_mat4(self, v: crate::value::Mat4) -> Self::Output;
    fn visit_mat3x4(self, v: crate::value::Mat3x4) -> Self::Output;
    fn visit_nil(self) -> Self::Output;
}

/// Dispatch over the 9 heap-backed/non-trivial kinds. Borrows rather than
/// moves, since these payloads aren't `Copy`.
pub trait NonTrivialVisitor {
    type Output;
    fn visit_string(self, v: &str) -> Self::Output;
    fn visit_utf8(self, v: &[u8]) -> Self::Output;
    fn visit_blob(self, v: &bytes::Bytes) -> Self::Output;
    fn visit_blob_lz4(self, v: &crate::blob_lz4::BlobLz4) -> Self::Output;
    fn visit_element(self, v: &Element) -> Self::Output;
    fn visit_array(self, v: &Array) -> Self::Output;
    fn visit_array_lz4(self, v: &ArrayLz4) -> Self::Output;
    fn visit_reference(self, v: &Reference) -> Self::Output;
    fn visit_struct(self, v: &Struct) -> Self::Output;
}

/// The union of all three restricted visitors: one trait that covers every
/// kind, used by [`visit_all`].
pub trait ValueVisitor: NumericVisitor<Output = <Self as ValueVisitor>::Output>
    + GenericVisitor<Output = <Self as ValueVisitor>::Output>
    + NonTrivialVisitor<Output = <Self as ValueVisitor>::Output>
{
    type Output;
}

impl<V, O> ValueVisitor for V
where
    V: NumericVisitor<Output = O> + GenericVisitor<Output = O> + NonTrivialVisitor<Output = O>,
{
    type Output = O;
}

/// `visit_numeric(kind, f)`: fails with [`UdmError::InvalidUsage`] if
/// `value`'s kind isn't one of the 12 numeric kinds.
pub fn visit_numeric<V: NumericVisitor>(value: &Value, visitor: V) -> Result<V::Output> {
    Ok(match *value {
        Value::I8(v) => visitor.visit_i8(v),
        Value::U8(v) => visitor.visit_u8(v),
        Value::I16(v) => visitor.visit_i16(v),
        Value::U16(v) => visitor.visit_u16(v),
        Value::I32(v) => visitor.visit_i32(v),
        Value::U32(v) => visitor.visit_u32(v),
        Value::I64(v) => visitor.visit_i64(v),
        Value::U64(v) => visitor.visit_u64(v),
        Value::F32(v) => visitor.visit_f32(v),
        Value::F64(v) => visitor.visit_f64(v),
        Value::Bool(v) => visitor.visit_bool(v),
        Value::Half(v) => visitor.visit_half(v),
        _ => return Err(UdmError::type_mismatch(Type::I32, value.kind())),
    })
}

/// `visit_generic(kind, f)`: fails if `value`'s kind isn't one of the 15
/// fixed-size generic kinds.
pub fn visit_generic<V: GenericVisitor>(value: &Value, visitor: V) -> Result<V::Output> {
    Ok(match *value {
        Value::Vec2(v) => visitor.visit_vec2(v),
        Value::Vec3(v) => visitor.visit_vec3(v),
        Value::Vec4(v) => visitor.visit_vec4(v),
        Value::Vec2i(v) => visitor.visit_vec2i(v),
        Value::Vec3i(v) => visitor.visit_vec3i(v),
        Value::Vec4i(v) => visitor.visit_vec4i(v),
        Value::Quat(v) => visitor.visit_quat(v),
        Value::Euler(v) => visitor.visit_euler(v),
        Value::Srgba(v) => visitor.visit_srgba(v),
        Value::Hdr(v) => visitor.visit_hdr(v),
        Value::Transform(v) => visitor.visit_transform(v),
        Value::Stransform(v) => visitor.visit_stransform(v),
        Value::Mat4(v) => visitor.visit_mat4(v),
        Value::Mat3x4(v) => visitor.visit_mat3x4(v),
        Value::Nil => visitor.visit_nil(),
        _ => return Err(UdmError::type_mismatch(Type::Vec3, value.kind())),
    })
}

/// `visit_non_trivial(kind, f)`: fails if `value`'s kind isn't one of the 9
/// heap-backed kinds.
pub fn visit_non_trivial<V: NonTrivialVisitor>(value: &Value, visitor: V) -> Result<V::Output> {
    Ok(match value {
        Value::String(v) => visitor.visit_string(v),
        Value::Utf8(v) => visitor.visit_utf8(v),
        Value::Blob(v) => visitor.visit_blob(v),
        Value::BlobLz4(v) => visitor.visit_blob_lz4(v),
        Value::Element(v) => visitor.visit_element(v),
        Value::Array(v) => visitor.visit_array(v),
        Value::ArrayLz4(v) => visitor.visit_array_lz4(v),
        Value::Reference(v) => visitor.visit_reference(v),
        Value::Struct(v) => visitor.visit_struct(v),
        _ => return Err(UdmError::type_mismatch(Type::Element, value.kind())),
    })
}

/// `visit_all(kind, f)`: total over every kind; never fails.
pub fn visit_all<V: ValueVisitor>(value: &Value, visitor: V) -> V::Output {
    match value {
        Value::I8(_)
        | Value::U8(_)
        | Value::I16(_)
        | Value::U16(_)
        | Value::I32(_)
        | Value::U32(_)
        | Value::I64(_)
        | Value::U64(_)
        | Value::F32(_)
        | Value::F64(_)
        | Value::Bool(_)
        | Value::Half(_) => visit_numeric(value, visitor).expect("kind checked above"),
        Value::Vec2(_)
        | Value::Vec3(_)
        | Value::Vec4(_)
        | Value::Vec2i(_)
        | Value::Vec3i(_)
        | Value::Vec4i(_)
        | Value::Quat(_)
        | Value::Euler(_)
        | Value::Srgba(_)
        | Value::Hdr(_)
        | Value::Transform(_)
        | Value::Stransform(_)
        | Value::Mat4(_)
        | Value::Mat3x4(_)
        | Value::Nil => visit_generic(value, visitor).expect("kind checked above"),
        Value::String(_)
        | Value::Utf8(_)
        | Value::Blob(_)
        | Value::BlobLz4(_)
        | Value::Element(_)
        | Value::Array(_)
        | Value::ArrayLz4(_)
        | Value::Reference(_)
        | Value::Struct(_) => visit_non_trivial(value, visitor).expect("kind checked above"),
    }
}

impl PartialEq for Property {
    /// Deep equality by kind. Floats compare bitwise (no epsilon); arrays
    /// compare element-wise; elements compare child-by-child,
    /// order-independent (spec.md §4.3).
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_same_kind_overwrites() {
        let mut p = Property::create(Type::I32);
        p.assign(Value::I32(5)).unwrap();
        assert_eq!(p.as_i32().unwrap(), 5);
    }

    #[test]
    fn assign_converts_across_kinds() {
        let mut p = Property::create(Type::F32);
        p.assign(Value::I32(5)).unwrap();
        assert_eq!(p.value(), &Value::F32(5.0));
    }

    #[test]
    fn get_blob_data_reports_required_size_on_insufficient_buffer() {
        let p = Property::new(Value::Blob(bytes::Bytes::from_static(b"hello")));
        let mut tiny = [0u8; 2];
        let (result, required) = p.get_blob_data(&mut tiny);
        assert_eq!(
            result,
            BlobResult::InsufficientSize { required_size: 5 }
        );
        assert_eq!(required, 5);
    }

    #[test]
    fn get_blob_data_zero_size_buffer_reports_insufficient() {
        let p = Property::new(Value::Blob(bytes::Bytes::from_static(b"hello")));
        let (result, required) = p.get_blob_data(&mut []);
        assert_eq!(
            result,
            BlobResult::InsufficientSize { required_size: 5 }
        );
        assert_eq!(required, 5);
    }

    #[test]
    fn get_blob_data_not_a_blob_type_for_element() {
        let p = Property::new(Value::Element(Element::new()));
        let mut buf = [0u8; 16];
        let (result, _) = p.get_blob_data(&mut buf);
        assert_eq!(result, BlobResult::NotABlobType);
    }

    #[test]
    fn float_equality_is_bitwise() {
        let a = Property::new(Value::F32(f32::NAN));
        let b = Property::new(Value::F32(f32::NAN));
        // Bitwise equal NaNs (same bit pattern) compare equal under the
        // spec's "no epsilon" rule even though IEEE754 NaN != NaN.
        assert_eq!(a.value().clone(), b.value().clone());
    }
}
