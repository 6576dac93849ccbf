//! Little-endian encode/decode for trivial (numeric + fixed-size generic)
//! values. Shared by the binary codec's property bodies (spec.md §4.6) and
//! by [`crate::array::Array`]'s contiguous trivial storage, since both are
//! the same byte layout.
//!
//! Grounded in `examples/other_examples`' Fyrox `visitor/mod.rs`, which
//! reads/writes its own elementary fields with
//! `byteorder::{ReadBytesExt, WriteBytesExt}` rather than hand-rolled slice
//! slicing, the closer analog for this specific "typed little-endian field"
//! problem than `apfs-core::pod`'s manual slicing.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use half::f16;
use udm_types::Type;

use crate::error::{Result, UdmError};
use crate::value::{Hdr, Mat3x4, Mat4, Quat, Srgba, Stransform, Transform, Value, Vec2, Vec2i, Vec3, Vec3i, Vec4, Vec4i};

pub fn write_trivial<W: Write>(w: &mut W, value: &Value) -> Result<()> {
    match value {
        Value::I8(v) => w.write_i8(*v)?,
        Value::U8(v) => w.write_u8(*v)?,
        Value::I16(v) => w.write_i16::<LittleEndian>(*v)?,
        Value::U16(v) => w.write_u16::<LittleEndian>(*v)?,
        Value::I32(v) => w.write_i32::<LittleEndian>(*v)?,
        Value::U32(v) => w.write_u32::<LittleEndian>(*v)?,
        Value::I64(v) => w.write_i64::<LittleEndian>(*v)?,
        Value::U64(v) => w.write_u64::<LittleEndian>(*v)?,
        Value::F32(v) => w.write_f32::<LittleEndian>(*v)?,
        Value::F64(v) => w.write_f64::<LittleEndian>(*v)?,
        Value::Bool(v) => w.write_u8(if *v { 1 } else { 0 })?,
        Value::Half(v) => w.write_u16::<LittleEndian>(v.to_bits())?,
        Value::Vec2(v) => write_f32s(w, &v.components())?,
        Value::Vec3(v) => write_f32s(w, &v.components())?,
        Value::Vec4(v) => write_f32s(w, &v.components())?,
        Value::Vec2i(v) => write_i32s(w, &v.components())?,
        Value::Vec3i(v) => write_i32s(w, &v.components())?,
        Value::Vec4i(v) => write_i32s(w, &v.components())?,
        Value::Quat(v) => write_f32s(w, &v.to_xyzw())?,
        Value::Euler(v) => write_f32s(w, &v.components())?,
        Value::Srgba(v) => {
            for b in v.0 {
                w.write_u8(b)?;
            }
        }
        Value::Hdr(v) => {
            for c in v.0 {
                w.write_u16::<LittleEndian>(c)?;
            }
        }
        Value::Transform(v) => {
            write_f32s(w, &v.position.components())?;
            write_f32s(w, &v.rotation.to_xyzw())?;
        }
        Value::Stransform(v) => {
            write_f32s(w, &v.position.components())?;
            write_f32s(w, &v.rotation.to_xyzw())?;
            write_f32s(w, &v.scale.components())?;
        }
        Value::Mat4(v) => write_f32s(w, &v.0)?,
        Value::Mat3x4(v) => write_f32s(w, &v.0)?,
        Value::Nil => {}
        other => {
            return Err(UdmError::logic(format!(
                "{:?} is not a trivial value",
                other.kind()
            )))
        }
    }
    Ok(())
}

pub fn read_trivial<R: Read>(ty: Type, r: &mut R) -> Result<Value> {
    Ok(match ty {
        Type::I8 => Value::I8(r.read_i8()?),
        Type::U8 => Value::U8(r.read_u8()?),
        Type::I16 => Value::I16(r.read_i16::<LittleEndian>()?),
        Type::U16 => Value::U16(r.read_u16::<LittleEndian>()?),
        Type::I32 => Value::I32(r.read_i32::<LittleEndian>()?),
        Type::U32 => Value::U32(r.read_u32::<LittleEndian>()?),
        Type::I64 => Value::I64(r.read_i64::<LittleEndian>()?),
        Type::U64 => Value::U64(r.read_u64::<LittleEndian>()?),
        Type::F32 => Value::F32(r.read_f32::<LittleEndian>()?),
        Type::F64 => Value::F64(r.read_f64::<LittleEndian>()?),
        Type::Bool => Value::Bool(r.read_u8()? != 0),
        Type::Half => Value::Half(f16::from_bits(r.read_u16::<LittleEndian>()?)),
        Type::Vec2 => Value::Vec2(Vec2::from_components(&read_f32s::<_, 2>(r)?)),
        Type::Vec3 => Value::Vec3(Vec3::from_components(&read_f32s::<_, 3>(r)?)),
        Type::Vec4 => Value::Vec4(Vec4::from_components(&read_f32s::<_, 4>(r)?)),
        Type::Vec2i => Value::Vec2i(Vec2i::from_components(&read_i32s::<_, 2>(r)?)),
        Type::Vec3i => Value::Vec3i(Vec3i::from_components(&read_i32s::<_, 3>(r)?)),
        Type::Vec4i => Value::Vec4i(Vec4i::from_components(&read_i32s::<_, 4>(r)?)),
        Type::Quat => {
            let c = read_f32s::<_, 4>(r)?;
            Value::Quat(Quat::from_xyzw(c[0], c[1], c[2], c[3]))
        }
        Type::Euler => Value::Euler(Vec3::from_components(&read_f32s::<_, 3>(r)?)),
        Type::Srgba => {
            let mut bytes = [0u8; 4];
            r.read_exact(&mut bytes)?;
            Value::Srgba(Srgba(bytes))
        }
        Type::Hdr => {
            let mut c = [0u16; 3];
            for slot in &mut c {
                *slot = r.read_u16::<LittleEndian>()?;
            }
            Value::Hdr(Hdr(c))
        }
        Type::Transform => {
            let pos = read_f32s::<_, 3>(r)?;
            let rot = read_f32s::<_, 4>(r)?;
            Value::Transform(Transform {
                position: Vec3::from_components(&pos),
                rotation: Quat::from_xyzw(rot[0], rot[1], rot[2], rot[3]),
            })
        }
        Type::Stransform => {
            let pos = read_f32s::<_, 3>(r)?;
            let rot = read_f32s::<_, 4>(r)?;
            let scale = read_f32s::<_, 3>(r)?;
            Value::Stransform(Stransform {
                position: Vec3::from_components(&pos),
                rotation: Quat::from_xyzw(rot[0], rot[1], rot[2], rot[3]),
                scale: Vec3::from_components(&scale),
            })
        }
        Type::Mat4 => Value::Mat4(Mat4(read_f32s::<_, 16>(r)?)),
        Type::Mat3x4 => Value::Mat3x4(Mat3x4(read_f32s::<_, 12>(r)?)),
        Type::Nil => Value::Nil,
        other => {
            return Err(UdmError::logic(format!(
                "{other:?} is not a trivial value"
            )))
        }
    })
}

fn write_f32s<W: Write>(w: &mut W, values: &[f32]) -> Result<()> {
    for v in values {
        w.write_f32::<LittleEndian>(*v)?;
    }
    Ok(())
}

fn write_i32s<W: Write>(w: &mut W, values: &[i32]) -> Result<()> {
    for v in values {
        w.write_i32::<LittleEndian>(*v)?;
    }
    Ok(())
}

fn read_f32s<R: Read, const N: usize>(r: &mut R) -> Result<[f32; N]> {
    let mut out = [0f32; N];
    for slot in &mut out {
        *slot = r.read_f32::<LittleEndian>()?;
    }
    Ok(out)
}

fn read_i32s<R: Read, const N: usize>(r: &mut R) -> Result<[i32; N]> {
    let mut out = [0i32; N];
    for slot in &mut out {
        *slot = r.read_i32::<LittleEndian>()?;
    }
    Ok(out)
}
