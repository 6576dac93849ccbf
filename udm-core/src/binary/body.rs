//! Per-kind body framing (spec.md §4.6): everything that follows a
//! property's leading `type: u8` tag. Shared by the top-level binary
//! reader/writer (whole-document recursion) and by
//! [`crate::array_lz4::ArrayLz4`]'s non-trivial payload, which serializes a
//! flat run of bodies with no type tags (the array's `value_type` already
//! pins the kind for every element).

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use udm_types::Type;

use crate::array::Array;
use crate::array_lz4::ArrayLz4;
use crate::binary::primitive::{read_trivial, write_trivial};
use crate::element::Element;
use crate::error::{Result, UdmError};
use crate::property::Property;
use crate::reference::Reference;
use crate::struct_::{Struct, StructDescription};
use crate::value::Value;

const EXTENDED_LEN_SENTINEL: u8 = 0xFF;

fn write_len_prefixed<W: Write>(w: &mut W, bytes: &[u8]) -> Result<()> {
    if bytes.len() < EXTENDED_LEN_SENTINEL as usize {
        w.write_u8(bytes.len() as u8)?;
    } else {
        w.write_u8(EXTENDED_LEN_SENTINEL)?;
        w.write_u32::<LittleEndian>(bytes.len() as u32)?;
    }
    w.write_all(bytes)?;
    Ok(())
}

fn read_len_prefixed<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = match r.read_u8()? {
        EXTENDED_LEN_SENTINEL => r.read_u32::<LittleEndian>()? as usize,
        short => short as usize,
    };
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn write_string(w: &mut impl Write, s: &str) -> Result<()> {
    write_len_prefixed(w, s.as_bytes())
}

pub(crate) fn read_len_prefixed_string(r: &mut impl Read) -> Result<String> {
    read_string(r)
}

fn read_string(r: &mut impl Read) -> Result<String> {
    let bytes = read_len_prefixed(r)?;
    String::from_utf8(bytes).map_err(|e| UdmError::invalid_usage(format!("non-UTF8 string: {e}")))
}

/// Write the body of a value whose kind is `value.kind()`. Does not write a
/// leading type tag; callers that need framed properties use
/// [`write_property`] instead.
pub fn write_body<W: Write>(w: &mut W, value: &Value) -> Result<()> {
    match value {
        Value::String(s) => write_string(w, s)?,
        Value::Utf8(bytes) => {
            w.write_u32::<LittleEndian>(bytes.len() as u32)?;
            w.write_all(bytes)?;
        }
        Value::Blob(bytes) => {
            w.write_u64::<LittleEndian>(bytes.len() as u64)?;
            w.write_all(bytes)?;
        }
        Value::BlobLz4(blob) => {
            w.write_u64::<LittleEndian>(blob.compressed_bytes().len() as u64)?;
            w.write_u64::<LittleEndian>(blob.uncompressed_size())?;
            w.write_all(blob.compressed_bytes())?;
        }
        Value::Reference(reference) => write_string(w, reference.path())?,
        Value::Element(element) => write_element_body(w, element)?,
        Value::Array(array) => write_array_body(w, array)?,
        Value::ArrayLz4(array) => write_array_lz4_body(w, array)?,
        Value::Struct(s) => write_struct_body(w, s)?,
        other if other.kind().is_trivial() => write_trivial(w, other)?,
        other => {
            return Err(UdmError::logic(format!(
                "{:?} has no defined body encoding",
                other.kind()
            )))
        }
    }
    Ok(())
}

/// Read the body of a value of kind `kind`. Inverse of [`write_body`].
pub fn read_body<R: Read>(r: &mut R, kind: Type) -> Result<Value> {
    Ok(match kind {
        Type::String => Value::String(read_string(r)?),
        Type::Utf8 => {
            let len = r.read_u32::<LittleEndian>()? as usize;
            let mut buf = vec![0u8; len];
            r.read_exact(&mut buf)?;
            Value::Utf8(buf)
        }
        Type::Blob => {
            let len = r.read_u64::<LittleEndian>()? as usize;
            let mut buf = vec![0u8; len];
            r.read_exact(&mut buf)?;
            Value::Blob(Bytes::from(buf))
        }
        Type::BlobLz4 => {
            let compressed_size = r.read_u64::<LittleEndian>()? as usize;
            let uncompressed_size = r.read_u64::<LittleEndian>()?;
            let mut buf = vec![0u8; compressed_size];
            r.read_exact(&mut buf)?;
            Value::BlobLz4(crate::blob_lz4::BlobLz4::from_compressed(
                Bytes::from(buf),
                uncompressed_size,
            ))
        }
        Type::Reference => Value::Reference(Reference::new(read_string(r)?)),
        Type::Element => Value::Element(read_element_body(r)?),
        Type::Array => Value::Array(read_array_body(r)?),
        Type::ArrayLz4 => Value::ArrayLz4(read_array_lz4_body(r)?),
        Type::Struct => Value::Struct(read_struct_body(r)?),
        kind if kind.is_trivial() => read_trivial(kind, r)?,
        other => {
            return Err(UdmError::logic(format!(
                "{other:?} has no defined body encoding"
            )))
        }
    })
}

/// `element` body (spec.md §4.6): `body_size: u64` (for skip), `num_children:
/// u32`, that many length-prefixed keys, then that many child properties in
/// the same order. Children are written in the Element's insertion order,
/// not alphabetically — alphabetical order is an ASCII-writer presentation
/// concern only.
fn write_element_body<W: Write>(w: &mut W, element: &Element) -> Result<()> {
    let mut body = Vec::new();
    body.write_u32::<LittleEndian>(element.len() as u32)?;
    for (key, _) in element.iter() {
        write_string(&mut body, key)?;
    }
    for (_, property) in element.iter() {
        write_property(&mut body, property)?;
    }
    w.write_u64::<LittleEndian>(body.len() as u64)?;
    w.write_all(&body)?;
    Ok(())
}

fn read_element_body<R: Read>(r: &mut R) -> Result<Element> {
    let body_size = r.read_u64::<LittleEndian>()?;
    let mut body = vec![0u8; body_size as usize];
    r.read_exact(&mut body)?;
    let mut cursor = std::io::Cursor::new(body);

    let num_children = cursor.read_u32::<LittleEndian>()?;
    let mut keys = Vec::with_capacity(num_children as usize);
    for _ in 0..num_children {
        keys.push(read_string(&mut cursor)?);
    }
    let mut element = Element::new();
    for key in keys {
        let property = read_property(&mut cursor)?;
        element.insert(key, property);
    }
    Ok(element)
}

/// `array` body (spec.md §4.6): `value_type: u8`, `count: u32`; then either
/// `count × size_of(value_type)` raw bytes (trivial) or `body_size: u64`
/// followed by `count` serialized values (non-trivial).
fn write_array_body<W: Write>(w: &mut W, array: &Array) -> Result<()> {
    w.write_u8(array.value_type().into())?;
    w.write_u32::<LittleEndian>(array.len() as u32)?;
    if let Some(bytes) = array.trivial_bytes() {
        w.write_all(bytes)?;
    } else {
        let mut body = Vec::new();
        for property in array.iter_properties() {
            write_body(&mut body, property.value())?;
        }
        w.write_u64::<LittleEndian>(body.len() as u64)?;
        w.write_all(&body)?;
    }
    Ok(())
}

fn read_array_body<R: Read>(r: &mut R) -> Result<Array> {
    let value_type = Type::try_from(r.read_u8()?)
        .map_err(|_| UdmError::InvalidFormat("unrecognized array value_type tag".into()))?;
    let count = r.read_u32::<LittleEndian>()?;
    let mut array = Array::new(value_type);
    if value_type.is_trivial() {
        let stride = value_type
            .size_of_base()
            .map_err(|_| UdmError::InvalidFormat("trivial array value_type has no stride".into()))?;
        let mut bytes = vec![0u8; stride * count as usize];
        r.read_exact(&mut bytes)?;
        array.resize(count as usize);
        let mut cursor = std::io::Cursor::new(&bytes[..]);
        for i in 0..count as usize {
            let value = read_trivial(value_type, &mut cursor)?;
            array.set_trivial(i, &value)?;
        }
    } else {
        let body_size = r.read_u64::<LittleEndian>()?;
        let mut body = vec![0u8; body_size as usize];
        r.read_exact(&mut body)?;
        let mut cursor = std::io::Cursor::new(body);
        for _ in 0..count {
            let value = read_body(&mut cursor, value_type)?;
            array.push_property(Property::new(value))?;
        }
    }
    Ok(array)
}

/// `array_lz4` body (spec.md §4.6): `compressed_size: u64`, `value_type: u8`;
/// if `value_type == struct`, a `header_size: u16` then the struct
/// description; if `value_type == element`, an `uncompressed_size: u64`;
/// then `count: u32`, then `compressed_size` bytes of LZ4 payload.
///
/// Non-element, non-struct non-trivial value types also need their
/// uncompressed size declared to decompress — the same `uncompressed_size`
/// field covers both cases; only `struct` swaps it for an explicit
/// description (whose member layout already fixes the stride).
fn write_array_lz4_body<W: Write>(w: &mut W, array: &ArrayLz4) -> Result<()> {
    let (compressed, uncompressed_size) = array.compressed_for_write()?;
    w.write_u64::<LittleEndian>(compressed.len() as u64)?;
    w.write_u8(array.value_type().into())?;
    if array.value_type() == Type::Struct {
        let desc = array
            .struct_description()
            .ok_or_else(|| UdmError::logic("array_lz4 value_type is struct but has no description"))?;
        let mut header = Vec::new();
        write_struct_description(&mut header, desc)?;
        w.write_u16::<LittleEndian>(header.len() as u16)?;
        w.write_all(&header)?;
    } else {
        w.write_u64::<LittleEndian>(uncompressed_size)?;
    }
    w.write_u32::<LittleEndian>(array.len())?;
    w.write_all(&compressed)?;
    Ok(())
}

fn read_array_lz4_body<R: Read>(r: &mut R) -> Result<ArrayLz4> {
    let compressed_size = r.read_u64::<LittleEndian>()?;
    let value_type = Type::try_from(r.read_u8()?)
        .map_err(|_| UdmError::InvalidFormat("unrecognized array_lz4 value_type tag".into()))?;

    let (description, uncompressed_size_field) = if value_type == Type::Struct {
        let header_size = r.read_u16::<LittleEndian>()?;
        let mut header = vec![0u8; header_size as usize];
        r.read_exact(&mut header)?;
        let mut cursor = std::io::Cursor::new(header);
        let desc = read_struct_description(&mut cursor)?;
        (Some(desc), None)
    } else {
        (None, Some(r.read_u64::<LittleEndian>()?))
    };

    let count = r.read_u32::<LittleEndian>()?;
    let mut compressed = vec![0u8; compressed_size as usize];
    r.read_exact(&mut compressed)?;

    let uncompressed_size = match uncompressed_size_field {
        Some(size) => size,
        None => {
            let desc = description.as_ref().expect("struct branch set description");
            (desc.data_size_requirement() * count as usize) as u64
        }
    };

    Ok(ArrayLz4::from_compressed(
        value_type,
        description,
        Bytes::from(compressed),
        uncompressed_size,
        count,
    ))
}

/// `struct` body (spec.md §4.6): `body_size: u16`, description (`u8`
/// member-count, then `(type: u8, name: length-prefixed)` pairs), then
/// payload bytes.
fn write_struct_body<W: Write>(w: &mut W, s: &Struct) -> Result<()> {
    let mut header = Vec::new();
    write_struct_description(&mut header, s.description())?;
    w.write_u16::<LittleEndian>(header.len() as u16)?;
    w.write_all(&header)?;
    w.write_all(s.data())?;
    Ok(())
}

fn read_struct_body<R: Read>(r: &mut R) -> Result<Struct> {
    let header_size = r.read_u16::<LittleEndian>()?;
    let mut header = vec![0u8; header_size as usize];
    r.read_exact(&mut header)?;
    let mut cursor = std::io::Cursor::new(header);
    let description = read_struct_description(&mut cursor)?;
    let mut data = vec![0u8; description.data_size_requirement()];
    r.read_exact(&mut data)?;
    Struct::new(description, data)
}

fn write_struct_description<W: Write>(w: &mut W, desc: &StructDescription) -> Result<()> {
    w.write_u8(desc.member_count() as u8)?;
    for (name, ty) in desc.members() {
        w.write_u8(ty.into())?;
        write_string(w, name)?;
    }
    Ok(())
}

fn read_struct_description<R: Read>(r: &mut R) -> Result<StructDescription> {
    let member_count = r.read_u8()?;
    let mut members = Vec::with_capacity(member_count as usize);
    for _ in 0..member_count {
        let ty = Type::try_from(r.read_u8()?)
            .map_err(|_| UdmError::InvalidFormat("unrecognized struct member type tag".into()))?;
        let name = read_string(r)?;
        members.push((name, ty));
    }
    StructDescription::new(members)
}

/// Advance `r` past one value's body without materializing it, using the
/// same byte-count fields [`read_body`] parses (spec.md §4.6 "skip-scan").
/// Assumes `r` is positioned at the start of a `kind`-typed body (no type
/// tag — the caller already knows `kind`, whether because it just read a
/// property's tag or because it's iterating a homogeneous array).
pub(crate) fn skip_body<R: Read + Seek>(r: &mut R, kind: Type) -> Result<()> {
    match kind {
        kind if kind.is_trivial() => {
            let size = kind.size_of().unwrap_or(0);
            r.seek(SeekFrom::Current(size as i64))?;
        }
        Type::String | Type::Reference => {
            let len = match r.read_u8()? {
                EXTENDED_LEN_SENTINEL => r.read_u32::<LittleEndian>()? as i64,
                short => short as i64,
            };
            r.seek(SeekFrom::Current(len))?;
        }
        Type::Utf8 => {
            let len = r.read_u32::<LittleEndian>()? as i64;
            r.seek(SeekFrom::Current(len))?;
        }
        Type::Blob => {
            let len = r.read_u64::<LittleEndian>()? as i64;
            r.seek(SeekFrom::Current(len))?;
        }
        Type::BlobLz4 => {
            let compressed_size = r.read_u64::<LittleEndian>()? as i64;
            let _uncompressed_size = r.read_u64::<LittleEndian>()?;
            r.seek(SeekFrom::Current(compressed_size))?;
        }
        Type::Element => {
            let body_size = r.read_u64::<LittleEndian>()? as i64;
            r.seek(SeekFrom::Current(body_size))?;
        }
        Type::Array => {
            let value_type = Type::try_from(r.read_u8()?)
                .map_err(|_| UdmError::InvalidFormat("unrecognized array value_type tag".into()))?;
            let count = r.read_u32::<LittleEndian>()?;
            if value_type.is_trivial() {
                let stride = value_type.size_of_base().unwrap_or(0);
                r.seek(SeekFrom::Current((stride * count as usize) as i64))?;
            } else {
                let body_size = r.read_u64::<LittleEndian>()? as i64;
                r.seek(SeekFrom::Current(body_size))?;
            }
        }
        Type::ArrayLz4 => {
            let compressed_size = r.read_u64::<LittleEndian>()? as i64;
            let value_type = Type::try_from(r.read_u8()?)
                .map_err(|_| UdmError::InvalidFormat("unrecognized array_lz4 value_type tag".into()))?;
            if value_type == Type::Struct {
                let header_size = r.read_u16::<LittleEndian>()? as i64;
                r.seek(SeekFrom::Current(header_size))?;
            } else {
                let _uncompressed_size = r.read_u64::<LittleEndian>()?;
            }
            let _count = r.read_u32::<LittleEndian>()?;
            r.seek(SeekFrom::Current(compressed_size))?;
        }
        Type::Struct => {
            let header_size = r.read_u16::<LittleEndian>()?;
            let mut header = vec![0u8; header_size as usize];
            r.read_exact(&mut header)?;
            let mut cursor = std::io::Cursor::new(header);
            let description = read_struct_description(&mut cursor)?;
            r.seek(SeekFrom::Current(description.data_size_requirement() as i64))?;
        }
        other => {
            return Err(UdmError::logic(format!(
                "{other:?} has no defined body encoding to skip"
            )))
        }
    }
    Ok(())
}

/// Full framed property: `type: u8` then [`write_body`].
pub fn write_property<W: Write>(w: &mut W, property: &Property) -> Result<()> {
    w.write_u8(property.kind().into())?;
    write_body(w, property.value())
}

pub fn read_property<R: Read>(r: &mut R) -> Result<Property> {
    let kind = Type::try_from(r.read_u8()?)
        .map_err(|_| UdmError::InvalidFormat("unrecognized property type tag".into()))?;
    Ok(Property::new(read_body(r, kind)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trips_with_extended_length() {
        let long = "x".repeat(300);
        let mut buf = Vec::new();
        write_body(&mut buf, &Value::String(long.clone())).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_body(&mut cursor, Type::String).unwrap();
        assert_eq!(decoded, Value::String(long));
    }

    #[test]
    fn element_body_round_trips() {
        let mut element = Element::new();
        element.add("a", Type::I32).unwrap().assign(Value::I32(1)).unwrap();
        element.add("b", Type::String).unwrap().assign(Value::String("hi".into())).unwrap();
        let mut buf = Vec::new();
        write_body(&mut buf, &Value::Element(element.clone())).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_body(&mut cursor, Type::Element).unwrap();
        assert_eq!(decoded, Value::Element(element));
    }

    #[test]
    fn trivial_array_round_trips() {
        let mut array = Array::new(Type::I32);
        for v in [1, 2, 3] {
            array.push_trivial(Value::I32(v)).unwrap();
        }
        let mut buf = Vec::new();
        write_body(&mut buf, &Value::Array(array.clone())).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_body(&mut cursor, Type::Array).unwrap();
        assert_eq!(decoded, Value::Array(array));
    }

    #[test]
    fn struct_body_round_trips() {
        let desc = StructDescription::new(vec![("a".into(), Type::I32), ("b".into(), Type::F32)]).unwrap();
        let s = Struct::new(desc, vec![1, 0, 0, 0, 0, 0, 128, 63]).unwrap();
        let mut buf = Vec::new();
        write_body(&mut buf, &Value::Struct(s.clone())).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_body(&mut cursor, Type::Struct).unwrap();
        assert_eq!(decoded, Value::Struct(s));
    }

    #[test]
    fn array_lz4_body_round_trips_trivial() {
        let mut array = ArrayLz4::new(Type::F32);
        for v in [1.0f32, 2.0, 3.0] {
            array.push_trivial(Value::F32(v)).unwrap();
        }
        let mut buf = Vec::new();
        write_body(&mut buf, &Value::ArrayLz4(array.clone())).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_body(&mut cursor, Type::ArrayLz4).unwrap();
        assert_eq!(decoded, Value::ArrayLz4(array));
    }
}
