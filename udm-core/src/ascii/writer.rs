//! Pretty ASCII writer (spec.md §4.7): tab indents, alphabetical key order
//! (via [`Element::iter_sorted`]), quoted keys where needed.

use base64::Engine;
use udm_types::Type;

use crate::array::Array;
use crate::array_lz4::ArrayLz4;
use crate::ascii::AsciiWriterFlags;
use crate::element::Element;
use crate::error::{Result, UdmError};
use crate::value::Value;

/// Write a full document: either the `assetData` children flat at the top
/// level, or (with `INCLUDE_HEADER`) the root's three header children
/// explicitly, `assetData` nested under a brace block (spec.md §4.7
/// `asset_decl`).
pub fn write_document(
    asset_type: &str,
    asset_version: u32,
    asset_data: &Element,
    flags: AsciiWriterFlags,
    out: &mut String,
) -> Result<()> {
    if flags.contains(AsciiWriterFlags::INCLUDE_HEADER) {
        out.push_str("$string assetType ");
        write_quoted_string(out, asset_type);
        out.push('\n');
        out.push_str("$uint32 assetVersion ");
        out.push_str(&asset_version.to_string());
        out.push('\n');
        out.push_str("assetData {\n");
        write_element_body_flagged(asset_data, out, 1, flags)?;
        out.push_str("}\n");
        Ok(())
    } else {
        write_element_body_flagged(asset_data, out, 0, flags)
    }
}

/// Render just `element`'s children, one per line. The default-flags entry
/// point used by [`crate::element::Element::to_ascii`].
pub fn write_element_body(element: &Element, out: &mut String, indent: usize) -> Result<()> {
    write_element_body_flagged(element, out, indent, AsciiWriterFlags::empty())
}

pub(crate) fn write_element_body_flagged(
    element: &Element,
    out: &mut String,
    indent: usize,
    flags: AsciiWriterFlags,
) -> Result<()> {
    for (key, property) in element.iter_sorted() {
        write_indent(out, indent);
        match property.value() {
            Value::Element(child) => {
                write_key(out, key);
                out.push_str(" {\n");
                write_element_body_flagged(child, out, indent + 1, flags)?;
                write_indent(out, indent);
                out.push_str("}\n");
            }
            other => {
                out.push('$');
                out.push_str(other.kind().ascii_name());
                out.push(' ');
                write_key(out, key);
                out.push(' ');
                write_value(other, out, flags)?;
                out.push('\n');
            }
        }
    }
    Ok(())
}

fn write_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push('\t');
    }
}

/// Quote a key if it contains whitespace, control characters, or `/`
/// (spec.md §4.7 pretty writer, §6 path grammar).
fn write_key(out: &mut String, key: &str) {
    if key.is_empty() || key.chars().any(|c| c.is_whitespace() || "{}[]$,;\"/".contains(c)) {
        write_quoted_string(out, key);
    } else {
        out.push_str(key);
    }
}

fn write_quoted_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('"');
}

fn write_float_list(out: &mut String, values: &[f32]) {
    out.push('[');
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&v.to_string());
    }
    out.push(']');
}

fn write_int_list(out: &mut String, values: &[i32]) {
    out.push('[');
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&v.to_string());
    }
    out.push(']');
}

fn write_u8_list(out: &mut String, values: &[u8]) {
    out.push('[');
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&v.to_string());
    }
    out.push(']');
}

fn write_u16_list(out: &mut String, values: &[u16]) {
    out.push('[');
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&v.to_string());
    }
    out.push(']');
}

fn write_value(value: &Value, out: &mut String, flags: AsciiWriterFlags) -> Result<()> {
    match value {
        Value::I8(v) => out.push_str(&v.to_string()),
        Value::U8(v) => out.push_str(&v.to_string()),
        Value::I16(v) => out.push_str(&v.to_string()),
        Value::U16(v) => out.push_str(&v.to_string()),
        Value::I32(v) => out.push_str(&v.to_string()),
        Value::U32(v) => out.push_str(&v.to_string()),
        Value::I64(v) => out.push_str(&v.to_string()),
        Value::U64(v) => out.push_str(&v.to_string()),
        Value::F32(v) => out.push_str(&v.to_string()),
        Value::F64(v) => out.push_str(&v.to_string()),
        Value::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
        Value::Half(v) => out.push_str(&v.to_bits().to_string()),
        Value::Vec2(v) => write_float_list(out, &v.components()),
        Value::Vec3(v) => write_float_list(out, &v.components()),
        Value::Vec4(v) => write_float_list(out, &v.components()),
        Value::Vec2i(v) => write_int_list(out, &v.components()),
        Value::Vec3i(v) => write_int_list(out, &v.components()),
        Value::Vec4i(v) => write_int_list(out, &v.components()),
        Value::Euler(v) => write_float_list(out, &v.components()),
        Value::Quat(v) => write_float_list(out, &v.to_wxyz()),
        Value::Srgba(v) => write_u8_list(out, &v.0),
        Value::Hdr(v) => write_u16_list(out, &v.0),
        Value::Transform(t) => {
            out.push('[');
            write_float_list(out, &t.position.components());
            write_float_list(out, &t.rotation.to_wxyz());
            out.push(']');
        }
        Value::Stransform(t) => {
            out.push('[');
            write_float_list(out, &t.position.components());
            write_float_list(out, &t.rotation.to_wxyz());
            write_float_list(out, &t.scale.components());
            out.push(']');
        }
        Value::Mat4(m) => write_float_list(out, &m.0),
        Value::Mat3x4(m) => write_float_list(out, &m.0),
        Value::Nil => out.push_str("nil"),
        Value::String(s) => write_quoted_string(out, s),
        Value::Utf8(bytes) => {
            out.push('[');
            out.push_str(&base64::engine::general_purpose::STANDARD.encode(bytes));
            out.push(']');
        }
        Value::Blob(bytes) => {
            out.push('[');
            out.push_str(&base64::engine::general_purpose::STANDARD.encode(bytes));
            out.push(']');
        }
        Value::BlobLz4(blob) => {
            out.push('[');
            out.push_str(&blob.uncompressed_size().to_string());
            out.push(']');
            out.push('[');
            out.push_str(&base64::engine::general_purpose::STANDARD.encode(blob.compressed_bytes()));
            out.push(']');
        }
        Value::Element(e) => {
            out.push_str("{\n");
            write_element_body_flagged(e, out, 0, flags)?;
            out.push('}');
        }
        Value::Array(a) => write_array(a, out, flags)?,
        Value::ArrayLz4(a) => write_array_lz4(a, out, flags)?,
        Value::Reference(r) => write_quoted_string(out, r.path()),
        Value::Struct(_) => return Err(UdmError::invalid_usage("struct has no standalone ascii literal form")),
    }
    Ok(())
}

fn write_array_header(value_type: Type, size: usize, lz4_marker: bool, out: &mut String) {
    out.push('[');
    out.push_str(value_type.ascii_name());
    out.push(';');
    out.push_str(&size.to_string());
    if lz4_marker {
        out.push_str(";lz4");
    }
    out.push(']');
}

fn write_array(array: &Array, out: &mut String, flags: AsciiWriterFlags) -> Result<()> {
    write_array_header(array.value_type(), array.len(), false, out);
    out.push('[');
    if array.trivial_bytes().is_some() {
        for i in 0..array.len() {
            if i > 0 {
                out.push(',');
            }
            let value = array.get_trivial(i).map_err(|e| UdmError::logic(e.to_string()))?;
            write_value(&value, out, flags)?;
        }
    } else {
        for (i, property) in array.iter_properties().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_value(property.value(), out, flags)?;
        }
    }
    out.push(']');
    Ok(())
}

/// `DONT_COMPRESS_LZ4_ARRAYS` only controls the `;lz4` header marker — the
/// element list itself is always written from the decompressed values,
/// since ascii is plain text regardless (spec.md §4.7).
fn write_array_lz4(array: &ArrayLz4, out: &mut String, flags: AsciiWriterFlags) -> Result<()> {
    let downgrade = flags.contains(AsciiWriterFlags::DONT_COMPRESS_LZ4_ARRAYS);
    write_array_header(array.value_type(), array.len() as usize, !downgrade, out);
    out.push('[');
    let value_type = array.value_type();
    for i in 0..array.len() as usize {
        if i > 0 {
            out.push(',');
        }
        if value_type == Type::Struct {
            return Err(UdmError::invalid_usage("struct-valued array_lz4 has no ascii literal form"));
        } else if value_type.is_trivial() {
            let value = array.get_trivial(i).map_err(|e| UdmError::logic(e.to_string()))?;
            write_value(&value, out, flags)?;
        } else {
            let property = array.get_property(i).map_err(|e| UdmError::logic(e.to_string()))?;
            write_value(property.value(), out, flags)?;
        }
    }
    out.push(']');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ascii::reader::parse_document;
    use udm_types::Type as T;

    #[test]
    fn writes_scalar_entry() {
        let mut element = Element::new();
        element.add("x", T::I32).unwrap().assign(Value::I32(5)).unwrap();
        let mut out = String::new();
        write_element_body(&element, &mut out, 0).unwrap();
        assert_eq!(out, "$int32 x 5\n");
    }

    #[test]
    fn quotes_keys_with_slashes() {
        let mut element = Element::new();
        element.insert("a/b", crate::property::Property::create(T::I32));
        let mut out = String::new();
        write_element_body(&element, &mut out, 0).unwrap();
        assert!(out.starts_with("$int32 \"a/b\""));
    }

    #[test]
    fn round_trips_through_parser() {
        let mut element = Element::new();
        element.add("x", T::I32).unwrap().assign(Value::I32(7)).unwrap();
        element.add("name", T::String).unwrap().assign(Value::String("hi".into())).unwrap();
        element.add("nested/leaf", T::Bool).unwrap().assign(Value::Bool(true)).unwrap();
        let mut out = String::new();
        write_element_body(&element, &mut out, 0).unwrap();
        let reparsed = parse_document(&out).unwrap();
        assert_eq!(reparsed, element);
    }

    #[test]
    fn array_header_carries_lz4_marker_unless_downgraded() {
        let mut array = ArrayLz4::new(T::I32);
        array.push_trivial(Value::I32(1)).unwrap();
        let mut out = String::new();
        write_array_lz4(&array, &mut out, AsciiWriterFlags::empty()).unwrap();
        assert!(out.starts_with("[int32;1;lz4]"));

        let mut downgraded = String::new();
        write_array_lz4(&array, &mut downgraded, AsciiWriterFlags::DONT_COMPRESS_LZ4_ARRAYS).unwrap();
        assert!(downgraded.starts_with("[int32;1]"));
    }
}
