//! Debug JSON rendering (SPEC_FULL.md "Supplemented features", recovered
//! from `original_source/src/json.cpp`): a one-way, informational dump of an
//! Element tree, not a persisted format. Reuses [`AsciiWriterFlags`] only for
//! the `ArrayLz4` struct-record path; nothing about the ascii grammar itself
//! carries over (keys are always quoted, and a `Struct` value renders as a
//! base64 string instead of erroring, since there's no literal-form
//! restriction to honor in a debug dump).

use base64::Engine;
use udm_types::Type;

use crate::array::Array;
use crate::array_lz4::ArrayLz4;
use crate::ascii::AsciiWriterFlags;
use crate::element::Element;
use crate::error::Result;
use crate::value::Value;

pub fn element_to_json(element: &Element, flags: AsciiWriterFlags, out: &mut String) -> Result<()> {
    out.push('{');
    for (i, (key, property)) in element.iter_sorted().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_json_string(out, key);
        out.push(':');
        value_to_json(property.value(), flags, out)?;
    }
    out.push('}');
    Ok(())
}

fn write_json_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
}

fn write_json_floats(out: &mut String, values: &[f32]) {
    out.push('[');
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&v.to_string());
    }
    out.push(']');
}

fn write_json_ints(out: &mut String, values: &[i32]) {
    out.push('[');
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&v.to_string());
    }
    out.push(']');
}

fn value_to_json(value: &Value, flags: AsciiWriterFlags, out: &mut String) -> Result<()> {
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
        Value::Half(v) => out.push_str(&v.to_f32().to_string()),
        Value::Vec2(v) => write_json_floats(out, &v.components()),
        Value::Vec3(v) => write_json_floats(out, &v.components()),
        Value::Vec4(v) => write_json_floats(out, &v.components()),
        Value::Vec2i(v) => write_json_ints(out, &v.components()),
        Value::Vec3i(v) => write_json_ints(out, &v.components()),
        Value::Vec4i(v) => write_json_ints(out, &v.components()),
        Value::Euler(v) => write_json_floats(out, &v.components()),
        Value::Quat(v) => write_json_floats(out, &v.to_wxyz()),
        Value::Srgba(v) => write_json_ints(out, &v.0.map(|b| b as i32)),
        Value::Hdr(v) => write_json_ints(out, &v.0.map(|c| c as i32)),
        Value::Transform(t) => {
            out.push('[');
            write_json_floats(out, &t.position.components());
            out.push(',');
            write_json_floats(out, &t.rotation.to_wxyz());
            out.push(']');
        }
        Value::Stransform(t) => {
            out.push('[');
            write_json_floats(out, &t.position.components());
            out.push(',');
            write_json_floats(out, &t.rotation.to_wxyz());
            out.push(',');
            write_json_floats(out, &t.scale.components());
            out.push(']');
        }
        Value::Mat4(m) => write_json_floats(out, &m.0),
        Value::Mat3x4(m) => write_json_floats(out, &m.0),
        Value::Nil => out.push_str("null"),
        Value::String(s) => write_json_string(out, s),
        Value::Utf8(bytes) => write_json_string(out, &String::from_utf8_lossy(bytes)),
        Value::Blob(bytes) => write_json_string(out, &base64::engine::general_purpose::STANDARD.encode(bytes)),
        Value::BlobLz4(blob) => write_json_string(
            out,
            &base64::engine::general_purpose::STANDARD.encode(blob.compressed_bytes()),
        ),
        Value::Element(e) => element_to_json(e, flags, out)?,
        Value::Array(a) => array_to_json(a, flags, out)?,
        Value::ArrayLz4(a) => array_lz4_to_json(a, flags, out)?,
        Value::Reference(r) => write_json_string(out, r.path()),
        Value::Struct(s) => write_json_string(out, &base64::engine::general_purpose::STANDARD.encode(s.data())),
    }
    Ok(())
}

fn array_to_json(array: &Array, flags: AsciiWriterFlags, out: &mut String) -> Result<()> {
    out.push('[');
    if array.trivial_bytes().is_some() {
        for i in 0..array.len() {
            if i > 0 {
                out.push(',');
            }
            value_to_json(&array.get_trivial(i)?, flags, out)?;
        }
    } else {
        for (i, property) in array.iter_properties().enumerate() {
            if i > 0 {
                out.push(',');
            }
            value_to_json(property.value(), flags, out)?;
        }
    }
    out.push(']');
    Ok(())
}

/// `flags` only controls whether a struct-valued element is rendered as a
/// base64 blob (ArrayLz4's on-disk struct record) or its component values;
/// there's no on-disk marker to toggle the way the ascii writer's `;lz4`
/// header suffix does, since JSON is never re-parsed back into a document.
fn array_lz4_to_json(array: &ArrayLz4, flags: AsciiWriterFlags, out: &mut String) -> Result<()> {
    out.push('[');
    let value_type = array.value_type();
    for i in 0..array.len() as usize {
        if i > 0 {
            out.push(',');
        }
        if value_type == Type::Struct {
            let record = array.get_struct_record(i)?;
            write_json_string(out, &base64::engine::general_purpose::STANDARD.encode(record));
        } else if value_type.is_trivial() {
            value_to_json(&array.get_trivial(i)?, flags, out)?;
        } else {
            let property = array.get_property(i)?;
            value_to_json(property.value(), flags, out)?;
        }
    }
    out.push(']');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;
    use udm_types::Type as T;

    #[test]
    fn renders_scalar_and_nested_element() {
        let mut element = Element::new();
        element.add("x", T::I32).unwrap().assign(Value::I32(5)).unwrap();
        element.add("nested/leaf", T::Bool).unwrap().assign(Value::Bool(true)).unwrap();
        let mut out = String::new();
        element_to_json(&element, AsciiWriterFlags::empty(), &mut out).unwrap();
        assert_eq!(out, r#"{"nested":{"leaf":true},"x":5}"#);
    }

    #[test]
    fn renders_struct_as_base64() {
        let desc = crate::struct_::StructDescription::new(vec![("a".into(), T::U8), ("b".into(), T::U8), ("c".into(), T::U8)]).unwrap();
        let s = crate::struct_::Struct::new(desc, vec![1, 2, 3]).unwrap();
        let mut element = Element::new();
        element.insert("s", Property::new(Value::Struct(s)));
        let mut out = String::new();
        element_to_json(&element, AsciiWriterFlags::empty(), &mut out).unwrap();
        assert_eq!(out, format!(r#"{{"s":"{}"}}"#, base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3])));
    }
}
