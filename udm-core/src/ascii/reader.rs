//! ASCII parser (spec.md §4.7): recursive-descent over [`Tokenizer`],
//! producing an [`Element`] tree.

use base64::Engine;
use bytes::Bytes;
use udm_types::Type;

use crate::array::Array;
use crate::array_lz4::ArrayLz4;
use crate::ascii::tokenizer::{Token, Tokenizer};
use crate::blob_lz4::BlobLz4;
use crate::element::Element;
use crate::error::{Result, UdmError};
use crate::property::Property;
use crate::reference::Reference;
use crate::value::{Euler, Hdr, Mat3x4, Mat4, Quat, Srgba, Stransform, Transform, Value, Vec2, Vec2i, Vec3, Vec3i, Vec4, Vec4i};

/// Parse a whole document's top-level entries (spec.md §4.7 `document`)
/// into a flat [`Element`]. Whether that element is the root (with
/// `assetType`/`assetVersion`/`assetData` children) or `assetData` itself
/// depends on whether the source was written with `IncludeHeader` — that
/// distinction is [`crate::data::Data`]'s to make, not this parser's.
pub fn parse_document(src: &str) -> Result<Element> {
    let mut tokenizer = Tokenizer::new(src);
    let element = parse_element_entries(&mut tokenizer)?;
    let (tok, line, column) = tokenizer.next_token()?;
    if tok != Token::Eof {
        return Err(UdmError::ascii_syntax(
            line,
            column,
            format!("unexpected trailing token {tok:?}"),
        ));
    }
    Ok(element)
}

pub(crate) fn parse_element_entries(t: &mut Tokenizer) -> Result<Element> {
    let mut element = Element::new();
    loop {
        let (tok, ..) = t.peek_token()?;
        match tok {
            Token::Eof | Token::Symbol('}') => break,
            _ => {
                let (key, property) = parse_entry(t)?;
                element.insert(key, property);
            }
        }
    }
    Ok(element)
}

fn parse_entry(t: &mut Tokenizer) -> Result<(String, Property)> {
    let (tok, line, column) = t.next_token()?;
    match tok {
        Token::Symbol('$') => {
            let (type_tok, l2, c2) = t.next_token()?;
            let Token::Ident(type_name) = type_tok else {
                return Err(UdmError::ascii_syntax(l2, c2, "expected a type name after '$'"));
            };
            let kind = Type::from_ascii_name(&type_name)
                .ok_or_else(|| UdmError::ascii_syntax(l2, c2, format!("unknown type name {type_name:?}")))?;
            let key = parse_key(t)?;
            let value = parse_value(t, kind)?;
            Ok((key, Property::new(value)))
        }
        Token::Ident(key) | Token::QuotedString(key) => {
            expect_symbol(t, '{')?;
            let element = parse_element_entries(t)?;
            expect_symbol(t, '}')?;
            Ok((key, Property::new(Value::Element(element))))
        }
        other => Err(UdmError::ascii_syntax(line, column, format!("unexpected token {other:?}"))),
    }
}

fn parse_key(t: &mut Tokenizer) -> Result<String> {
    let (tok, line, column) = t.next_token()?;
    match tok {
        Token::Ident(s) | Token::QuotedString(s) => Ok(s),
        other => Err(UdmError::ascii_syntax(line, column, format!("expected a key, found {other:?}"))),
    }
}

fn expect_symbol(t: &mut Tokenizer, sym: char) -> Result<()> {
    let (tok, line, column) = t.next_token()?;
    match tok {
        Token::Symbol(c) if c == sym => Ok(()),
        other => Err(UdmError::ascii_syntax(
            line,
            column,
            format!("expected {sym:?}, found {other:?}"),
        )),
    }
}

fn parse_scalar_token(t: &mut Tokenizer) -> Result<(String, u32, u32)> {
    let (tok, line, column) = t.next_token()?;
    match tok {
        Token::Ident(s) | Token::QuotedString(s) => Ok((s, line, column)),
        other => Err(UdmError::ascii_syntax(line, column, format!("expected a value, found {other:?}"))),
    }
}

macro_rules! parse_int_value {
    ($t:expr, $ty:ty, $variant:ident) => {{
        let (s, line, column) = parse_scalar_token($t)?;
        let v: $ty = s
            .parse()
            .map_err(|_| UdmError::ascii_data(line, column, format!("invalid integer literal {s:?}")))?;
        Ok(Value::$variant(v))
    }};
}

macro_rules! parse_float_value {
    ($t:expr, $ty:ty, $variant:ident) => {{
        let (s, line, column) = parse_scalar_token($t)?;
        let v: $ty = s
            .parse()
            .map_err(|_| UdmError::ascii_data(line, column, format!("invalid float literal {s:?}")))?;
        Ok(Value::$variant(v))
    }};
}

fn parse_value(t: &mut Tokenizer, kind: Type) -> Result<Value> {
    match kind {
        Type::Nil => {
            parse_scalar_token(t)?;
            Ok(Value::Nil)
        }
        Type::Bool => {
            let (s, line, column) = parse_scalar_token(t)?;
            match s.as_str() {
                "0" | "false" => Ok(Value::Bool(false)),
                "1" | "true" => Ok(Value::Bool(true)),
                _ => Err(UdmError::ascii_data(line, column, format!("invalid bool literal {s:?}"))),
            }
        }
        Type::I8 => parse_int_value!(t, i8, I8),
        Type::U8 => parse_int_value!(t, u8, U8),
        Type::I16 => parse_int_value!(t, i16, I16),
        Type::U16 => parse_int_value!(t, u16, U16),
        Type::I32 => parse_int_value!(t, i32, I32),
        Type::U32 => parse_int_value!(t, u32, U32),
        Type::I64 => parse_int_value!(t, i64, I64),
        Type::U64 => parse_int_value!(t, u64, U64),
        Type::F32 => parse_float_value!(t, f32, F32),
        Type::F64 => parse_float_value!(t, f64, F64),
        Type::Half => {
            let (s, line, column) = parse_scalar_token(t)?;
            let bits: u16 = s
                .parse()
                .map_err(|_| UdmError::ascii_data(line, column, format!("invalid half bit pattern {s:?}")))?;
            Ok(Value::Half(half::f16::from_bits(bits)))
        }
        Type::Vec2 => Ok(Value::Vec2(Vec2::from_components(&parse_float_list(t, 2)?))),
        Type::Vec3 => Ok(Value::Vec3(Vec3::from_components(&parse_float_list(t, 3)?))),
        Type::Vec4 => Ok(Value::Vec4(Vec4::from_components(&parse_float_list(t, 4)?))),
        Type::Vec2i => Ok(Value::Vec2i(Vec2i::from_components(&parse_int_list(t, 2)?))),
        Type::Vec3i => Ok(Value::Vec3i(Vec3i::from_components(&parse_int_list(t, 3)?))),
        Type::Vec4i => Ok(Value::Vec4i(Vec4i::from_components(&parse_int_list(t, 4)?))),
        Type::Euler => Ok(Value::Euler(Euler::from_components(&parse_float_list(t, 3)?))),
        Type::Quat => {
            let c = parse_float_list(t, 4)?;
            Ok(Value::Quat(Quat::from_wxyz(c[0], c[1], c[2], c[3])))
        }
        Type::Srgba => {
            let c = parse_int_list(t, 4)?;
            Ok(Value::Srgba(Srgba([c[0] as u8, c[1] as u8, c[2] as u8, c[3] as u8])))
        }
        Type::Hdr => {
            let c = parse_int_list(t, 3)?;
            Ok(Value::Hdr(Hdr([c[0] as u16, c[1] as u16, c[2] as u16])))
        }
        Type::Transform => {
            expect_symbol(t, '[')?;
            let pos = parse_float_list(t, 3)?;
            let rot = parse_float_list(t, 4)?;
            expect_symbol(t, ']')?;
            Ok(Value::Transform(Transform {
                position: Vec3::from_components(&pos),
                rotation: Quat::from_wxyz(rot[0], rot[1], rot[2], rot[3]),
            }))
        }
        Type::Stransform => {
            expect_symbol(t, '[')?;
            let pos = parse_float_list(t, 3)?;
            let rot = parse_float_list(t, 4)?;
            let scale = parse_float_list(t, 3)?;
            expect_symbol(t, ']')?;
            Ok(Value::Stransform(Stransform {
                position: Vec3::from_components(&pos),
                rotation: Quat::from_wxyz(rot[0], rot[1], rot[2], rot[3]),
                scale: Vec3::from_components(&scale),
            }))
        }
        Type::Mat4 => {
            let c = parse_float_list(t, 16)?;
            let mut arr = [0.0f32; 16];
            arr.copy_from_slice(&c);
            Ok(Value::Mat4(Mat4(arr)))
        }
        Type::Mat3x4 => {
            let c = parse_float_list(t, 12)?;
            let mut arr = [0.0f32; 12];
            arr.copy_from_slice(&c);
            Ok(Value::Mat3x4(Mat3x4(arr)))
        }
        Type::String => {
            let (s, _, _) = parse_scalar_token(t)?;
            Ok(Value::String(s))
        }
        Type::Utf8 => {
            expect_symbol(t, '[')?;
            let (b64, line, column) = parse_scalar_token(t)?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(&b64)
                .map_err(|e| UdmError::ascii_data(line, column, format!("invalid base64: {e}")))?;
            expect_symbol(t, ']')?;
            Ok(Value::Utf8(bytes))
        }
        Type::Blob => {
            expect_symbol(t, '[')?;
            let (b64, line, column) = parse_scalar_token(t)?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(&b64)
                .map_err(|e| UdmError::ascii_data(line, column, format!("invalid base64: {e}")))?;
            expect_symbol(t, ']')?;
            Ok(Value::Blob(Bytes::from(bytes)))
        }
        Type::BlobLz4 => {
            expect_symbol(t, '[')?;
            let (s, line, column) = parse_scalar_token(t)?;
            let uncompressed_size: u64 = s
                .parse()
                .map_err(|_| UdmError::ascii_data(line, column, format!("invalid uncompressed size {s:?}")))?;
            expect_symbol(t, ']')?;
            expect_symbol(t, '[')?;
            let (b64, line2, column2) = parse_scalar_token(t)?;
            let compressed = base64::engine::general_purpose::STANDARD
                .decode(&b64)
                .map_err(|e| UdmError::ascii_data(line2, column2, format!("invalid base64: {e}")))?;
            expect_symbol(t, ']')?;
            Ok(Value::BlobLz4(BlobLz4::from_compressed(Bytes::from(compressed), uncompressed_size)))
        }
        Type::Element => {
            expect_symbol(t, '{')?;
            let element = parse_element_entries(t)?;
            expect_symbol(t, '}')?;
            Ok(Value::Element(element))
        }
        Type::Reference => {
            let (s, _, _) = parse_scalar_token(t)?;
            Ok(Value::Reference(Reference::new(s)))
        }
        Type::Array | Type::ArrayLz4 => parse_array_value(t),
        Type::Struct => Err(UdmError::invalid_usage("struct has no standalone ascii literal form")),
        Type::Count | Type::Invalid => Err(UdmError::logic(format!("{kind:?} is not a value-bearing type"))),
    }
}

fn parse_float_list(t: &mut Tokenizer, n: usize) -> Result<Vec<f32>> {
    expect_symbol(t, '[')?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        if i > 0 {
            expect_symbol(t, ',')?;
        }
        let (s, line, column) = parse_scalar_token(t)?;
        let v: f32 = s
            .parse()
            .map_err(|_| UdmError::ascii_data(line, column, format!("invalid float {s:?}")))?;
        out.push(v);
    }
    expect_symbol(t, ']')?;
    Ok(out)
}

fn parse_int_list(t: &mut Tokenizer, n: usize) -> Result<Vec<i32>> {
    expect_symbol(t, '[')?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        if i > 0 {
            expect_symbol(t, ',')?;
        }
        let (s, line, column) = parse_scalar_token(t)?;
        let v: i32 = s
            .parse()
            .map_err(|_| UdmError::ascii_data(line, column, format!("invalid integer {s:?}")))?;
        out.push(v);
    }
    expect_symbol(t, ']')?;
    Ok(out)
}

/// `[value_type_name;size]` or `[value_type_name;size;lz4]` (spec.md §4.7,
/// §6 — `array_lz4` shares the `"array"` ascii type name with `array`, so
/// the `;lz4` marker inside the header is what distinguishes them).
fn parse_array_header(t: &mut Tokenizer) -> Result<(Type, usize, bool)> {
    expect_symbol(t, '[')?;
    let (type_tok, line, column) = t.next_token()?;
    let Token::Ident(type_name) = type_tok else {
        return Err(UdmError::ascii_syntax(line, column, "expected an array value type"));
    };
    let value_type = Type::from_ascii_name(&type_name)
        .ok_or_else(|| UdmError::ascii_syntax(line, column, format!("unknown array value type {type_name:?}")))?;
    expect_symbol(t, ';')?;
    let (size_tok, l2, c2) = t.next_token()?;
    let Token::Ident(size_str) = size_tok else {
        return Err(UdmError::ascii_syntax(l2, c2, "expected an array size"));
    };
    let size: usize = size_str
        .parse()
        .map_err(|_| UdmError::ascii_data(l2, c2, format!("invalid array size {size_str:?}")))?;
    let mut is_lz4 = false;
    let (peeked, ..) = t.peek_token()?;
    if peeked == Token::Symbol(';') {
        t.next_token()?;
        let (marker_tok, l3, c3) = t.next_token()?;
        let Token::Ident(marker) = marker_tok else {
            return Err(UdmError::ascii_syntax(l3, c3, "expected 'lz4' array header marker"));
        };
        if marker != "lz4" {
            return Err(UdmError::ascii_syntax(l3, c3, format!("unknown array header marker {marker:?}")));
        }
        is_lz4 = true;
    }
    expect_symbol(t, ']')?;
    Ok((value_type, size, is_lz4))
}

fn parse_array_value(t: &mut Tokenizer) -> Result<Value> {
    let (value_type, _advisory_size, is_lz4) = parse_array_header(t)?;
    expect_symbol(t, '[')?;
    let mut array = Array::new(value_type);
    let (peeked, ..) = t.peek_token()?;
    if peeked != Token::Symbol(']') {
        loop {
            if value_type == Type::Struct {
                return Err(UdmError::invalid_usage("struct-valued array has no ascii literal form"));
            } else if value_type == Type::Element {
                expect_symbol(t, '{')?;
                let element = parse_element_entries(t)?;
                expect_symbol(t, '}')?;
                array.push_property(Property::new(Value::Element(element)))?;
            } else if value_type.is_trivial() {
                array.push_trivial(parse_value(t, value_type)?)?;
            } else {
                array.push_property(Property::new(parse_value(t, value_type)?))?;
            }
            let (next, ..) = t.peek_token()?;
            if next == Token::Symbol(',') {
                t.next_token()?;
            } else {
                break;
            }
        }
    }
    expect_symbol(t, ']')?;
    if is_lz4 {
        Ok(Value::ArrayLz4(array_to_array_lz4(array)?))
    } else {
        Ok(Value::Array(array))
    }
}

fn array_to_array_lz4(array: Array) -> Result<ArrayLz4> {
    let mut out = ArrayLz4::new(array.value_type());
    if let Some(_bytes) = array.trivial_bytes() {
        for i in 0..array.len() {
            out.push_trivial(array.get_trivial(i)?)?;
        }
    } else {
        for property in array.iter_properties() {
            out.push_property(property.clone())?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_typed_entries() {
        let element = parse_document(r#"$int32 x 5 $string name "hi""#).unwrap();
        assert_eq!(element.get("x").unwrap().as_i32().unwrap(), 5);
        assert_eq!(element.get("name").unwrap().as_string().unwrap(), "hi");
    }

    #[test]
    fn parses_nested_element() {
        let element = parse_document("child { $int32 a 1 }").unwrap();
        let child = element.get("child").unwrap().as_element().unwrap();
        assert_eq!(child.get("a").unwrap().as_i32().unwrap(), 1);
    }

    #[test]
    fn quaternion_applies_wxyz_to_xyzw_permutation() {
        let element = parse_document("$quat q [1, 2, 3, 4]").unwrap();
        let Value::Quat(q) = element.get("q").unwrap().value() else {
            panic!("expected quat");
        };
        assert_eq!(q.to_xyzw(), [2.0, 3.0, 4.0, 1.0]);
    }

    #[test]
    fn parses_trivial_array() {
        let element = parse_document("$array items [int32;3][1,2,3]").unwrap();
        let array = element.get("items").unwrap().as_array().unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array.get_trivial(1).unwrap(), Value::I32(2));
    }

    #[test]
    fn parses_lz4_marker_into_array_lz4() {
        let element = parse_document("$array items [int32;2;lz4][7,8]").unwrap();
        let property = element.get("items").unwrap();
        let array = property.as_array_lz4().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array.get_trivial(0).unwrap(), Value::I32(7));
    }

    #[test]
    fn skips_comments_between_entries() {
        let element = parse_document("// leading\n$int32 x 1 /* mid */ $int32 y 2").unwrap();
        assert_eq!(element.get("x").unwrap().as_i32().unwrap(), 1);
        assert_eq!(element.get("y").unwrap().as_i32().unwrap(), 2);
    }
}
