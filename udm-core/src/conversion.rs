//! Conversion matrix (spec.md §4.2, C2): pairwise `(From, To)` coercion
//! rules used by [`crate::property::Property::assign`], `to_value`, and the
//! ASCII value parser.
//!
//! Grounded in the same "narrow exhaustive match, explicit error on the
//! unhandled pairs" shape `apfs_core::block`'s own format-negotiation
//! matches use, generalized here to a full pairwise table.

use udm_types::Type;

use crate::error::{Result, UdmError};
use crate::value::{Hdr, Mat3x4, Mat4, Quat, Srgba, Stransform, Transform, Value, Vec2, Vec2i, Vec3, Vec3i, Vec4, Vec4i};

/// `is_convertible(from, to)`: true iff [`convert`] has a defined rule for
/// this pair. Same-kind pairs are always convertible (identity).
pub fn is_convertible(from: Type, to: Type) -> bool {
    if from == to {
        return true;
    }
    use Type::*;
    match (from, to) {
        (f, t) if f.is_numeric() && t.is_numeric() => true,
        (Bool, t) if t.is_numeric() => true,
        (f, Bool) if f.is_numeric() => true,

        (Vec2, Vec2) | (Vec3, Vec3) | (Vec4, Vec4) => true,
        (Vec2i, Vec2i) | (Vec3i, Vec3i) | (Vec4i, Vec4i) => true,
        (Vec2, Vec2i) | (Vec2i, Vec2) => true,
        (Vec3, Vec3i) | (Vec3i, Vec3) => true,
        (Vec4, Vec4i) | (Vec4i, Vec4) => true,
        (Euler, Euler) | (Euler, Vec3) | (Vec3, Euler) => true,

        (Euler, Quat) | (Euler, Transform) | (Euler, Mat4) | (Euler, Mat3x4) => true,
        (Transform, Mat4) | (Transform, Mat3x4) => true,
        (Stransform, Mat4) | (Stransform, Mat3x4) => true,

        (Vec3, Srgba) | (Srgba, Vec3) => true,
        (Vec3, Hdr) | (Hdr, Vec3) => true,
        (Vec4, Srgba) | (Srgba, Vec4) => true,
        (Vec4, Hdr) | (Hdr, Vec4) => true,
        (Srgba, Hdr) => true,

        (_, String) => true,
        // Only the component-vector kinds have a defined whitespace-separated
        // grammar (spec.md §4.2); quat/transform/matrix/color kinds have no
        // string form, so they're left out of `is_generic()`'s broader set.
        (String, t)
            if t.is_numeric()
                || matches!(
                    t,
                    Vec2 | Vec3 | Vec4 | Vec2i | Vec3i | Vec4i | Euler
                )
                || t == String
                || t == Utf8 =>
        {
            true
        }

        _ => false,
    }
}

/// `convert(value, to)`: apply the matching rule from [`is_convertible`], or
/// fail with `InvalidUsage` if the pair has no rule.
pub fn convert(value: &Value, to: Type) -> Result<Value> {
    if value.kind() == to {
        return Ok(value.clone());
    }
    if !is_convertible(value.kind(), to) {
        return Err(UdmError::invalid_usage(format!(
            "no conversion from {:?} to {to:?}",
            value.kind()
        )));
    }

    use Type::*;
    match to {
        t if t.is_numeric() => convert_to_numeric(value, t),
        Bool => Ok(Value::Bool(as_f64(value)? != 0.0)),

        Vec2 => Ok(Value::Vec2(convert_vec2(value)?)),
        Vec3 => Ok(Value::Vec3(convert_vec3(value)?)),
        Vec4 => Ok(Value::Vec4(convert_vec4(value)?)),
        Vec2i => {
            let v = convert_vec2(value)?;
            Ok(Value::Vec2i(Vec2i {
                x: v.x as i32,
                y: v.y as i32,
            }))
        }
        Vec3i => {
            let v = convert_vec3(value)?;
            Ok(Value::Vec3i(Vec3i {
                x: v.x as i32,
                y: v.y as i32,
                z: v.z as i32,
            }))
        }
        Vec4i => {
            let v = convert_vec4(value)?;
            Ok(Value::Vec4i(Vec4i {
                x: v.x as i32,
                y: v.y as i32,
                z: v.z as i32,
                w: v.w as i32,
            }))
        }
        Euler => Ok(Value::Euler(convert_vec3(value)?)),

        Quat => match value {
            Value::Euler(e) => Ok(Value::Quat(euler_to_quat(e))),
            _ => unreachable!(),
        },
        Transform => match value {
            Value::Euler(e) => Ok(Value::Transform(Transform {
                position: Vec3::default(),
                rotation: euler_to_quat(e),
            })),
            _ => unreachable!(),
        },
        Mat4 => match value {
            Value::Euler(e) => Ok(Value::Mat4(euler_to_mat4(e))),
            Value::Transform(t) => Ok(Value::Mat4(transform_to_mat4(t))),
            Value::Stransform(s) => Ok(Value::Mat4(stransform_to_mat4(s))),
            _ => unreachable!(),
        },
        Mat3x4 => match value {
            Value::Euler(e) => Ok(Value::Mat3x4(euler_to_mat3x4(e))),
            Value::Transform(t) => Ok(Value::Mat3x4(transform_to_mat3x4(t))),
            Value::Stransform(s) => Ok(Value::Mat3x4(stransform_to_mat3x4(s))),
            _ => unreachable!(),
        },

        Srgba => match value {
            // The 3-component source has no alpha channel to carry over, so
            // the 4th byte is left at zero rather than defaulted to opaque.
            Value::Vec3(v) => Ok(Value::Srgba(Srgba([
                to_u8_saturating(v.x),
                to_u8_saturating(v.y),
                to_u8_saturating(v.z),
                0,
            ]))),
            Value::Vec4(v) => Ok(Value::Srgba(Srgba([
                to_u8_saturating(v.x),
                to_u8_saturating(v.y),
                to_u8_saturating(v.z),
                to_u8_saturating(v.w),
            ]))),
            _ => unreachable!(),
        },
        Hdr => match value {
            Value::Vec3(v) => Ok(Value::Hdr(Hdr([
                to_u16_saturating(v.x),
                to_u16_saturating(v.y),
                to_u16_saturating(v.z),
            ]))),
            Value::Vec4(v) => Ok(Value::Hdr(Hdr([
                to_u16_saturating(v.x),
                to_u16_saturating(v.y),
                to_u16_saturating(v.z),
            ]))),
            // Straight byte copy, no rescaling: an srgba channel is already
            // 0..255, the same range an hdr channel's low byte covers.
            Value::Srgba(s) => Ok(Value::Hdr(Hdr([s.0[0] as u16, s.0[1] as u16, s.0[2] as u16]))),
            _ => unreachable!(),
        },

        String => Ok(Value::String(to_ascii_string(value))),
        Utf8 => {
            let s = as_string(value)?;
            let mut bytes = s.into_bytes();
            bytes.push(0);
            Ok(Value::Utf8(bytes))
        }

        _ => unreachable!("is_convertible admitted an unhandled target {to:?}"),
    }
}

fn to_u8_saturating(component: f32) -> u8 {
    (component * 255.0).round().clamp(0.0, 255.0) as u8
}

fn to_u16_saturating(component: f32) -> u16 {
    (component * 255.0).round().clamp(0.0, u16::MAX as f32) as u16
}

fn as_f64(value: &Value) -> Result<f64> {
    Ok(match value {
        Value::I8(v) => *v as f64,
        Value::U8(v) => *v as f64,
        Value::I16(v) => *v as f64,
        Value::U16(v) => *v as f64,
        Value::I32(v) => *v as f64,
        Value::U32(v) => *v as f64,
        Value::I64(v) => *v as f64,
        Value::U64(v) => *v as f64,
        Value::F32(v) => *v as f64,
        Value::F64(v) => *v,
        Value::Bool(v) => {
            if *v {
                1.0
            } else {
                0.0
            }
        }
        Value::Half(v) => v.to_f64(),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            UdmError::invalid_usage(format!("{s:?} does not parse as a number"))
        })?,
        other => {
            return Err(UdmError::invalid_usage(format!(
                "{:?} is not numeric",
                other.kind()
            )))
        }
    })
}

fn convert_to_numeric(value: &Value, to: Type) -> Result<Value> {
    let f = as_f64(value)?;
    Ok(match to {
        Type::I8 => Value::I8(f as i8),
        Type::U8 => Value::U8(f as u8),
        Type::I16 => Value::I16(f as i16),
        Type::U16 => Value::U16(f as u16),
        Type::I32 => Value::I32(f as i32),
        Type::U32 => Value::U32(f as u32),
        Type::I64 => Value::I64(f as i64),
        Type::U64 => Value::U64(f as u64),
        Type::F32 => Value::F32(f as f32),
        Type::F64 => Value::F64(f),
        Type::Half => Value::Half(half::f16::from_f64(f)),
        other => unreachable!("{other:?} is not numeric"),
    })
}

fn parse_component_string(s: &str, n: usize) -> Result<Vec<f32>> {
    let parts: Vec<f32> = s
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f32>()
                .map_err(|_| UdmError::invalid_usage(format!("{tok:?} does not parse as a number")))
        })
        .collect::<Result<_>>()?;
    if parts.len() != n {
        return Err(UdmError::invalid_usage(format!(
            "expected {n} whitespace-separated components, found {}",
            parts.len()
        )));
    }
    Ok(parts)
}

fn convert_vec2(value: &Value) -> Result<Vec2> {
    match value {
        Value::Vec2(v) => Ok(*v),
        Value::Vec2i(v) => Ok(Vec2 {
            x: v.x as f32,
            y: v.y as f32,
        }),
        Value::String(s) => {
            let c = parse_component_string(s, 2)?;
            Ok(Vec2 { x: c[0], y: c[1] })
        }
        other => Err(UdmError::invalid_usage(format!(
            "{:?} has no 2-component form",
            other.kind()
        ))),
    }
}

fn convert_vec3(value: &Value) -> Result<Vec3> {
    match value {
        Value::Vec3(v) => Ok(*v),
        Value::Euler(v) => Ok(*v),
        Value::Vec3i(v) => Ok(Vec3 {
            x: v.x as f32,
            y: v.y as f32,
            z: v.z as f32,
        }),
        Value::Srgba(s) => Ok(Vec3 {
            x: s.0[0] as f32 / 255.0,
            y: s.0[1] as f32 / 255.0,
            z: s.0[2] as f32 / 255.0,
        }),
        Value::Hdr(h) => Ok(Vec3 {
            x: h.0[0] as f32 / 255.0,
            y: h.0[1] as f32 / 255.0,
            z: h.0[2] as f32 / 255.0,
        }),
        Value::String(s) => {
            let c = parse_component_string(s, 3)?;
            Ok(Vec3 {
                x: c[0],
                y: c[1],
                z: c[2],
            })
        }
        other => Err(UdmError::invalid_usage(format!(
            "{:?} has no 3-component form",
            other.kind()
        ))),
    }
}

fn convert_vec4(value: &Value) -> Result<Vec4> {
    match value {
        Value::Vec4(v) => Ok(*v),
        Value::Vec4i(v) => Ok(Vec4 {
            x: v.x as f32,
            y: v.y as f32,
            z: v.z as f32,
            w: v.w as f32,
        }),
        Value::Srgba(s) => Ok(Vec4 {
            x: s.0[0] as f32 / 255.0,
            y: s.0[1] as f32 / 255.0,
            z: s.0[2] as f32 / 255.0,
            w: s.0[3] as f32 / 255.0,
        }),
        // hdr carries no alpha channel; the spec's fill value is 1.0 (fully
        // opaque), not 0.0 as the 3-to-4-component Srgba conversion uses.
        Value::Hdr(h) => Ok(Vec4 {
            x: h.0[0] as f32 / 255.0,
            y: h.0[1] as f32 / 255.0,
            z: h.0[2] as f32 / 255.0,
            w: 1.0,
        }),
        Value::String(s) => {
            let c = parse_component_string(s, 4)?;
            Ok(Vec4 {
                x: c[0],
                y: c[1],
                z: c[2],
                w: c[3],
            })
        }
        other => Err(UdmError::invalid_usage(format!(
            "{:?} has no 4-component form",
            other.kind()
        ))),
    }
}

/// Euler (pitch, yaw, roll, radians) to quaternion, ZYX intrinsic order.
fn euler_to_quat(e: &Vec3) -> Quat {
    let (sx, cx) = (e.x * 0.5).sin_cos();
    let (sy, cy) = (e.y * 0.5).sin_cos();
    let (sz, cz) = (e.z * 0.5).sin_cos();
    Quat::from_xyzw(
        sx * cy * cz - cx * sy * sz,
        cx * sy * cz + sx * cy * sz,
        cx * cy * sz - sx * sy * cz,
        cx * cy * cz + sx * sy * sz,
    )
}

fn quat_to_mat3x4_columns(q: &Quat, position: Vec3) -> [f32; 12] {
    let (x, y, z, w) = (q.x, q.y, q.z, q.w);
    let (x2, y2, z2) = (x + x, y + y, z + z);
    let (xx, xy, xz) = (x * x2, x * y2, x * z2);
    let (yy, yz, zz) = (y * y2, y * z2, z * z2);
    let (wx, wy, wz) = (w * x2, w * y2, w * z2);
    [
        1.0 - (yy + zz),
        xy + wz,
        xz - wy,
        position.x,
        xy - wz,
        1.0 - (xx + zz),
        yz + wx,
        position.y,
        xz + wy,
        yz - wx,
        1.0 - (xx + yy),
        position.z,
    ]
}

fn mat3x4_to_mat4(m: Mat3x4) -> Mat4 {
    let r = m.0;
    Mat4([
        r[0], r[1], r[2], 0.0, r[3], r[4], r[5], 0.0, r[6], r[7], r[8], 0.0, r[9], r[10], r[11], 1.0,
    ])
}

fn euler_to_mat3x4(e: &Vec3) -> Mat3x4 {
    Mat3x4(quat_to_mat3x4_columns(&euler_to_quat(e), Vec3::default()))
}

fn euler_to_mat4(e: &Vec3) -> Mat4 {
    mat3x4_to_mat4(euler_to_mat3x4(e))
}

pub fn transform_to_mat3x4(t: &Transform) -> Mat3x4 {
    Mat3x4(quat_to_mat3x4_columns(&t.rotation, t.position))
}

pub fn transform_to_mat4(t: &Transform) -> Mat4 {
    mat3x4_to_mat4(transform_to_mat3x4(t))
}

pub fn stransform_to_mat3x4(s: &Stransform) -> Mat3x4 {
    let mut cols = quat_to_mat3x4_columns(&s.rotation, s.position);
    cols[0] *= s.scale.x;
    cols[4] *= s.scale.x;
    cols[8] *= s.scale.x;
    cols[1] *= s.scale.y;
    cols[5] *= s.scale.y;
    cols[9] *= s.scale.y;
    cols[2] *= s.scale.z;
    cols[6] *= s.scale.z;
    cols[10] *= s.scale.z;
    Mat3x4(cols)
}

pub fn stransform_to_mat4(s: &Stransform) -> Mat4 {
    mat3x4_to_mat4(stransform_to_mat3x4(s))
}

fn as_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Ok(to_ascii_string(other)),
    }
}

/// Printed form used by `(_, String)` conversions (spec.md §4.2): space
/// separated components, bracketed nesting for Transform/Stransform/mats.
/// Quaternions print in ASCII order `(w, x, y, z)`.
fn to_ascii_string(value: &Value) -> String {
    match value {
        Value::I8(v) => v.to_string(),
        Value::U8(v) => v.to_string(),
        Value::I16(v) => v.to_string(),
        Value::U16(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::U32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::F32(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Half(v) => v.to_f32().to_string(),
        Value::Vec2(v) => join_components(&v.components()),
        Value::Vec3(v) => join_components(&v.components()),
        Value::Vec4(v) => join_components(&v.components()),
        Value::Vec2i(v) => join_components_i(&v.components()),
        Value::Vec3i(v) => join_components_i(&v.components()),
        Value::Vec4i(v) => join_components_i(&v.components()),
        Value::Quat(v) => join_components(&v.to_wxyz()),
        Value::Euler(v) => join_components(&v.components()),
        Value::Srgba(v) => join_components_i(&v.0.map(|b| b as i32)),
        Value::Hdr(v) => join_components_i(&v.0.map(|c| c as i32)),
        Value::Transform(t) => format!(
            "[{}] [{}]",
            join_components(&t.position.components()),
            join_components(&t.rotation.to_wxyz())
        ),
        Value::Stransform(s) => format!(
            "[{}] [{}] [{}]",
            join_components(&s.position.components()),
            join_components(&s.rotation.to_wxyz()),
            join_components(&s.scale.components())
        ),
        Value::Mat4(m) => join_components(&m.0),
        Value::Mat3x4(m) => join_components(&m.0),
        Value::Nil => String::new(),
        Value::String(s) => s.clone(),
        Value::Utf8(bytes) => String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string(),
        other => format!("{:?}", other.kind()),
    }
}

fn join_components(c: &[f32]) -> String {
    c.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

fn join_components_i(c: &[i32]) -> String {
    c.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_widening_and_narrowing() {
        assert_eq!(convert(&Value::I32(5), Type::F64).unwrap(), Value::F64(5.0));
        assert_eq!(convert(&Value::F32(3.9), Type::I32).unwrap(), Value::I32(3));
    }

    #[test]
    fn bool_is_zero_nonzero() {
        assert_eq!(convert(&Value::I32(0), Type::Bool).unwrap(), Value::Bool(false));
        assert_eq!(convert(&Value::I32(7), Type::Bool).unwrap(), Value::Bool(true));
        assert_eq!(convert(&Value::Bool(true), Type::I32).unwrap(), Value::I32(1));
    }

    #[test]
    fn vec3_to_srgba_and_back() {
        let v = Vec3 { x: 1.0, y: 0.0, z: 0.5 };
        let srgba = convert(&Value::Vec3(v), Type::Srgba).unwrap();
        assert_eq!(srgba, Value::Srgba(Srgba([255, 0, 128, 0])));
    }

    #[test]
    fn string_round_trip_for_vec3() {
        let v = Value::Vec3(Vec3 { x: 1.0, y: 2.0, z: 3.0 });
        let s = convert(&v, Type::String).unwrap();
        assert_eq!(s, Value::String("1 2 3".to_string()));
    }

    #[test]
    fn vec3_to_hdr_scales_by_255() {
        let v = Vec3 { x: 1.0, y: 0.5, z: 0.0 };
        let hdr = convert(&Value::Vec3(v), Type::Hdr).unwrap();
        assert_eq!(hdr, Value::Hdr(Hdr([255, 128, 0])));
        let back = convert(&hdr, Type::Vec3).unwrap();
        match back {
            Value::Vec3(v) => {
                assert_eq!(v.x, 1.0);
                assert!((v.y - 128.0 / 255.0).abs() < 1e-6);
                assert_eq!(v.z, 0.0);
            }
            _ => panic!("expected Vec3"),
        }
    }

    #[test]
    fn srgba_to_hdr_is_a_byte_copy() {
        let srgba = Srgba([255, 128, 0, 64]);
        let hdr = convert(&Value::Srgba(srgba), Type::Hdr).unwrap();
        assert_eq!(hdr, Value::Hdr(Hdr([255, 128, 0])));
    }

    #[test]
    fn hdr_to_vec4_fills_alpha_with_one() {
        let hdr = Hdr([255, 128, 0]);
        let v = convert(&Value::Hdr(hdr), Type::Vec4).unwrap();
        match v {
            Value::Vec4(v) => {
                assert_eq!(v.x, 1.0);
                assert!((v.y - 128.0 / 255.0).abs() < 1e-6);
                assert_eq!(v.z, 0.0);
                assert_eq!(v.w, 1.0);
            }
            _ => panic!("expected Vec4"),
        }
    }

    #[test]
    fn vec3_parses_from_padded_whitespace_string() {
        let v = convert(&Value::String(" 1 2 3 ".to_string()), Type::Vec3).unwrap();
        assert_eq!(v, Value::Vec3(Vec3 { x: 1.0, y: 2.0, z: 3.0 }));
    }

    #[test]
    fn transform_converts_to_mat4() {
        let t = Transform {
            position: Vec3 { x: 1.0, y: 2.0, z: 3.0 },
            rotation: Quat::default(),
        };
        let m = convert(&Value::Transform(t), Type::Mat4).unwrap();
        match m {
            Value::Mat4(m) => {
                assert_eq!(m.0[12], 1.0);
                assert_eq!(m.0[13], 2.0);
                assert_eq!(m.0[14], 3.0);
            }
            _ => panic!("expected Mat4"),
        }
    }

    #[test]
    fn unrelated_pair_rejected() {
        assert!(!is_convertible(Type::Element, Type::I32));
        assert!(convert(&Value::Element(crate::element::Element::new()), Type::I32).is_err());
    }
}
