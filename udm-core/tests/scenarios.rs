//! Integration coverage for the concrete round-trip scenarios: one test per
//! scenario, named after what it exercises.

use std::io::Cursor;

use udm_core::array_lz4::ArrayLz4;
use udm_core::ascii::reader::parse_document;
use udm_core::ascii::writer::write_element_body;
use udm_core::ascii::AsciiWriterFlags;
use udm_core::conversion::convert;
use udm_core::hash::hash_value;
use udm_core::reference::Reference;
use udm_core::value::{Quat, Value};
use udm_core::{Data, Element, Property, Type};

#[test]
fn round_trip_primitives_binary_and_ascii() {
    let mut data = Data::create("test_asset", 1);
    {
        let asset_data = data.asset_data_mut().unwrap();
        asset_data.add("a", Type::I32).unwrap().assign(Value::I32(7)).unwrap();
        asset_data.add("b", Type::F32).unwrap().assign(Value::F32(1.5)).unwrap();
        asset_data
            .add("c", Type::String)
            .unwrap()
            .assign(Value::String("hi".to_string()))
            .unwrap();
    }

    let mut binary = Vec::new();
    data.save(&mut binary).unwrap();
    let reloaded = Data::load(Cursor::new(binary)).unwrap();
    assert!(data.data_eq(&reloaded).unwrap());

    let mut ascii = Vec::new();
    data.save_ascii(&mut ascii, AsciiWriterFlags::INCLUDE_HEADER).unwrap();
    let reloaded_ascii = Data::load(Cursor::new(ascii)).unwrap();
    assert!(data.data_eq(&reloaded_ascii).unwrap());
}

#[test]
fn quaternion_ascii_literal_is_in_wxyz_order() {
    let element = parse_document("$quat q [1,2,3,4]").unwrap();
    let q = element.get("q").unwrap().value();
    assert_eq!(q, &Value::Quat(Quat::from_wxyz(1.0, 2.0, 3.0, 4.0)));
    match q {
        Value::Quat(q) => {
            let xyzw = q.to_xyzw();
            assert_eq!(xyzw, [2.0, 3.0, 4.0, 1.0]);
        }
        _ => unreachable!(),
    }

    let mut out = String::new();
    write_element_body(&element, &mut out, 0).unwrap();
    assert_eq!(out, "$quat q [1,2,3,4]\n");
}

#[test]
fn lz4_array_round_trips_and_stays_small() {
    let mut array = ArrayLz4::new(Type::F32);
    for i in 0..100 {
        array.push_trivial(Value::F32(i as f32)).unwrap();
    }
    let (compressed, _) = array.compressed_for_write().unwrap();
    assert!(compressed.len() <= 400, "compressed size {} exceeds raw size", compressed.len());

    let mut data = Data::create("test_asset", 1);
    data.asset_data_mut()
        .unwrap()
        .insert("values", Property::new(Value::ArrayLz4(array)));

    let mut buf = Vec::new();
    data.save(&mut buf).unwrap();
    let mut reloaded = Data::load(Cursor::new(buf)).unwrap();

    let property = reloaded.load_property("values").unwrap();
    let reloaded_array = property.as_array_lz4().unwrap();
    for i in 0..100 {
        assert_eq!(reloaded_array.get_trivial(i).unwrap(), Value::F32(i as f32));
    }
}

#[test]
fn skip_scan_locates_a_deeply_nested_sibling() {
    let mut data = Data::create("test_asset", 1);
    {
        let asset_data = data.asset_data_mut().unwrap();
        for i in 0..50 {
            if i == 36 {
                asset_data
                    .add("target/x", Type::I32)
                    .unwrap()
                    .assign(Value::I32(123))
                    .unwrap();
            } else {
                asset_data
                    .add(&format!("sibling_{i}"), Type::I32)
                    .unwrap()
                    .assign(Value::I32(i as i32))
                    .unwrap();
            }
        }
    }
    let mut buf = Vec::new();
    data.save(&mut buf).unwrap();

    let mut opened = Data::open(Cursor::new(buf)).unwrap();
    let property = opened.load_property("target/x").unwrap();
    assert_eq!(property.as_i32().unwrap(), 123);
}

#[test]
fn path_assignment_materializes_intermediate_elements() {
    let mut root = Element::new();
    root.add("a/b/c", Type::U32).unwrap().assign(Value::U32(5)).unwrap();

    let a = root.get("a").unwrap().as_element().unwrap();
    let b = a.get("b").unwrap().as_element().unwrap();
    let c = b.get("c").unwrap();
    assert_eq!(c.value(), &Value::U32(5));
}

#[test]
fn conversion_matrix_string_to_vec3_and_srgba_round_trip() {
    let v = convert(&Value::String(" 1 2 3 ".to_string()), Type::Vec3).unwrap();
    assert_eq!(
        v,
        Value::Vec3(udm_core::value::Vec3 { x: 1.0, y: 2.0, z: 3.0 })
    );

    let srgba = convert(
        &Value::Vec3(udm_core::value::Vec3 { x: 1.0, y: 0.5, z: 0.0 }),
        Type::Srgba,
    )
    .unwrap();
    assert_eq!(srgba, Value::Srgba(udm_core::value::Srgba([255, 128, 0, 0])));

    let back = convert(&srgba, Type::Vec3).unwrap();
    match back {
        Value::Vec3(v) => {
            assert_eq!(v.x, 1.0);
            assert!((v.y - 128.0 / 255.0).abs() < 1e-6);
            assert_eq!(v.z, 0.0);
        }
        _ => unreachable!(),
    }
}

#[test]
fn reference_resolves_against_asset_data_after_load() {
    let mut data = Data::create("test_asset", 1);
    {
        let asset_data = data.asset_data_mut().unwrap();
        asset_data.add("foo/x", Type::I32).unwrap().assign(Value::I32(9)).unwrap();
        asset_data.insert("ref", Property::new(Value::Reference(Reference::new("foo/x"))));
    }
    let mut buf = Vec::new();
    data.save(&mut buf).unwrap();

    let reloaded = Data::load(Cursor::new(buf)).unwrap();
    let asset_data = reloaded.asset_data().unwrap();
    let reference = asset_data.get("ref").unwrap().as_reference().unwrap();
    assert!(reference.is_resolved());

    let target = asset_data.get_from_path(reference.path()).unwrap();
    assert_eq!(target.as_i32().unwrap(), 9);
}

#[test]
fn hash_is_stable_under_child_reordering() {
    let mut a = Element::new();
    a.add("alpha", Type::I32).unwrap().assign(Value::I32(1)).unwrap();
    a.add("beta", Type::I32).unwrap().assign(Value::I32(2)).unwrap();

    let mut b = Element::new();
    b.add("beta", Type::I32).unwrap().assign(Value::I32(2)).unwrap();
    b.add("alpha", Type::I32).unwrap().assign(Value::I32(1)).unwrap();

    assert_eq!(
        hash_value(&Value::Element(a)).unwrap(),
        hash_value(&Value::Element(b)).unwrap()
    );
}
