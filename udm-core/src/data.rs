//! Data (spec.md §4.8, C8): the document envelope — header, full load, lazy
//! open, and reference resolution (§4.9) on load.

use std::io::{Read, Seek, Write};

use udm_types::Type;

use crate::ascii::reader::parse_document;
use crate::ascii::writer::write_document as write_ascii_document;
use crate::ascii::AsciiWriterFlags;
use crate::binary::reader::{read_document, LazyReader};
use crate::binary::writer::write_document as write_binary_document;
use crate::binary::MAGIC;
use crate::element::Element;
use crate::error::{Result, UdmError};
use crate::property::Property;
use crate::value::Value;

/// Object-safe `Read + Seek`, so [`Data::open`] doesn't have to make the
/// whole struct generic over its source type.
trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

enum Source {
    /// Produced by [`Data::create`] and [`Data::load`]: the full tree is in
    /// memory and can be mutated, saved, or reference-resolved.
    Loaded(Property),
    /// Produced by [`Data::open`]: only the header scalars are materialized;
    /// everything under `assetData` is reached via [`Data::load_property`].
    Lazy {
        reader: LazyReader<Box<dyn ReadSeek>>,
        asset_type: String,
        asset_version: u32,
    },
}

/// Owns a `Header` and a root `Property` of kind `element` (spec.md §4.8).
pub struct Data {
    source: Source,
}

impl Data {
    /// `create(asset_type, version)`: a new document with the required
    /// root children and an empty `assetData`.
    pub fn create(asset_type: impl Into<String>, version: u32) -> Self {
        let mut root = Element::new();
        root.add("assetType", Type::String)
            .expect("literal path")
            .assign(Value::String(asset_type.into()))
            .expect("kind matches");
        root.add("assetVersion", Type::U32)
            .expect("literal path")
            .assign(Value::U32(version))
            .expect("kind matches");
        root.add("assetData", Type::Element).expect("literal path");
        Data {
            source: Source::Loaded(Property::new(Value::Element(root))),
        }
    }

    fn from_root(root: Property) -> Result<Self> {
        let mut data = Data {
            source: Source::Loaded(root),
        };
        data.validate_header_properties()?;
        Ok(data)
    }

    /// `load(source)`: format-sniff (binary identifier `UDMB` vs. ascii),
    /// full load, then run reference resolution (spec.md §4.8–§4.9).
    pub fn load<R: Read>(mut source: R) -> Result<Self> {
        let mut buf = Vec::new();
        source.read_to_end(&mut buf)?;
        let root = if buf.starts_with(&MAGIC) {
            log::debug!("sniffed binary udm document ({} bytes)", buf.len());
            read_document(&mut std::io::Cursor::new(buf))?
        } else {
            log::debug!("sniffed ascii udm document ({} bytes)", buf.len());
            let text = String::from_utf8(buf)
                .map_err(|e| UdmError::InvalidFormat(format!("not valid utf-8 or UDMB binary: {e}")))?;
            let outer = parse_document(&text)?;
            property_from_ascii_outer(outer)?
        };
        let mut data = Self::from_root(root)?;
        data.resolve_references()?;
        Ok(data)
    }

    /// `open(source)`: binary only, header-validated, keeps a seekable
    /// handle for lazy `load_property` queries (spec.md §4.8).
    pub fn open<R: Read + Seek + 'static>(source: R) -> Result<Self> {
        let boxed: Box<dyn ReadSeek> = Box::new(source);
        let mut reader = LazyReader::open(boxed)?;
        reader.validate_header_properties()?;
        let asset_type = reader.load_root_property("assetType")?.as_string()?.to_string();
        let asset_version = match reader.load_root_property("assetVersion")?.value() {
            Value::U32(v) => *v,
            other => return Err(UdmError::type_mismatch(Type::U32, other.kind())),
        };
        Ok(Data {
            source: Source::Lazy {
                reader,
                asset_type,
                asset_version,
            },
        })
    }

    pub fn asset_type(&self) -> Result<String> {
        match &self.source {
            Source::Loaded(root) => Ok(root
                .as_element()?
                .get("assetType")
                .ok_or_else(|| UdmError::InvalidFormat("missing assetType".into()))?
                .as_string()?
                .to_string()),
            Source::Lazy { asset_type, .. } => Ok(asset_type.clone()),
        }
    }

    pub fn asset_version(&self) -> Result<u32> {
        match &self.source {
            Source::Loaded(root) => {
                let property = root
                    .as_element()?
                    .get("assetVersion")
                    .ok_or_else(|| UdmError::InvalidFormat("missing assetVersion".into()))?;
                match property.value() {
                    Value::U32(v) => Ok(*v),
                    other => Err(UdmError::type_mismatch(Type::U32, other.kind())),
                }
            }
            Source::Lazy { asset_version, .. } => Ok(*asset_version),
        }
    }

    /// Only available once the document is fully loaded (created, or
    /// `load()`ed rather than `open()`ed).
    pub fn asset_data(&self) -> Result<&Element> {
        match &self.source {
            Source::Loaded(root) => root
                .as_element()?
                .get("assetData")
                .ok_or_else(|| UdmError::InvalidFormat("missing assetData".into()))?
                .as_element(),
            Source::Lazy { .. } => Err(UdmError::invalid_usage(
                "assetData is not materialized for a lazily opened document; use load_property instead",
            )),
        }
    }

    pub fn asset_data_mut(&mut self) -> Result<&mut Element> {
        match &mut self.source {
            Source::Loaded(root) => root
                .as_element_mut()?
                .get_mut("assetData")
                .ok_or_else(|| UdmError::InvalidFormat("missing assetData".into()))?
                .as_element_mut(),
            Source::Lazy { .. } => Err(UdmError::invalid_usage(
                "assetData is not materialized for a lazily opened document",
            )),
        }
    }

    /// `validate_header_properties()`: root must contain `assetType:
    /// string`, `assetVersion: u32`, `assetData: element` (spec.md §4.8).
    pub fn validate_header_properties(&mut self) -> Result<()> {
        match &mut self.source {
            Source::Loaded(root) => {
                let element = root.as_element()?;
                let ok = matches!(element.get("assetType").map(|p| p.kind()), Some(Type::String))
                    && matches!(element.get("assetVersion").map(|p| p.kind()), Some(Type::U32))
                    && matches!(element.get("assetData").map(|p| p.kind()), Some(Type::Element));
                if ok {
                    Ok(())
                } else {
                    Err(UdmError::InvalidFormat(
                        "root must contain assetType: string, assetVersion: u32, assetData: element".into(),
                    ))
                }
            }
            Source::Lazy { reader, .. } => reader.validate_header_properties(),
        }
    }

    /// `load_property(path)`: relative to `assetData`, in either mode
    /// (spec.md §4.8).
    pub fn load_property(&mut self, path: &str) -> Result<Property> {
        match &mut self.source {
            Source::Loaded(root) => root
                .as_element()?
                .get("assetData")
                .ok_or_else(|| UdmError::InvalidFormat("missing assetData".into()))?
                .as_element()?
                .get_from_path(path)
                .cloned()
                .ok_or_else(|| UdmError::PropertyLoad {
                    path: path.to_string(),
                    reason: "no such property".to_string(),
                }),
            Source::Lazy { reader, .. } => reader.load_property(path),
        }
    }

    /// `save(sink)`: binary (spec.md §4.8). Requires a fully loaded
    /// document.
    pub fn save<W: Write>(&self, sink: &mut W) -> Result<()> {
        let Source::Loaded(root) = &self.source else {
            return Err(UdmError::invalid_usage(
                "save requires a fully loaded document; load() or create() it first",
            ));
        };
        write_binary_document(sink, root)
    }

    /// `save_ascii(sink, flags)` (spec.md §4.8).
    pub fn save_ascii<W: Write>(&self, sink: &mut W, flags: AsciiWriterFlags) -> Result<()> {
        let Source::Loaded(root) = &self.source else {
            return Err(UdmError::invalid_usage(
                "save_ascii requires a fully loaded document; load() or create() it first",
            ));
        };
        let element = root.as_element()?;
        let asset_type = element.get("assetType").and_then(|p| p.as_string().ok()).unwrap_or_default();
        let asset_version = match element.get("assetVersion").map(|p| p.value()) {
            Some(Value::U32(v)) => *v,
            _ => 0,
        };
        let asset_data = element
            .get("assetData")
            .ok_or_else(|| UdmError::InvalidFormat("missing assetData".into()))?
            .as_element()?;
        let mut out = String::new();
        write_ascii_document(asset_type, asset_version, asset_data, flags, &mut out)?;
        sink.write_all(out.as_bytes())?;
        Ok(())
    }

    /// `asset_data == other.asset_data` (spec.md §4.8: header bytes not
    /// compared).
    pub fn data_eq(&self, other: &Data) -> Result<bool> {
        Ok(self.asset_data()? == other.asset_data()?)
    }

    /// Reference resolution (spec.md §4.9): walk `assetData`, and for each
    /// `Reference` call `get_from_path(ref.path)` against `assetData`'s own
    /// root, recording whether it resolved. Only meaningful on a fully
    /// loaded document.
    pub fn resolve_references(&mut self) -> Result<()> {
        match &mut self.source {
            Source::Loaded(root) => {
                let asset_data = root
                    .as_element_mut()?
                    .get_mut("assetData")
                    .ok_or_else(|| UdmError::InvalidFormat("missing assetData".into()))?
                    .as_element_mut()?;
                resolve_references_in_place(asset_data);
                Ok(())
            }
            Source::Lazy { .. } => Err(UdmError::invalid_usage(
                "reference resolution requires a fully loaded document; use load() instead of open()",
            )),
        }
    }
}

/// `parse_document` returns a flat top-level `Element` whose shape depends
/// on whether the source was written with `IncludeHeader`. Recognize the
/// header-wrapper shape by its three required children; otherwise the
/// parsed element IS `assetData`, and a fresh (empty) header is synthesized
/// around it.
fn property_from_ascii_outer(element: Element) -> Result<Property> {
    let looks_like_root = matches!(element.get("assetType").map(|p| p.kind()), Some(Type::String))
        && matches!(element.get("assetVersion").map(|p| p.kind()), Some(Type::U32))
        && matches!(element.get("assetData").map(|p| p.kind()), Some(Type::Element));
    if looks_like_root {
        Ok(Property::new(Value::Element(element)))
    } else {
        let mut root = Element::new();
        root.add("assetType", Type::String)?.assign(Value::String(String::new()))?;
        root.add("assetVersion", Type::U32)?.assign(Value::U32(0))?;
        root.insert("assetData", Property::new(Value::Element(element)));
        Ok(Property::new(Value::Element(root)))
    }
}

fn resolve_references_in_place(asset_data: &mut Element) {
    let snapshot = asset_data.clone();
    resolve_references_rec(asset_data, &snapshot);
}

fn resolve_references_rec(element: &mut Element, root_snapshot: &Element) {
    for (_key, property) in element.iter_mut() {
        resolve_in_property(property, root_snapshot);
    }
}

fn resolve_in_property(property: &mut Property, root_snapshot: &Element) {
    match property.value_mut() {
        Value::Reference(r) => {
            let found = root_snapshot.get_from_path(r.path()).is_some();
            if !found {
                log::warn!("unresolved reference at path {:?}", r.path());
            }
            r.set_resolved(found);
        }
        Value::Element(e) => resolve_references_rec(e, root_snapshot),
        Value::Array(a) => {
            if !a.is_trivial_storage() {
                for i in 0..a.len() {
                    if let Ok(p) = a.get_property_mut(i) {
                        resolve_in_property(p, root_snapshot);
                    }
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Reference;
    use std::io::Cursor;

    #[test]
    fn create_has_required_header_children() {
        let mut data = Data::create("mesh", 3);
        data.validate_header_properties().unwrap();
        assert_eq!(data.asset_type().unwrap(), "mesh");
        assert_eq!(data.asset_version().unwrap(), 3);
        assert_eq!(data.asset_data().unwrap().len(), 0);
    }

    #[test]
    fn binary_round_trip_through_save_and_load() {
        let mut data = Data::create("mesh", 1);
        data.asset_data_mut().unwrap().add("x", Type::I32).unwrap().assign(Value::I32(9)).unwrap();
        let mut buf = Vec::new();
        data.save(&mut buf).unwrap();

        let mut loaded = Data::load(Cursor::new(buf)).unwrap();
        assert_eq!(loaded.asset_type().unwrap(), "mesh");
        assert_eq!(loaded.load_property("x").unwrap().as_i32().unwrap(), 9);
    }

    #[test]
    fn ascii_round_trip_through_save_ascii_and_load() {
        let mut data = Data::create("mesh", 1);
        data.asset_data_mut().unwrap().add("name", Type::String).unwrap().assign(Value::String("abc".into())).unwrap();
        let mut buf = Vec::new();
        data.save_ascii(&mut buf, AsciiWriterFlags::empty()).unwrap();

        let mut loaded = Data::load(Cursor::new(buf)).unwrap();
        assert_eq!(loaded.load_property("name").unwrap().as_string().unwrap(), "abc");
    }

    #[test]
    fn open_supports_lazy_load_property() {
        let mut data = Data::create("mesh", 1);
        data.asset_data_mut()
            .unwrap()
            .add("nested/value", Type::I32)
            .unwrap()
            .assign(Value::I32(42))
            .unwrap();
        let mut buf = Vec::new();
        data.save(&mut buf).unwrap();

        let mut opened = Data::open(Cursor::new(buf)).unwrap();
        assert_eq!(opened.asset_type().unwrap(), "mesh");
        assert_eq!(opened.load_property("nested/value").unwrap().as_i32().unwrap(), 42);
        assert!(opened.asset_data().is_err());
    }

    #[test]
    fn reference_resolution_marks_resolved_and_unresolved() {
        let mut data = Data::create("mesh", 1);
        {
            let asset_data = data.asset_data_mut().unwrap();
            asset_data.add("foo/x", Type::I32).unwrap().assign(Value::I32(9)).unwrap();
            asset_data.insert("good_ref", Property::new(Value::Reference(Reference::new("foo/x"))));
            asset_data.insert("bad_ref", Property::new(Value::Reference(Reference::new("does/not/exist"))));
        }
        data.resolve_references().unwrap();
        let asset_data = data.asset_data().unwrap();
        assert!(asset_data.get("good_ref").unwrap().as_reference().unwrap().is_resolved());
        assert!(!asset_data.get("bad_ref").unwrap().as_reference().unwrap().is_resolved());
    }

    #[test]
    fn data_eq_compares_asset_data_only() {
        let mut a = Data::create("mesh", 1);
        a.asset_data_mut().unwrap().add("x", Type::I32).unwrap().assign(Value::I32(1)).unwrap();
        let mut b = Data::create("other_type", 99);
        b.asset_data_mut().unwrap().add("x", Type::I32).unwrap().assign(Value::I32(1)).unwrap();
        assert!(a.data_eq(&b).unwrap());
    }
}
