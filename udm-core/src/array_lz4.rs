//! ArrayLz4 (spec.md §3, §4.4): same logical contract as [`crate::array::Array`],
//! but the authoritative on-disk representation is an LZ4-compressed blob,
//! with a lazy decompress-on-first-access state machine.
//!
//! The decompressed buffer is a cache behind a [`RefCell`]: spec.md §5 calls
//! this out explicitly ("ArrayLz4's internal decompressed buffer is a cache
//! mutated by otherwise-`const` readers"), which is exactly the shape
//! `RefCell` exists for — a read-only `&self` accessor that still needs to
//! populate (and, unless `PersistentUncompressedData` is set, later evict) an
//! internal cache.

use std::cell::RefCell;
use std::io::Cursor;

use bytes::Bytes;
use udm_types::Type;

use crate::binary::body::{read_body, write_body};
use crate::error::{Result, UdmError};
use crate::lz4;
use crate::property::Property;
use crate::struct_::StructDescription;
use crate::value::Value;

#[derive(Debug, Clone)]
enum Payload {
    /// Numeric/generic trivial value types: raw little-endian bytes, stride
    /// `value_type.size_of_base()`.
    Trivial(Vec<u8>),
    /// `value_type == Struct`: packed records, stride
    /// `description.data_size_requirement()`.
    Struct(Vec<u8>),
    /// Any other non-trivial value type: fully materialized properties.
    Properties(Vec<Property>),
}

#[derive(Debug)]
pub struct ArrayLz4 {
    value_type: Type,
    struct_description: Option<StructDescription>,
    count: u32,
    persistent_uncompressed_data: bool,
    /// `None` when the in-memory payload has been mutated since the last
    /// compression (the "Decompressed-only" state).
    compressed: RefCell<Option<(Bytes, u64)>>,
    decompressed: RefCell<Option<Payload>>,
}

impl Clone for ArrayLz4 {
    fn clone(&self) -> Self {
        ArrayLz4 {
            value_type: self.value_type,
            struct_description: self.struct_description.clone(),
            count: self.count,
            persistent_uncompressed_data: self.persistent_uncompressed_data,
            compressed: RefCell::new(self.compressed.borrow().clone()),
            decompressed: RefCell::new(self.decompressed.borrow().clone()),
        }
    }
}

impl PartialEq for ArrayLz4 {
    fn eq(&self, other: &Self) -> bool {
        if self.value_type != other.value_type || self.count != other.count {
            return false;
        }
        match (self.snapshot(), other.snapshot()) {
            (Ok(a), Ok(b)) => payload_eq(&a, &b),
            _ => false,
        }
    }
}

fn payload_eq(a: &Payload, b: &Payload) -> bool {
    match (a, b) {
        (Payload::Trivial(x), Payload::Trivial(y)) => x == y,
        (Payload::Struct(x), Payload::Struct(y)) => x == y,
        (Payload::Properties(x), Payload::Properties(y)) => x == y,
        _ => false,
    }
}

impl ArrayLz4 {
    pub fn new(value_type: Type) -> Self {
        let payload = if value_type == Type::Struct {
            Payload::Struct(Vec::new())
        } else if value_type.is_trivial() {
            Payload::Trivial(Vec::new())
        } else {
            Payload::Properties(Vec::new())
        };
        ArrayLz4 {
            value_type,
            struct_description: if value_type == Type::Struct {
                Some(StructDescription::default())
            } else {
                None
            },
            count: 0,
            persistent_uncompressed_data: false,
            compressed: RefCell::new(None),
            decompressed: RefCell::new(Some(payload)),
        }
    }

    /// Construct directly from bytes read off disk (binary reader).
    pub fn from_compressed(
        value_type: Type,
        struct_description: Option<StructDescription>,
        compressed: Bytes,
        uncompressed_size: u64,
        count: u32,
    ) -> Self {
        ArrayLz4 {
            value_type,
            struct_description,
            count,
            persistent_uncompressed_data: false,
            compressed: RefCell::new(Some((compressed, uncompressed_size))),
            decompressed: RefCell::new(None),
        }
    }

    pub fn value_type(&self) -> Type {
        self.value_type
    }

    pub fn struct_description(&self) -> Option<&StructDescription> {
        self.struct_description.as_ref()
    }

    pub fn set_struct_description(&mut self, description: StructDescription) -> Result<()> {
        if self.value_type != Type::Struct {
            return Err(UdmError::invalid_usage(
                "struct description only applies to value_type = struct",
            ));
        }
        self.struct_description = Some(description);
        Ok(())
    }

    pub fn len(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn persistent_uncompressed_data(&self) -> bool {
        self.persistent_uncompressed_data
    }

    pub fn set_persistent_uncompressed_data(&mut self, value: bool) {
        self.persistent_uncompressed_data = value;
    }

    fn stride(&self) -> Result<usize> {
        if self.value_type == Type::Struct {
            Ok(self
                .struct_description
                .as_ref()
                .ok_or_else(|| UdmError::invalid_usage("struct array missing description"))?
                .data_size_requirement())
        } else {
            self.value_type
                .size_of_base()
                .map_err(|_| UdmError::invalid_usage("value type has no fixed stride"))
        }
    }

    /// Decompress (if needed) and run `f` against the payload, honoring the
    /// `PersistentUncompressedData` retention policy (spec.md §4.4/§5).
    fn with_decompressed<T>(&self, f: impl FnOnce(&Payload) -> Result<T>) -> Result<T> {
        self.ensure_decompressed()?;
        let guard = self.decompressed.borrow();
        let payload = guard.as_ref().expect("ensure_decompressed populated this");
        let result = f(payload)?;
        drop(guard);
        if !self.persistent_uncompressed_data && self.compressed.borrow().is_some() {
            // Only safe to evict the cache if we still have compressed bytes
            // to regenerate it from; otherwise this is the sole copy.
            *self.decompressed.borrow_mut() = None;
        }
        Ok(result)
    }

    fn ensure_decompressed(&self) -> Result<()> {
        if self.decompressed.borrow().is_some() {
            return Ok(());
        }
        let (compressed, uncompressed_size) = self
            .compressed
            .borrow()
            .clone()
            .ok_or_else(|| UdmError::logic("ArrayLz4 has neither compressed nor decompressed data"))?;
        let raw = lz4::decompress(&compressed, uncompressed_size as usize)?;
        let payload = Self::parse_payload(self.value_type, self.struct_description.as_ref(), self.count, &raw)?;
        *self.decompressed.borrow_mut() = Some(payload);
        Ok(())
    }

    fn parse_payload(
        value_type: Type,
        description: Option<&StructDescription>,
        count: u32,
        raw: &[u8],
    ) -> Result<Payload> {
        if value_type == Type::Struct {
            let desc = description
                .ok_or_else(|| UdmError::invalid_usage("struct array missing description"))?;
            let stride = desc.data_size_requirement();
            if raw.len() != stride * count as usize {
                return Err(UdmError::Compression(format!(
                    "struct array payload is {} bytes, expected {}",
                    raw.len(),
                    stride * count as usize
                )));
            }
            Ok(Payload::Struct(raw.to_vec()))
        } else if value_type.is_trivial() {
            Ok(Payload::Trivial(raw.to_vec()))
        } else {
            let mut cursor = Cursor::new(raw);
            let mut props = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let value = read_body(&mut cursor, value_type)?;
                props.push(Property::new(value));
            }
            Ok(Payload::Properties(props))
        }
    }

    fn flatten(payload: &Payload) -> Result<Vec<u8>> {
        match payload {
            Payload::Trivial(bytes) | Payload::Struct(bytes) => Ok(bytes.clone()),
            Payload::Properties(props) => {
                let mut buf = Vec::new();
                for p in props {
                    write_body(&mut buf, p.value())?;
                }
                Ok(buf)
            }
        }
    }

    /// Non-cached snapshot used by equality and hashing, so those never
    /// perturb the access-pattern-driven cache.
    fn snapshot(&self) -> Result<Payload> {
        if let Some(payload) = self.decompressed.borrow().as_ref() {
            return Ok(payload.clone());
        }
        let (compressed, uncompressed_size) = self
            .compressed
            .borrow()
            .clone()
            .ok_or_else(|| UdmError::logic("ArrayLz4 has neither compressed nor decompressed data"))?;
        let raw = lz4::decompress(&compressed, uncompressed_size as usize)?;
        Self::parse_payload(self.value_type, self.struct_description.as_ref(), self.count, &raw)
    }

    /// Authoritative compressed bytes for the binary writer and for hashing
    /// (spec.md §4.10: "hash the compressed blob bytes… a deliberate
    /// choice"). Re-compresses if the payload was mutated since the last
    /// compression.
    pub fn compressed_for_write(&self) -> Result<(Bytes, u64)> {
        if let Some((bytes, size)) = self.compressed.borrow().clone() {
            return Ok((bytes, size));
        }
        let payload = self
            .decompressed
            .borrow()
            .clone()
            .ok_or_else(|| UdmError::logic("ArrayLz4 has no payload to compress"))?;
        let flat = Self::flatten(&payload)?;
        let compressed = if flat.is_empty() {
            Bytes::new()
        } else {
            Bytes::from(lz4::compress(&flat)?)
        };
        let size = flat.len() as u64;
        *self.compressed.borrow_mut() = Some((compressed.clone(), size));
        Ok((compressed, size))
    }

    fn mark_dirty(&mut self) {
        *self.compressed.borrow_mut() = None;
    }

    pub fn get_trivial(&self, idx: usize) -> Result<Value> {
        self.with_decompressed(|payload| {
            let Payload::Trivial(bytes) = payload else {
                return Err(UdmError::invalid_usage("array_lz4 is not trivial-valued"));
            };
            let stride = self.stride()?;
            let start = idx * stride;
            let end = start + stride;
            if end > bytes.len() {
                return Err(UdmError::OutOfBounds {
                    index: idx,
                    size: self.count as usize,
                });
            }
            let mut cursor = Cursor::new(&bytes[start..end]);
            read_body(&mut cursor, self.value_type)
        })
    }

    pub fn get_struct_record(&self, idx: usize) -> Result<Vec<u8>> {
        self.with_decompressed(|payload| {
            let Payload::Struct(bytes) = payload else {
                return Err(UdmError::invalid_usage("array_lz4 is not struct-valued"));
            };
            let stride = self.stride()?;
            let start = idx * stride;
            let end = start + stride;
            if end > bytes.len() {
                return Err(UdmError::OutOfBounds {
                    index: idx,
                    size: self.count as usize,
                });
            }
            Ok(bytes[start..end].to_vec())
        })
    }

    pub fn get_property(&self, idx: usize) -> Result<Property> {
        self.with_decompressed(|payload| {
            let Payload::Properties(props) = payload else {
                return Err(UdmError::invalid_usage("array_lz4 does not hold properties"));
            };
            props
                .get(idx)
                .cloned()
                .ok_or(UdmError::OutOfBounds {
                    index: idx,
                    size: props.len(),
                })
        })
    }

    /// Decompress the entire array to a flat byte buffer (trivial/struct
    /// value types only). Used by the S3-style "decompress and compare to
    /// source" scenario.
    pub fn decompress_to_bytes(&self) -> Result<Vec<u8>> {
        let payload = self.snapshot()?;
        Self::flatten(&payload)
    }

    fn mutate_trivial(&mut self, f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> Result<()> {
        self.ensure_decompressed()?;
        {
            let mut guard = self.decompressed.borrow_mut();
            let Payload::Trivial(bytes) = guard.as_mut().expect("just ensured") else {
                return Err(UdmError::invalid_usage("array_lz4 is not trivial-valued"));
            };
            f(bytes)?;
        }
        self.mark_dirty();
        Ok(())
    }

    pub fn push_trivial(&mut self, value: Value) -> Result<()> {
        if value.kind() != self.value_type {
            return Err(UdmError::type_mismatch(self.value_type, value.kind()));
        }
        self.mutate_trivial(|bytes| write_body(bytes, &value))?;
        self.count += 1;
        Ok(())
    }

    pub fn set_trivial(&mut self, idx: usize, value: Value) -> Result<()> {
        if value.kind() != self.value_type {
            return Err(UdmError::type_mismatch(self.value_type, value.kind()));
        }
        let stride = self.stride()?;
        if idx >= self.count as usize {
            return Err(UdmError::OutOfBounds {
                index: idx,
                size: self.count as usize,
            });
        }
        self.mutate_trivial(|bytes| {
            let mut buf = Vec::with_capacity(stride);
            write_body(&mut buf, &value)?;
            bytes[idx * stride..idx * stride + stride].copy_from_slice(&buf);
            Ok(())
        })
    }

    pub fn resize(&mut self, new_size: u32) -> Result<()> {
        self.ensure_decompressed()?;
        {
            let mut guard = self.decompressed.borrow_mut();
            match guard.as_mut().expect("just ensured") {
                Payload::Trivial(bytes) | Payload::Struct(bytes) => {
                    let stride = self.stride()?;
                    bytes.resize(new_size as usize * stride, 0);
                }
                Payload::Properties(props) => {
                    props.resize_with(new_size as usize, || Property::create(self.value_type));
                }
            }
        }
        self.count = new_size;
        self.mark_dirty();
        Ok(())
    }

    pub fn push_property(&mut self, property: Property) -> Result<()> {
        if property.kind() != self.value_type {
            return Err(UdmError::type_mismatch(self.value_type, property.kind()));
        }
        self.ensure_decompressed()?;
        {
            let mut guard = self.decompressed.borrow_mut();
            let Payload::Properties(props) = guard.as_mut().expect("just ensured") else {
                return Err(UdmError::invalid_usage("array_lz4 does not hold properties"));
            };
            props.push(property);
        }
        self.count += 1;
        self.mark_dirty();
        Ok(())
    }
}
