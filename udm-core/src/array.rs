//! Array (spec.md §3, §4.4): a homogeneous sequence of a fixed `value_type`.
//! Contiguous bytes for trivial value types, a dense `Vec<Property>` for
//! non-trivial ones.

use std::io::Cursor;

use udm_types::Type;

use crate::binary::primitive::{read_trivial, write_trivial};
use crate::error::{Result, UdmError};
use crate::property::Property;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
enum Storage {
    Trivial(Vec<u8>),
    NonTrivial(Vec<Property>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    value_type: Type,
    storage: Storage,
}

impl Array {
    pub fn new(value_type: Type) -> Self {
        let storage = if value_type.is_trivial() {
            Storage::Trivial(Vec::new())
        } else {
            Storage::NonTrivial(Vec::new())
        };
        Array {
            value_type,
            storage,
        }
    }

    pub fn value_type(&self) -> Type {
        self.value_type
    }

    pub fn is_trivial_storage(&self) -> bool {
        matches!(self.storage, Storage::Trivial(_))
    }

    /// `set_value_type`: clears and re-initializes storage (spec.md §4.4).
    pub fn set_value_type(&mut self, value_type: Type) {
        self.value_type = value_type;
        self.storage = if value_type.is_trivial() {
            Storage::Trivial(Vec::new())
        } else {
            Storage::NonTrivial(Vec::new())
        };
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Trivial(bytes) => {
                let stride = self.value_type.size_of_base().unwrap_or(1).max(1);
                bytes.len() / stride
            }
            Storage::NonTrivial(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw trivial byte payload, used by the binary codec and by
    /// [`crate::property::Property::get_blob_data`].
    pub fn trivial_bytes(&self) -> Option<&[u8]> {
        match &self.storage {
            Storage::Trivial(bytes) => Some(bytes),
            Storage::NonTrivial(_) => None,
        }
    }

    pub fn non_trivial_values(&self) -> Option<&[Property]> {
        match &self.storage {
            Storage::Trivial(_) => None,
            Storage::NonTrivial(values) => Some(values),
        }
    }

    /// `resize(new_size)`: trivial kinds byte-copy then zero-fill the tail;
    /// non-trivial kinds move-construct existing and default-construct the
    /// tail.
    pub fn resize(&mut self, new_size: usize) {
        match &mut self.storage {
            Storage::Trivial(bytes) => {
                let stride = self.value_type.size_of_base().unwrap_or(1).max(1);
                bytes.resize(new_size * stride, 0);
            }
            Storage::NonTrivial(values) => {
                values.resize_with(new_size, || Property::create(self.value_type));
            }
        }
    }

    pub fn get_value_ptr(&self, idx: usize) -> Result<usize> {
        let stride = self
            .value_type
            .size_of_base()
            .map_err(|_| UdmError::invalid_usage("value type has no fixed stride"))?;
        Ok(idx * stride)
    }

    pub fn get_trivial(&self, idx: usize) -> Result<Value> {
        let Storage::Trivial(bytes) = &self.storage else {
            return Err(UdmError::invalid_usage("array does not use trivial storage"));
        };
        let stride = self.value_type.size_of_base().unwrap_or(1).max(1);
        let start = idx * stride;
        let end = start + stride;
        if end > bytes.len() {
            return Err(UdmError::OutOfBounds {
                index: idx,
                size: self.len(),
            });
        }
        let mut cursor = Cursor::new(&bytes[start..end]);
        read_trivial(self.value_type, &mut cursor)
    }

    pub fn set_trivial(&mut self, idx: usize, value: &Value) -> Result<()> {
        if value.kind() != self.value_type {
            return Err(UdmError::type_mismatch(self.value_type, value.kind()));
        }
        let stride = self.value_type.size_of_base().unwrap_or(1).max(1);
        let Storage::Trivial(bytes) = &mut self.storage else {
            return Err(UdmError::invalid_usage("array does not use trivial storage"));
        };
        let start = idx * stride;
        let end = start + stride;
        if end > bytes.len() {
            return Err(UdmError::OutOfBounds {
                index: idx,
                size: bytes.len() / stride,
            });
        }
        let mut buf = Vec::with_capacity(stride);
        write_trivial(&mut buf, value)?;
        bytes[start..end].copy_from_slice(&buf);
        Ok(())
    }

    pub fn get_property(&self, idx: usize) -> Result<&Property> {
        let Storage::NonTrivial(values) = &self.storage else {
            return Err(UdmError::invalid_usage("array does not use property storage"));
        };
        values.get(idx).ok_or(UdmError::OutOfBounds {
            index: idx,
            size: values.len(),
        })
    }

    pub fn get_property_mut(&mut self, idx: usize) -> Result<&mut Property> {
        let len = self.len();
        let Storage::NonTrivial(values) = &mut self.storage else {
            return Err(UdmError::invalid_usage("array does not use property storage"));
        };
        values.get_mut(idx).ok_or(UdmError::OutOfBounds { index: idx, size: len })
    }

    /// `insert_value(idx, v)`: shift contiguous storage.
    pub fn insert_value(&mut self, idx: usize, value: Value) -> Result<()> {
        if value.kind() != self.value_type {
            return Err(UdmError::type_mismatch(self.value_type, value.kind()));
        }
        match &mut self.storage {
            Storage::Trivial(bytes) => {
                let stride = self.value_type.size_of_base().unwrap_or(1).max(1);
                let at = idx * stride;
                if at > bytes.len() {
                    return Err(UdmError::OutOfBounds {
                        index: idx,
                        size: bytes.len() / stride,
                    });
                }
                let mut buf = Vec::with_capacity(stride);
                write_trivial(&mut buf, &value)?;
                bytes.splice(at..at, buf);
            }
            Storage::NonTrivial(values) => {
                if idx > values.len() {
                    return Err(UdmError::OutOfBounds {
                        index: idx,
                        size: values.len(),
                    });
                }
                values.insert(idx, Property::new(value));
            }
        }
        Ok(())
    }

    /// `remove_value(idx)`: shift contiguous storage.
    pub fn remove_value(&mut self, idx: usize) -> Result<()> {
        match &mut self.storage {
            Storage::Trivial(bytes) => {
                let stride = self.value_type.size_of_base().unwrap_or(1).max(1);
                let start = idx * stride;
                let end = start + stride;
                if end > bytes.len() {
                    return Err(UdmError::OutOfBounds {
                        index: idx,
                        size: bytes.len() / stride,
                    });
                }
                bytes.splice(start..end, std::iter::empty());
            }
            Storage::NonTrivial(values) => {
                if idx >= values.len() {
                    return Err(UdmError::OutOfBounds {
                        index: idx,
                        size: values.len(),
                    });
                }
                values.remove(idx);
            }
        }
        Ok(())
    }

    pub fn push_trivial(&mut self, value: Value) -> Result<()> {
        let len = self.len();
        self.insert_value(len, value)
    }

    pub fn push_property(&mut self, property: Property) -> Result<()> {
        if property.kind() != self.value_type {
            return Err(UdmError::type_mismatch(self.value_type, property.kind()));
        }
        match &mut self.storage {
            Storage::Trivial(_) => {
                Err(UdmError::invalid_usage("cannot push a Property onto a trivial array"))
            }
            Storage::NonTrivial(values) => {
                values.push(property);
                Ok(())
            }
        }
    }

    /// Iterate trivial values as decoded [`Value`]s.
    pub fn iter_trivial(&self) -> impl Iterator<Item = Result<Value>> + '_ {
        (0..self.len()).map(move |i| self.get_trivial(i))
    }

    pub fn iter_properties(&self) -> impl Iterator<Item = &Property> {
        self.non_trivial_values().into_iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_zero_fills_trivial_tail() {
        let mut arr = Array::new(Type::I32);
        arr.set_trivial_via_push(7);
        arr.resize(3);
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.get_trivial(0).unwrap(), Value::I32(7));
        assert_eq!(arr.get_trivial(1).unwrap(), Value::I32(0));
        assert_eq!(arr.get_trivial(2).unwrap(), Value::I32(0));
    }

    impl Array {
        fn set_trivial_via_push(&mut self, v: i32) {
            self.push_trivial(Value::I32(v)).unwrap();
        }
    }

    #[test]
    fn insert_and_remove_shift_storage() {
        let mut arr = Array::new(Type::U8);
        for v in [1u8, 2, 3] {
            arr.push_trivial(Value::U8(v)).unwrap();
        }
        arr.insert_value(1, Value::U8(9)).unwrap();
        assert_eq!(
            arr.iter_trivial().map(|v| v.unwrap()).collect::<Vec<_>>(),
            vec![Value::U8(1), Value::U8(9), Value::U8(2), Value::U8(3)]
        );
        arr.remove_value(0).unwrap();
        assert_eq!(
            arr.iter_trivial().map(|v| v.unwrap()).collect::<Vec<_>>(),
            vec![Value::U8(9), Value::U8(2), Value::U8(3)]
        );
    }

    #[test]
    fn get_value_ptr_is_index_times_stride() {
        let arr = Array::new(Type::Vec3);
        assert_eq!(arr.get_value_ptr(2).unwrap(), 24);
    }

    #[test]
    fn out_of_bounds_errors() {
        let arr = Array::new(Type::I32);
        assert!(matches!(
            arr.get_trivial(0),
            Err(UdmError::OutOfBounds { index: 0, size: 0 })
        ));
    }
}
