//! Struct & StructDescription (spec.md §3, §4.4): a fixed-layout tuple used
//! as the payload kind for packed-record arrays.

use udm_types::Type;

use crate::error::{Result, UdmError};

/// Ordered member types + parallel member names of a [`Struct`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructDescription {
    member_types: Vec<Type>,
    member_names: Vec<String>,
}

impl StructDescription {
    pub fn new(members: Vec<(String, Type)>) -> Result<Self> {
        let mut member_types = Vec::with_capacity(members.len());
        let mut member_names = Vec::with_capacity(members.len());
        for (name, ty) in members {
            if ty.size_of().is_err() {
                return Err(UdmError::invalid_usage(format!(
                    "struct member {name:?} has non-fixed-size type {ty:?}"
                )));
            }
            member_types.push(ty);
            member_names.push(name);
        }
        Ok(StructDescription {
            member_types,
            member_names,
        })
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, Type)> {
        self.member_names
            .iter()
            .map(String::as_str)
            .zip(self.member_types.iter().copied())
    }

    pub fn member_count(&self) -> usize {
        self.member_types.len()
    }

    /// `Σ size_of(member_type_i)` — the exact byte length a [`Struct`]'s
    /// data buffer must have to satisfy this description (spec.md invariant
    /// 4).
    pub fn data_size_requirement(&self) -> usize {
        self.member_types
            .iter()
            .map(|t| t.size_of().expect("validated at construction"))
            .sum()
    }

    /// Byte offset of member `index` within a buffer matching this
    /// description.
    pub fn member_offset(&self, index: usize) -> Option<usize> {
        if index >= self.member_types.len() {
            return None;
        }
        Some(
            self.member_types[..index]
                .iter()
                .map(|t| t.size_of().expect("validated at construction"))
                .sum(),
        )
    }
}

/// A fixed-layout tuple: a [`StructDescription`] plus a byte buffer of
/// exactly `description.data_size_requirement()` bytes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Struct {
    description: StructDescription,
    data: Vec<u8>,
}

impl Struct {
    pub fn empty() -> Self {
        Struct {
            description: StructDescription::default(),
            data: Vec::new(),
        }
    }

    pub fn new(description: StructDescription, data: Vec<u8>) -> Result<Self> {
        if data.len() != description.data_size_requirement() {
            return Err(UdmError::invalid_usage(format!(
                "struct data is {} bytes, description requires {}",
                data.len(),
                description.data_size_requirement()
            )));
        }
        Ok(Struct { description, data })
    }

    pub fn description(&self) -> &StructDescription {
        &self.description
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// `assign(raw, size)`: copy `raw` into `data`, provided `size` matches
    /// the description's required size (spec.md §4.4).
    pub fn assign(&mut self, raw: &[u8]) -> Result<()> {
        if raw.len() != self.description.data_size_requirement() {
            return Err(UdmError::invalid_usage(format!(
                "assigning {} bytes to struct requiring {}",
                raw.len(),
                self.description.data_size_requirement()
            )));
        }
        self.data.clear();
        self.data.extend_from_slice(raw);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.description = StructDescription::default();
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_size_requirement_sums_member_sizes() {
        let desc = StructDescription::new(vec![
            ("a".into(), Type::I32),
            ("b".into(), Type::F32),
            ("c".into(), Type::Vec3),
        ])
        .unwrap();
        assert_eq!(desc.data_size_requirement(), 4 + 4 + 12);
        assert_eq!(desc.member_offset(0), Some(0));
        assert_eq!(desc.member_offset(1), Some(4));
        assert_eq!(desc.member_offset(2), Some(8));
    }

    #[test]
    fn assign_rejects_wrong_size() {
        let desc = StructDescription::new(vec![("a".into(), Type::I32)]).unwrap();
        let mut s = Struct::new(desc, vec![0; 4]).unwrap();
        assert!(s.assign(&[1, 2, 3]).is_err());
        assert!(s.assign(&[1, 2, 3, 4]).is_ok());
    }

    #[test]
    fn rejects_non_fixed_size_members() {
        assert!(StructDescription::new(vec![("a".into(), Type::String)]).is_err());
    }
}
