//! Stable content hash (spec.md §4.10, C10).
//!
//! Combine rule per 32-bit lane: `seed ^= h + 0x9e3779b9 + (seed << 6) +
//! (seed >> 2)` — the same "golden ratio" mixer `boost::hash_combine` uses,
//! applied here over two independent 32-bit lanes to build a 128-bit digest
//! (hashing each lane with a differently-seeded FNV pass so the two lanes
//! don't just mirror each other).

const FNV_OFFSET: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

fn fnv1a(seed: u32, bytes: &[u8]) -> u32 {
    let mut h = seed;
    for &b in bytes {
        h ^= b as u32;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// `seed ^= h + 0x9e3779b9 + (seed << 6) + (seed >> 2)`.
fn combine(seed: u32, h: u32) -> u32 {
    seed ^ h
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(seed.wrapping_shl(6))
        .wrapping_add(seed.wrapping_shr(2))
}

/// 128-bit digest, as two independent 32-bit-lane-combine passes over the
/// same traversal (spec.md §4.10 doesn't mandate a specific lane-mixing
/// scheme beyond the combine formula; seeding the two lanes from different
/// FNV offsets is this implementation's choice, recorded in DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hash128 {
    pub lo: u64,
    pub hi: u64,
}

struct Hasher {
    lane_a: u32,
    lane_b: u32,
}

impl Hasher {
    fn new() -> Self {
        Hasher {
            lane_a: 0,
            lane_b: FNV_OFFSET,
        }
    }

    fn feed_bytes(&mut self, bytes: &[u8]) {
        let ha = fnv1a(self.lane_a, bytes);
        let hb = fnv1a(self.lane_b.rotate_left(13), bytes);
        self.lane_a = combine(self.lane_a, ha);
        self.lane_b = combine(self.lane_b, hb);
    }

    fn feed_str(&mut self, s: &str) {
        self.feed_bytes(s.as_bytes());
    }

    fn finish(self) -> Hash128 {
        Hash128 {
            lo: (self.lane_a as u64) | ((self.lane_b as u64) << 32),
            hi: (self.lane_b as u64) | ((self.lane_a as u64) << 32),
        }
    }
}

/// Hash a Property's value tree (spec.md §4.10). Elements visit children in
/// alphabetical key order; a trivial Array hashes its contiguous byte
/// payload; an ArrayLz4 hashes its **compressed** blob bytes, not the
/// decompressed payload — a deliberate choice per spec.md so the hash of a
/// document that's merely been lazily re-compressed with different block
/// boundaries still matches, as long as the canonical on-disk bytes match.
pub fn hash_value(value: &crate::value::Value) -> crate::error::Result<Hash128> {
    let mut hasher = Hasher::new();
    feed_value(&mut hasher, value)?;
    Ok(hasher.finish())
}

fn feed_value(hasher: &mut Hasher, value: &crate::value::Value) -> crate::error::Result<()> {
    use crate::value::Value;
    hasher.feed_bytes(&[u8::from(value.kind())]);
    match value {
        Value::I8(v) => hasher.feed_bytes(&v.to_le_bytes()),
        Value::U8(v) => hasher.feed_bytes(&v.to_le_bytes()),
        Value::I16(v) => hasher.feed_bytes(&v.to_le_bytes()),
        Value::U16(v) => hasher.feed_bytes(&v.to_le_bytes()),
        Value::I32(v) => hasher.feed_bytes(&v.to_le_bytes()),
        Value::U32(v) => hasher.feed_bytes(&v.to_le_bytes()),
        Value::I64(v) => hasher.feed_bytes(&v.to_le_bytes()),
        Value::U64(v) => hasher.feed_bytes(&v.to_le_bytes()),
        Value::F32(v) => hasher.feed_bytes(&v.to_bits().to_le_bytes()),
        Value::F64(v) => hasher.feed_bytes(&v.to_bits().to_le_bytes()),
        Value::Bool(v) => hasher.feed_bytes(&[*v as u8]),
        Value::Half(v) => hasher.feed_bytes(&v.to_bits().to_le_bytes()),
        Value::Vec2(v) => feed_f32_components(hasher, &v.components()),
        Value::Vec3(v) => feed_f32_components(hasher, &v.components()),
        Value::Vec4(v) => feed_f32_components(hasher, &v.components()),
        Value::Vec2i(v) => feed_i32_components(hasher, &v.components()),
        Value::Vec3i(v) => feed_i32_components(hasher, &v.components()),
        Value::Vec4i(v) => feed_i32_components(hasher, &v.components()),
        Value::Quat(v) => feed_f32_components(hasher, &v.to_xyzw()),
        Value::Euler(v) => feed_f32_components(hasher, &v.components()),
        Value::Srgba(v) => hasher.feed_bytes(&v.0),
        Value::Hdr(v) => {
            for c in v.0 {
                hasher.feed_bytes(&c.to_le_bytes());
            }
        }
        Value::Transform(t) => {
            feed_f32_components(hasher, &t.position.components());
            feed_f32_components(hasher, &t.rotation.to_xyzw());
        }
        Value::Stransform(t) => {
            feed_f32_components(hasher, &t.position.components());
            feed_f32_components(hasher, &t.rotation.to_xyzw());
            feed_f32_components(hasher, &t.scale.components());
        }
        Value::Mat4(m) => feed_f32_components(hasher, &m.0),
        Value::Mat3x4(m) => feed_f32_components(hasher, &m.0),
        Value::Nil => {}
        Value::String(s) => hasher.feed_str(s),
        Value::Utf8(bytes) => hasher.feed_bytes(bytes),
        Value::Blob(bytes) => hasher.feed_bytes(bytes),
        Value::BlobLz4(blob) => hasher.feed_bytes(blob.compressed_bytes()),
        Value::Element(element) => {
            for (key, property) in element.iter_sorted() {
                hasher.feed_str(key);
                feed_value(hasher, property.value())?;
            }
        }
        Value::Array(array) => {
            if let Some(bytes) = array.trivial_bytes() {
                hasher.feed_bytes(bytes);
            } else {
                for property in array.iter_properties() {
                    feed_value(hasher, property.value())?;
                }
            }
        }
        Value::ArrayLz4(array) => {
            let (compressed, _) = array.compressed_for_write()?;
            hasher.feed_bytes(&compressed);
        }
        Value::Reference(reference) => hasher.feed_str(reference.path()),
        Value::Struct(s) => {
            hasher.feed_bytes(s.data());
        }
    }
    Ok(())
}

fn feed_f32_components(hasher: &mut Hasher, components: &[f32]) {
    for c in components {
        hasher.feed_bytes(&c.to_bits().to_le_bytes());
    }
}

fn feed_i32_components(hasher: &mut Hasher, components: &[i32]) {
    for c in components {
        hasher.feed_bytes(&c.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::property::Property;
    use crate::value::Value;
    use udm_types::Type;

    #[test]
    fn identical_trees_hash_equal() {
        let mut a = Element::new();
        a.add("x", Type::I32).unwrap().assign(Value::I32(1)).unwrap();
        a.add("y", Type::I32).unwrap().assign(Value::I32(2)).unwrap();
        let mut b = Element::new();
        b.add("y", Type::I32).unwrap().assign(Value::I32(2)).unwrap();
        b.add("x", Type::I32).unwrap().assign(Value::I32(1)).unwrap();

        let hash_a = hash_value(&Value::Element(a)).unwrap();
        let hash_b = hash_value(&Value::Element(b)).unwrap();
        assert_eq!(hash_a, hash_b, "key insertion order must not affect the hash");
    }

    #[test]
    fn differing_values_hash_differently() {
        let a = hash_value(&Value::I32(1)).unwrap();
        let b = hash_value(&Value::I32(2)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn array_lz4_hashes_compressed_bytes() {
        let mut array = crate::array_lz4::ArrayLz4::new(Type::I32);
        array.push_trivial(Value::I32(1)).unwrap();
        array.push_trivial(Value::I32(2)).unwrap();
        let (compressed, _) = array.compressed_for_write().unwrap();

        let mut hasher = Hasher::new();
        hasher.feed_bytes(&[u8::from(Type::ArrayLz4)]);
        hasher.feed_bytes(&compressed);
        let expected = hasher.finish();

        let actual = hash_value(&Value::ArrayLz4(array)).unwrap();
        assert_eq!(actual, expected);
        let _ = Property::create(Type::I32);
    }
}
