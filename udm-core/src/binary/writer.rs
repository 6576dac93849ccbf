//! Binary writer (spec.md §4.6 *Save*): fixed header, then the root
//! property recursively. Byte-count prefixes are computed by building each
//! body into an in-memory buffer before writing it out, rather than seeking
//! back through the sink — simpler, and every body already round-trips
//! through a `Vec<u8>` in [`crate::binary::body`], so there is no second
//! buffering pass to avoid.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::binary::body::write_property;
use crate::binary::{MAGIC, VERSION};
use crate::error::Result;
use crate::property::Property;

pub fn write_document<W: Write>(w: &mut W, root: &Property) -> Result<()> {
    w.write_all(&MAGIC)?;
    w.write_u32::<LittleEndian>(VERSION)?;
    write_property(w, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use udm_types::Type;

    #[test]
    fn writes_magic_and_version() {
        let root = Property::create(Type::Element);
        let mut buf = Vec::new();
        write_document(&mut buf, &root).unwrap();
        assert_eq!(&buf[0..4], b"UDMB");
        assert_eq!(u32::from_le_bytes(buf[4..8].try_into().unwrap()), 1);
    }
}
