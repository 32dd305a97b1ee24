use std::fmt;

use crate::common::binary::{BinaryResult, ByteCursor};

/// A 16-byte GUID in its on-disk (mixed-endian) layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ClassId([u8; 16]);

impl ClassId {
    pub const NULL: ClassId = ClassId([0; 16]);

    /// Build from the textual fields `d1-d2-d3-d4`.
    pub const fn from_fields(d1: u32, d2: u16, d3: u16, d4: [u8; 8]) -> Self {
        let a = d1.to_le_bytes();
        let b = d2.to_le_bytes();
        let c = d3.to_le_bytes();
        ClassId([
            a[0], a[1], a[2], a[3], b[0], b[1], c[0], c[1], d4[0], d4[1], d4[2], d4[3], d4[4],
            d4[5], d4[6], d4[7],
        ])
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        ClassId(bytes)
    }

    pub fn read(cursor: &mut ByteCursor<'_>) -> BinaryResult<Self> {
        Ok(ClassId(cursor.read_array::<16>()?))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.0 == [0; 16]
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            u16::from_le_bytes([b[4], b[5]]),
            u16::from_le_bytes([b[6], b[7]]),
            b[8],
            b[9],
            b[10],
            b[11],
            b[12],
            b[13],
            b[14],
            b[15]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_field_order() {
        let id = ClassId::from_fields(
            0xF29F85E0,
            0x4FF9,
            0x1068,
            [0xAB, 0x91, 0x08, 0x00, 0x2B, 0x27, 0xB3, 0xD9],
        );
        assert_eq!(id.as_bytes()[0], 0xE0);
        assert_eq!(id.to_string(), "{F29F85E0-4FF9-1068-AB91-08002B27B3D9}");
    }
}
