use bytes::BufMut;

use super::{PropertyError, PropertyResult, skip_padding, tolerate};
use crate::common::DecodeOptions;
use crate::common::binary::{ByteCursor, put_zero_padding};
use crate::ole::codepage::{self, CP_UTF16};
use crate::ole::consts::MAX_RECORD_LENGTH;

/// An 8-bit string in the section's code page (`VT_LPSTR`, `VT_BSTR`).
///
/// The bytes are kept verbatim, terminator included.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodePageString {
    bytes: Vec<u8>,
}

impl CodePageString {
    pub fn from_raw(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Encode `text` in `codepage` and append the terminator.
    pub fn from_text(text: &str, codepage: u16) -> Self {
        let mut bytes = codepage::encode(text, codepage);
        if codepage == CP_UTF16 {
            bytes.put_u16_le(0);
        } else {
            bytes.put_u8(0);
        }
        Self { bytes }
    }

    pub fn read(cursor: &mut ByteCursor<'_>, options: &DecodeOptions) -> PropertyResult<Self> {
        let offset = cursor.position();
        let size = cursor.read_u32()? as usize;
        if size > MAX_RECORD_LENGTH {
            return Err(PropertyError::CapacityExceeded {
                what: "CodePageString",
                requested: size as u64,
                limit: MAX_RECORD_LENGTH as u64,
            });
        }
        let bytes = cursor.read_bytes(size)?.to_vec();
        if bytes.last().is_some_and(|&b| b != 0) {
            tolerate(
                options.rejects_anomalies(),
                PropertyError::MissingTerminator {
                    what: "CodePageString",
                    offset,
                },
            )?;
        }
        if size > 0 {
            skip_padding(cursor);
        }
        Ok(Self { bytes })
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.put_u32_le(self.bytes.len() as u32);
        buf.put_slice(&self.bytes);
        put_zero_padding(buf, 0, 4);
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_text(&self, codepage: u16) -> String {
        codepage::decode(&self.bytes, codepage)
    }
}

/// A UTF-16LE string (`VT_LPWSTR`): a character count, then the code units.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnicodeString {
    units: Vec<u16>,
}

impl UnicodeString {
    /// Build a terminated string from `text`. The empty string encodes as
    /// a zero length with no data.
    pub fn new(text: &str) -> Self {
        let mut units: Vec<u16> = text.encode_utf16().collect();
        if !units.is_empty() {
            units.push(0);
        }
        Self { units }
    }

    /// Wrap raw code units as read from disk.
    pub fn from_units(units: Vec<u16>) -> Self {
        Self { units }
    }

    pub fn read(cursor: &mut ByteCursor<'_>, options: &DecodeOptions) -> PropertyResult<Self> {
        let offset = cursor.position();
        let length = cursor.read_u32()? as usize;
        let byte_len = length.checked_mul(2).filter(|&n| n <= MAX_RECORD_LENGTH).ok_or(
            PropertyError::CapacityExceeded {
                what: "UnicodeString",
                requested: length as u64,
                limit: (MAX_RECORD_LENGTH / 2) as u64,
            },
        )?;
        if length == 0 {
            return Ok(Self::default());
        }
        let units: Vec<u16> = cursor
            .read_bytes(byte_len)?
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        if units.last() != Some(&0) {
            tolerate(
                options.rejects_unterminated_unicode(),
                PropertyError::MissingTerminator {
                    what: "UnicodeString",
                    offset,
                },
            )?;
        }
        skip_padding(cursor);
        Ok(Self { units })
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.put_u32_le(self.units.len() as u32);
        for &unit in &self.units {
            buf.put_u16_le(unit);
        }
        put_zero_padding(buf, 0, 4);
    }

    /// Character count as stored, terminator included.
    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    pub fn to_text(&self) -> String {
        let end = self
            .units
            .iter()
            .position(|&u| u == 0)
            .unwrap_or(self.units.len());
        String::from_utf16_lossy(&self.units[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Strictness;

    fn encode(s: &UnicodeString) -> Vec<u8> {
        let mut buf = Vec::new();
        s.write(&mut buf);
        buf
    }

    #[test]
    fn test_unicode_round_trip() {
        let original = UnicodeString::new("Sheet");
        let bytes = encode(&original);
        // 4 byte length + 6 units * 2 bytes = 16, already aligned
        assert_eq!(bytes.len(), 16);
        let mut cursor = ByteCursor::new(&bytes);
        let decoded = UnicodeString::read(&mut cursor, &DecodeOptions::new()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.to_text(), "Sheet");
        assert_eq!(cursor.position(), 16);
    }

    #[test]
    fn test_empty_unicode_has_no_data() {
        let bytes = encode(&UnicodeString::new(""));
        assert_eq!(bytes, vec![0, 0, 0, 0]);
        let mut cursor = ByteCursor::new(&bytes);
        let decoded = UnicodeString::read(&mut cursor, &DecodeOptions::new()).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_unterminated_unicode_depends_on_strictness() {
        let bytes = [2, 0, 0, 0, b'a', 0, b'b', 0];
        let mut cursor = ByteCursor::new(&bytes);
        let err = UnicodeString::read(&mut cursor, &DecodeOptions::new()).unwrap_err();
        assert!(matches!(
            err,
            PropertyError::MissingTerminator {
                what: "UnicodeString",
                offset: 0
            }
        ));

        let lenient = DecodeOptions::new().with_strictness(Strictness::Lenient);
        let mut cursor = ByteCursor::new(&bytes);
        let decoded = UnicodeString::read(&mut cursor, &lenient).unwrap();
        assert_eq!(decoded.to_text(), "ab");
    }

    #[test]
    fn test_code_page_string_pads_to_four() {
        let s = CodePageString::from_text("abc", 1252);
        let mut buf = Vec::new();
        s.write(&mut buf);
        assert_eq!(buf.len(), 8);
        let mut cursor = ByteCursor::new(&buf);
        let decoded = CodePageString::read(&mut cursor, &DecodeOptions::new()).unwrap();
        assert_eq!(decoded.to_text(1252), "abc");
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn test_unterminated_code_page_string_is_warned_unless_strict() {
        let bytes = [2, 0, 0, 0, b'h', b'i', 0, 0];
        let mut cursor = ByteCursor::new(&bytes);
        assert!(CodePageString::read(&mut cursor, &DecodeOptions::new()).is_ok());
        let mut cursor = ByteCursor::new(&bytes);
        assert!(CodePageString::read(&mut cursor, &DecodeOptions::strict()).is_err());
    }
}
