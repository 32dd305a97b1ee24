//! BIFF8 string layouts.
//!
//! Every BIFF8 string carries a flags byte whose bit 0 tells whether the
//! characters are stored as UTF-16LE or "compressed" (the low byte of each
//! code unit, i.e. Latin-1).

use bytes::BufMut;

use crate::common::binary::{BinaryResult, ByteCursor};

/// Bit 0 of the string flags: characters are two bytes wide
pub const FLAG_HIGH_BYTE: u8 = 0x01;
/// Phonetic (Far East) data follows the characters
pub const FLAG_EXT_ST: u8 = 0x04;
/// Formatting runs follow the characters
pub const FLAG_RICH_ST: u8 = 0x08;

/// Whether `text` fits the compressed one-byte-per-character form.
#[inline]
pub fn is_compressible(text: &str) -> bool {
    text.chars().all(|c| (c as u32) <= 0xFF)
}

/// Read `cch` characters in the width selected by `high_byte`.
pub fn read_chars(cursor: &mut ByteCursor<'_>, cch: usize, high_byte: bool) -> BinaryResult<String> {
    if high_byte {
        let bytes = cursor.read_bytes(cch * 2)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&units))
    } else {
        let bytes = cursor.read_bytes(cch)?;
        Ok(bytes.iter().map(|&b| b as char).collect())
    }
}

/// `XLUnicodeString`: `u16 cch | u8 flags | chars`.
pub fn read_unicode_string(cursor: &mut ByteCursor<'_>) -> BinaryResult<String> {
    let cch = cursor.read_u16()? as usize;
    let flags = cursor.read_u8()?;
    read_chars(cursor, cch, flags & FLAG_HIGH_BYTE != 0)
}

/// `ShortXLUnicodeString`: `u8 cch | u8 flags | chars`.
pub fn read_short_unicode_string(cursor: &mut ByteCursor<'_>) -> BinaryResult<String> {
    let cch = cursor.read_u8()? as usize;
    let flags = cursor.read_u8()?;
    read_chars(cursor, cch, flags & FLAG_HIGH_BYTE != 0)
}

fn put_chars(out: &mut Vec<u8>, text: &str, compressed: bool) {
    if compressed {
        out.extend(text.chars().map(|c| c as u32 as u8));
    } else {
        for unit in text.encode_utf16() {
            out.put_u16_le(unit);
        }
    }
}

/// Number of characters as stored, i.e. UTF-16 code units.
#[inline]
pub fn char_count(text: &str) -> usize {
    text.encode_utf16().count()
}

pub fn write_unicode_string(out: &mut Vec<u8>, text: &str) {
    let compressed = is_compressible(text);
    out.put_u16_le(char_count(text) as u16);
    out.put_u8(if compressed { 0 } else { FLAG_HIGH_BYTE });
    put_chars(out, text, compressed);
}

pub fn write_short_unicode_string(out: &mut Vec<u8>, text: &str) {
    let compressed = is_compressible(text);
    out.put_u8(char_count(text) as u8);
    out.put_u8(if compressed { 0 } else { FLAG_HIGH_BYTE });
    put_chars(out, text, compressed);
}

/// Encoded size of `text` without its length and flags header.
pub fn chars_size(text: &str) -> usize {
    if is_compressible(text) {
        text.chars().count()
    } else {
        char_count(text) * 2
    }
}

/// Characters without length prefix, flags byte first.
pub fn write_flagged_chars(out: &mut Vec<u8>, text: &str) {
    let compressed = is_compressible(text);
    out.put_u8(if compressed { 0 } else { FLAG_HIGH_BYTE });
    put_chars(out, text, compressed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_and_wide_strings() {
        let mut out = Vec::new();
        write_unicode_string(&mut out, "Café");
        assert_eq!(out, [4, 0, 0, b'C', b'a', b'f', 0xE9]);
        let mut cursor = ByteCursor::new(&out);
        assert_eq!(read_unicode_string(&mut cursor).unwrap(), "Café");

        let mut out = Vec::new();
        write_short_unicode_string(&mut out, "Σ1");
        assert_eq!(out, [2, 1, 0xA3, 0x03, b'1', 0]);
        let mut cursor = ByteCursor::new(&out);
        assert_eq!(read_short_unicode_string(&mut cursor).unwrap(), "Σ1");
        assert!(cursor.is_empty());
    }
}
