//! Shared string table (SST).
//!
//! Strings in the table may be split across CONTINUE records. A split
//! inside the character data is followed by a fresh flags byte, so the
//! two halves of one string can use different widths.

use std::collections::HashMap;

use bytes::BufMut;

use crate::common::binary::ByteCursor;
use crate::ole::xls::error::XlsResult;
use crate::ole::xls::records::{MAX_RECORD_LENGTH, Record, RecordWriter, sid};
use crate::ole::xls::strings::{self, FLAG_EXT_ST, FLAG_HIGH_BYTE, FLAG_RICH_ST};

#[derive(Debug, Clone, Default)]
pub struct SharedStringTable {
    strings: Vec<String>,
    lookup: HashMap<String, u32>,
    /// Number of cells referring to the table, as stored in `cstTotal`
    total: u32,
}

impl SharedStringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `text`, appending it when it is not present yet.
    pub fn add(&mut self, text: &str) -> u32 {
        self.total = self.total.saturating_add(1);
        if let Some(&index) = self.lookup.get(text) {
            return index;
        }
        let index = self.strings.len() as u32;
        self.strings.push(text.to_string());
        self.lookup.insert(text.to_string(), index);
        index
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn parse(record: &Record) -> XlsResult<Self> {
        record.require_len(8)?;
        let mut cursor = record.cursor();
        let total = cursor.read_u32()?;
        let unique = cursor.read_u32()? as usize;

        let mut table = Self {
            strings: Vec::with_capacity(unique.min(record.data.len() / 3)),
            lookup: HashMap::new(),
            total,
        };
        for _ in 0..unique {
            if cursor.is_empty() {
                log::warn!(
                    "SST declares {unique} strings but only {} are present",
                    table.strings.len()
                );
                break;
            }
            let text = read_sst_string(&mut cursor, &record.continue_breaks)?;
            let index = table.strings.len() as u32;
            // Duplicates keep the first index for lookups; every index stays addressable.
            table.lookup.entry(text.clone()).or_insert(index);
            table.strings.push(text);
        }
        Ok(table)
    }

    /// Write SST plus CONTINUE records. Strings may straddle record
    /// boundaries; their length and flags header never does.
    pub fn write(&self, writer: &mut RecordWriter) {
        let mut pieces: Vec<Vec<u8>> = Vec::new();
        let mut current = Vec::with_capacity(MAX_RECORD_LENGTH);
        current.put_u32_le(self.total.max(self.strings.len() as u32));
        current.put_u32_le(self.strings.len() as u32);

        for text in &self.strings {
            let compressed = strings::is_compressible(text);
            let width = if compressed { 1 } else { 2 };
            if MAX_RECORD_LENGTH - current.len() < 3 + width {
                pieces.push(std::mem::take(&mut current));
            }
            current.put_u16_le(strings::char_count(text) as u16);
            current.put_u8(if compressed { 0 } else { FLAG_HIGH_BYTE });

            let mut chars = Vec::with_capacity(strings::chars_size(text));
            if compressed {
                chars.extend(text.chars().map(|c| c as u32 as u8));
            } else {
                for unit in text.encode_utf16() {
                    chars.put_u16_le(unit);
                }
            }

            let mut rest = chars.as_slice();
            while !rest.is_empty() {
                let available = (MAX_RECORD_LENGTH - current.len()) / width * width;
                if available == 0 {
                    pieces.push(std::mem::take(&mut current));
                    current.put_u8(if compressed { 0 } else { FLAG_HIGH_BYTE });
                    continue;
                }
                let (head, tail) = rest.split_at(available.min(rest.len()));
                current.extend_from_slice(head);
                rest = tail;
            }
        }
        pieces.push(current);
        writer.write_pieces(sid::SST, &pieces);
    }
}

fn read_sst_string(cursor: &mut ByteCursor<'_>, breaks: &[usize]) -> XlsResult<String> {
    let cch = cursor.read_u16()? as usize;
    let flags = cursor.read_u8()?;
    let runs = if flags & FLAG_RICH_ST != 0 { cursor.read_u16()? as usize } else { 0 };
    let ext = if flags & FLAG_EXT_ST != 0 { cursor.read_u32()? as usize } else { 0 };

    let mut high_byte = flags & FLAG_HIGH_BYTE != 0;
    let mut remaining = cch;
    let mut text = String::with_capacity(cch);
    while remaining > 0 {
        let pos = cursor.position();
        if breaks.binary_search(&pos).is_ok() {
            high_byte = cursor.read_u8()? & FLAG_HIGH_BYTE != 0;
            continue;
        }
        let segment_end = breaks
            .iter()
            .copied()
            .find(|&b| b > pos)
            .unwrap_or(pos + cursor.remaining());
        let width = if high_byte { 2 } else { 1 };
        let count = ((segment_end - pos) / width).min(remaining).max(1);
        text.push_str(&strings::read_chars(cursor, count, high_byte)?);
        remaining -= count;
    }
    // Formatting runs and phonetic data are not kept.
    cursor.skip(runs * 4 + ext)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::records::RecordStream;

    fn reparse(table: &SharedStringTable) -> SharedStringTable {
        let mut writer = RecordWriter::new();
        table.write(&mut writer);
        let bytes = writer.into_inner();
        let record = RecordStream::new(&bytes).next().unwrap().unwrap();
        assert_eq!(record.sid, sid::SST);
        SharedStringTable::parse(&record).unwrap()
    }

    #[test]
    fn test_add_deduplicates() {
        let mut sst = SharedStringTable::new();
        assert_eq!(sst.add("a"), 0);
        assert_eq!(sst.add("b"), 1);
        assert_eq!(sst.add("a"), 0);
        assert_eq!(sst.len(), 2);
        assert_eq!(sst.total(), 3);
        assert_eq!(sst.get(1), Some("b"));
        assert_eq!(sst.get(2), None);
    }

    #[test]
    fn test_strings_split_across_continue() {
        let mut sst = SharedStringTable::new();
        let long_ascii = "x".repeat(MAX_RECORD_LENGTH + 100);
        let long_wide: String = std::iter::repeat_n('Ж', 5000).collect();
        sst.add("first");
        sst.add(&long_ascii);
        sst.add(&long_wide);
        sst.add("last");

        let parsed = reparse(&sst);
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed.get(1), Some(long_ascii.as_str()));
        assert_eq!(parsed.get(2), Some(long_wide.as_str()));
        assert_eq!(parsed.get(3), Some("last"));
    }

    #[test]
    fn test_rich_text_runs_skipped() {
        let mut body = Vec::new();
        body.put_u32_le(2);
        body.put_u32_le(2);
        // "ab" with one formatting run
        body.put_u16_le(2);
        body.put_u8(FLAG_RICH_ST);
        body.put_u16_le(1);
        body.extend_from_slice(b"ab");
        body.extend_from_slice(&[0, 0, 1, 0]);
        body.put_u16_le(1);
        body.put_u8(0);
        body.push(b'c');
        let parsed = SharedStringTable::parse(&Record::new(sid::SST, body)).unwrap();
        assert_eq!(parsed.get(0), Some("ab"));
        assert_eq!(parsed.get(1), Some("c"));
    }
}
