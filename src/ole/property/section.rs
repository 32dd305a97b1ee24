use std::collections::BTreeMap;

use bytes::BufMut;

use super::{PropertyError, PropertyResult, TypedPropertyValue, Variant};
use crate::common::DecodeOptions;
use crate::common::binary::{ByteCursor, decode_utf16le, encode_utf16le, put_zero_padding};
use crate::ole::class_id::ClassId;
use crate::ole::codepage::{self, CP_UTF16, CP_WINDOWS_1252};
use crate::ole::consts::MAX_PROPERTIES_PER_SECTION;

/// Property ID of the dictionary mapping property IDs to names.
pub const PID_DICTIONARY: u32 = 0;
/// Property ID of the section's code page (`VT_I2`).
pub const PID_CODEPAGE: u32 = 1;

/// One section of a property set: a format ID and its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    format_id: ClassId,
    properties: BTreeMap<u32, TypedPropertyValue>,
    dictionary: Option<BTreeMap<u32, String>>,
}

impl Section {
    pub fn new(format_id: ClassId) -> Self {
        Self {
            format_id,
            properties: BTreeMap::new(),
            dictionary: None,
        }
    }

    #[inline]
    pub fn format_id(&self) -> ClassId {
        self.format_id
    }

    /// The declared code page, or Windows-1252 when none is present.
    pub fn codepage(&self) -> u16 {
        match self.properties.get(&PID_CODEPAGE).map(|p| p.value()) {
            Some(Variant::I2(cp)) => *cp as u16,
            _ => CP_WINDOWS_1252,
        }
    }

    pub fn set_codepage(&mut self, codepage: u16) {
        self.properties.insert(
            PID_CODEPAGE,
            TypedPropertyValue::new(Variant::I2(codepage as i16)),
        );
    }

    pub fn property(&self, id: u32) -> Option<&TypedPropertyValue> {
        self.properties.get(&id)
    }

    pub fn set_property(&mut self, id: u32, value: impl Into<TypedPropertyValue>) {
        self.properties.insert(id, value.into());
    }

    pub fn remove_property(&mut self, id: u32) -> Option<TypedPropertyValue> {
        self.properties.remove(&id)
    }

    /// Property IDs in ascending order, the dictionary excluded.
    pub fn property_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.properties.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.properties.len() + usize::from(self.dictionary.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text of a string property, decoded with the section code page.
    pub fn string(&self, id: u32) -> Option<String> {
        self.property(id)?.value().as_text(self.codepage())
    }

    /// Store `text` as a code-page string (`VT_LPSTR`).
    pub fn set_string(&mut self, id: u32, text: &str) {
        let encoded = super::CodePageString::from_text(text, self.codepage());
        self.set_property(id, Variant::Lpstr(encoded));
    }

    pub fn dictionary(&self) -> Option<&BTreeMap<u32, String>> {
        self.dictionary.as_ref()
    }

    pub fn set_dictionary(&mut self, dictionary: Option<BTreeMap<u32, String>>) {
        self.dictionary = dictionary;
    }

    /// Read the section at `offset` in a property-set stream.
    pub(crate) fn read(
        data: &[u8],
        offset: usize,
        format_id: ClassId,
        options: &DecodeOptions,
    ) -> PropertyResult<Self> {
        let mut cursor = ByteCursor::at(data, offset)?;
        let size = cursor.read_u32()? as usize;
        let end = offset
            .checked_add(size)
            .filter(|&end| end <= data.len() && size >= 8)
            .ok_or_else(|| {
                PropertyError::InvalidPropertySet(format!(
                    "section at offset {offset} declares size {size}, stream holds {}",
                    data.len()
                ))
            })?;
        // Values are decoded relative to the section start so padding aligns
        // with the section, which itself starts on a four-byte boundary.
        let body = &data[offset..end];
        let mut cursor = ByteCursor::at(body, 4)?;

        let count = cursor.read_u32()?;
        if count > MAX_PROPERTIES_PER_SECTION {
            return Err(PropertyError::CapacityExceeded {
                what: "Section",
                requested: count as u64,
                limit: MAX_PROPERTIES_PER_SECTION as u64,
            });
        }
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push((cursor.read_u32()?, cursor.read_u32()? as usize));
        }

        let mut section = Section::new(format_id);

        // The code page must be known before the dictionary is read.
        if let Some(&(_, cp_offset)) = entries.iter().find(|(id, _)| *id == PID_CODEPAGE) {
            let (value, _) = TypedPropertyValue::decode(body, cp_offset, options)?;
            section.properties.insert(PID_CODEPAGE, value);
        }
        let codepage = section.codepage();

        for &(id, value_offset) in &entries {
            match id {
                PID_CODEPAGE => {},
                PID_DICTIONARY => {
                    let mut cursor = ByteCursor::at(body, value_offset)?;
                    section.dictionary = Some(read_dictionary(&mut cursor, codepage)?);
                },
                _ => {
                    let (value, _) = TypedPropertyValue::decode(body, value_offset, options)?;
                    if section.properties.insert(id, value).is_some() {
                        log::warn!("Property {id} appears twice in section {format_id}");
                    }
                },
            }
        }
        log::trace!("Read section {format_id} with {} properties", section.len());
        Ok(section)
    }

    /// Serialize the section: size, count, ID/offset table, values.
    pub(crate) fn write(&self, buf: &mut Vec<u8>) -> PropertyResult<()> {
        let codepage = self.codepage();
        let count = self.len();
        let mut values = Vec::new();
        let mut table = Vec::with_capacity(count);
        let table_end = 8 + count * 8;

        if let Some(dictionary) = &self.dictionary {
            table.push((PID_DICTIONARY, table_end + values.len()));
            write_dictionary(&mut values, dictionary, codepage);
            put_zero_padding(&mut values, 0, 4);
        }
        for (&id, value) in &self.properties {
            table.push((id, table_end + values.len()));
            value.write(&mut values)?;
            put_zero_padding(&mut values, 0, 4);
        }

        buf.put_u32_le((table_end + values.len()) as u32);
        buf.put_u32_le(count as u32);
        for (id, offset) in table {
            buf.put_u32_le(id);
            buf.put_u32_le(offset as u32);
        }
        buf.put_slice(&values);
        Ok(())
    }
}

fn read_dictionary(cursor: &mut ByteCursor<'_>, codepage: u16) -> PropertyResult<BTreeMap<u32, String>> {
    let count = cursor.read_u32()?;
    if count > MAX_PROPERTIES_PER_SECTION {
        return Err(PropertyError::CapacityExceeded {
            what: "Dictionary",
            requested: count as u64,
            limit: MAX_PROPERTIES_PER_SECTION as u64,
        });
    }
    let mut names = BTreeMap::new();
    for _ in 0..count {
        let id = cursor.read_u32()?;
        let length = cursor.read_u32()? as usize;
        let name = if codepage == CP_UTF16 {
            let name = decode_utf16le(cursor.read_bytes(length * 2)?);
            cursor.align_zero_padding(0, 4);
            name
        } else {
            codepage::decode(cursor.read_bytes(length)?, codepage)
        };
        names.insert(id, name);
    }
    Ok(names)
}

fn write_dictionary(buf: &mut Vec<u8>, names: &BTreeMap<u32, String>, codepage: u16) {
    buf.put_u32_le(names.len() as u32);
    for (&id, name) in names {
        buf.put_u32_le(id);
        if codepage == CP_UTF16 {
            let encoded = encode_utf16le(name);
            buf.put_u32_le((encoded.len() / 2 + 1) as u32);
            buf.put_slice(&encoded);
            buf.put_u16_le(0);
            put_zero_padding(buf, 0, 4);
        } else {
            let encoded = codepage::encode(name, codepage);
            buf.put_u32_le((encoded.len() + 1) as u32);
            buf.put_slice(&encoded);
            buf.put_u8(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::property::UnicodeString;

    fn round_trip(section: &Section) -> Section {
        let mut buf = Vec::new();
        section.write(&mut buf).unwrap();
        assert_eq!(buf.len() % 4, 0);
        Section::read(&buf, 0, section.format_id(), &DecodeOptions::new()).unwrap()
    }

    #[test]
    fn test_section_round_trip() {
        let mut section = Section::new(ClassId::from_bytes([1; 16]));
        section.set_codepage(1252);
        section.set_string(2, "Quarterly report");
        section.set_property(14, Variant::I4(3));
        section.set_property(5, Variant::Lpwstr(UnicodeString::new("tags")));
        let decoded = round_trip(&section);
        assert_eq!(decoded, section);
        assert_eq!(decoded.string(2).as_deref(), Some("Quarterly report"));
        assert_eq!(decoded.string(5).as_deref(), Some("tags"));
        assert_eq!(decoded.property_ids().collect::<Vec<_>>(), vec![1, 2, 5, 14]);
    }

    #[test]
    fn test_unicode_dictionary_round_trip() {
        let mut section = Section::new(ClassId::NULL);
        section.set_codepage(CP_UTF16);
        let mut names = BTreeMap::new();
        names.insert(2, "Client".to_string());
        names.insert(3, "Ref".to_string());
        section.set_dictionary(Some(names));
        section.set_property(2, Variant::I4(7));
        let decoded = round_trip(&section);
        assert_eq!(decoded.dictionary(), section.dictionary());
        assert_eq!(decoded.codepage(), CP_UTF16);
    }

    #[test]
    fn test_section_size_beyond_stream() {
        let raw = [0xFFu8, 0, 0, 0, 0, 0, 0, 0];
        let err = Section::read(&raw, 0, ClassId::NULL, &DecodeOptions::new()).unwrap_err();
        assert!(matches!(err, PropertyError::InvalidPropertySet(_)));
    }
}
