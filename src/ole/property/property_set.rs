use bytes::BufMut;

use super::{PropertyError, PropertyResult, Section};
use crate::common::DecodeOptions;
use crate::common::binary::{ByteCursor, read_u16_le, read_u32_le};
use crate::ole::class_id::ClassId;

/// Stream name of the summary information property set.
pub const SUMMARY_INFORMATION_NAME: &str = "\u{0005}SummaryInformation";
/// Stream name of the document summary information property set.
pub const DOCUMENT_SUMMARY_INFORMATION_NAME: &str = "\u{0005}DocumentSummaryInformation";

/// `FMTID_SummaryInformation`
pub const SUMMARY_INFORMATION_ID: ClassId = ClassId::from_fields(
    0xF29F85E0,
    0x4FF9,
    0x1068,
    [0xAB, 0x91, 0x08, 0x00, 0x2B, 0x27, 0xB3, 0xD9],
);
/// `FMTID_DocSummaryInformation`
pub const DOCUMENT_SUMMARY_INFORMATION_ID: ClassId = ClassId::from_fields(
    0xD5CDD502,
    0x2E9C,
    0x101B,
    [0x93, 0x97, 0x08, 0x00, 0x2B, 0x2C, 0xF9, 0xAE],
);

const BYTE_ORDER_MARK: u16 = 0xFFFE;
const HEADER_SIZE: usize = 28;
const SECTION_HEADER_SIZE: usize = 20;
const MAX_SECTIONS: u32 = 16;
/// Windows NT, version 5.1
const DEFAULT_OS_VERSION: u32 = 0x0002_0501;

/// A property-set stream: a header and one or more [`Section`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySet {
    format: u16,
    os_version: u32,
    class_id: ClassId,
    sections: Vec<Section>,
}

/// Cheap check of the property-set header.
pub fn is_property_set_stream(data: &[u8]) -> bool {
    if data.len() < HEADER_SIZE + SECTION_HEADER_SIZE {
        return false;
    }
    let byte_order = read_u16_le(data, 0).unwrap_or(0);
    let format = read_u16_le(data, 2).unwrap_or(u16::MAX);
    let sections = read_u32_le(data, 24).unwrap_or(0);
    byte_order == BYTE_ORDER_MARK && format <= 1 && (1..=MAX_SECTIONS).contains(&sections)
}

impl Default for PropertySet {
    fn default() -> Self {
        Self {
            format: 0,
            os_version: DEFAULT_OS_VERSION,
            class_id: ClassId::NULL,
            sections: Vec::new(),
        }
    }
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A property set holding one empty section with `format_id`.
    pub fn with_section(format_id: ClassId) -> Self {
        let mut set = Self::new();
        set.sections.push(Section::new(format_id));
        set
    }

    pub fn read(data: &[u8], options: &DecodeOptions) -> PropertyResult<Self> {
        let mut cursor = ByteCursor::new(data);
        let byte_order = cursor.read_u16()?;
        if byte_order != BYTE_ORDER_MARK {
            return Err(PropertyError::InvalidPropertySet(format!(
                "byte order mark 0x{byte_order:04X} is not 0xFFFE"
            )));
        }
        let format = cursor.read_u16()?;
        if format > 1 {
            return Err(PropertyError::InvalidPropertySet(format!(
                "unknown format version {format}"
            )));
        }
        let os_version = cursor.read_u32()?;
        let class_id = ClassId::read(&mut cursor)?;
        let count = cursor.read_u32()?;
        if !(1..=MAX_SECTIONS).contains(&count) {
            return Err(PropertyError::InvalidPropertySet(format!(
                "section count {count} out of range"
            )));
        }

        let mut headers = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let format_id = ClassId::read(&mut cursor)?;
            let offset = cursor.read_u32()? as usize;
            headers.push((format_id, offset));
        }

        let sections = headers
            .into_iter()
            .map(|(format_id, offset)| Section::read(data, offset, format_id, options))
            .collect::<PropertyResult<Vec<_>>>()?;

        Ok(Self {
            format,
            os_version,
            class_id,
            sections,
        })
    }

    pub fn write(&self, buf: &mut Vec<u8>) -> PropertyResult<()> {
        let start = buf.len();
        buf.put_u16_le(BYTE_ORDER_MARK);
        buf.put_u16_le(self.format);
        buf.put_u32_le(self.os_version);
        buf.put_slice(self.class_id.as_bytes());
        buf.put_u32_le(self.sections.len() as u32);

        let mut bodies = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            let mut body = Vec::new();
            section.write(&mut body)?;
            bodies.push(body);
        }

        let mut offset = HEADER_SIZE + SECTION_HEADER_SIZE * self.sections.len();
        for (section, body) in self.sections.iter().zip(&bodies) {
            buf.put_slice(section.format_id().as_bytes());
            buf.put_u32_le(offset as u32);
            offset += body.len();
        }
        for body in &bodies {
            buf.put_slice(body);
        }
        debug_assert_eq!(buf.len() - start, offset);
        Ok(())
    }

    pub fn to_bytes(&self) -> PropertyResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }

    #[inline]
    pub fn os_version(&self) -> u32 {
        self.os_version
    }

    #[inline]
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn sections_mut(&mut self) -> &mut Vec<Section> {
        &mut self.sections
    }

    /// The first section, which holds the well-known properties.
    pub fn first_section(&self) -> Option<&Section> {
        self.sections.first()
    }

    pub fn first_section_mut(&mut self) -> Option<&mut Section> {
        self.sections.first_mut()
    }

    pub fn is_summary_information(&self) -> bool {
        self.first_section()
            .is_some_and(|s| s.format_id() == SUMMARY_INFORMATION_ID)
    }

    pub fn is_document_summary_information(&self) -> bool {
        self.first_section()
            .is_some_and(|s| s.format_id() == DOCUMENT_SUMMARY_INFORMATION_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::property::Variant;

    #[test]
    fn test_property_set_round_trip() {
        let mut set = PropertySet::with_section(SUMMARY_INFORMATION_ID);
        let section = set.first_section_mut().unwrap();
        section.set_codepage(1252);
        section.set_string(2, "Budget");
        section.set_property(14, Variant::I4(12));
        let bytes = set.to_bytes().unwrap();

        assert!(is_property_set_stream(&bytes));
        let decoded = PropertySet::read(&bytes, &DecodeOptions::new()).unwrap();
        assert!(decoded.is_summary_information());
        assert_eq!(decoded, set);
    }

    #[test]
    fn test_two_sections() {
        let mut set = PropertySet::with_section(DOCUMENT_SUMMARY_INFORMATION_ID);
        set.sections_mut().push(Section::new(ClassId::from_bytes([9; 16])));
        set.sections_mut()[1].set_property(2, Variant::Bool(true));
        let bytes = set.to_bytes().unwrap();
        let decoded = PropertySet::read(&bytes, &DecodeOptions::new()).unwrap();
        assert_eq!(decoded.sections().len(), 2);
        assert_eq!(
            decoded.sections()[1].property(2).map(|p| p.value()),
            Some(&Variant::Bool(true))
        );
    }

    #[test]
    fn test_bad_byte_order() {
        let mut bytes = PropertySet::with_section(SUMMARY_INFORMATION_ID)
            .to_bytes()
            .unwrap();
        bytes[0] = 0;
        assert!(!is_property_set_stream(&bytes));
        assert!(PropertySet::read(&bytes, &DecodeOptions::new()).is_err());
    }
}
