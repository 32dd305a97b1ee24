//! BIFF8 record framing and the structural records of a workbook stream.
//!
//! Every record is `u16 sid | u16 len | len bytes`. Bodies longer than
//! [`MAX_RECORD_LENGTH`] continue in CONTINUE records; [`RecordStream`]
//! joins them back for the record types whose bodies are parsed here and
//! leaves every other record untouched.

use bytes::BufMut;
use smallvec::SmallVec;

use crate::common::binary::{ByteCursor, read_u16_le};
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::strings;

/// Record identifiers
pub mod sid {
    pub const FORMULA: u16 = 0x0006;
    pub const EOF: u16 = 0x000A;
    pub const EXTERNSHEET: u16 = 0x0017;
    pub const NAME: u16 = 0x0018;
    pub const EXTERNNAME: u16 = 0x0023;
    pub const FILEPASS: u16 = 0x002F;
    pub const CONTINUE: u16 = 0x003C;
    pub const WINDOW1: u16 = 0x003D;
    pub const CODEPAGE: u16 = 0x0042;
    pub const BOUNDSHEET: u16 = 0x0085;
    pub const MULRK: u16 = 0x00BD;
    pub const MULBLANK: u16 = 0x00BE;
    pub const DBCELL: u16 = 0x00D7;
    pub const SST: u16 = 0x00FC;
    pub const LABELSST: u16 = 0x00FD;
    pub const EXTSST: u16 = 0x00FF;
    pub const SUPBOOK: u16 = 0x01AE;
    pub const DIMENSIONS: u16 = 0x0200;
    pub const BLANK: u16 = 0x0201;
    pub const NUMBER: u16 = 0x0203;
    pub const LABEL: u16 = 0x0204;
    pub const BOOLERR: u16 = 0x0205;
    pub const STRING: u16 = 0x0207;
    pub const ROW: u16 = 0x0208;
    pub const INDEX: u16 = 0x020B;
    pub const ARRAY: u16 = 0x0221;
    pub const TABLE: u16 = 0x0236;
    pub const WINDOW2: u16 = 0x023E;
    pub const RK: u16 = 0x027E;
    pub const SHRFMLA: u16 = 0x04BC;
    pub const BOF: u16 = 0x0809;
}

/// Largest body a single physical record may carry
pub const MAX_RECORD_LENGTH: usize = 8224;
/// Upper bound for a record joined from its CONTINUE records
pub const MAX_MERGED_RECORD_LENGTH: usize = 16 * 1024 * 1024;

pub const BIFF8_VERSION: u16 = 0x0600;

/// Records whose CONTINUE bodies are joined on read.
fn merges_continue(sid: u16) -> bool {
    matches!(
        sid,
        sid::SST
            | sid::SHRFMLA
            | sid::STRING
            | sid::NAME
            | sid::EXTERNSHEET
            | sid::SUPBOOK
            | sid::ARRAY
            | sid::LABEL
            | sid::FORMULA
    )
}

/// One logical record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub sid: u16,
    pub data: Vec<u8>,
    /// Offsets into `data` where a joined CONTINUE body starts
    pub continue_breaks: SmallVec<[usize; 4]>,
}

impl Record {
    pub fn new(sid: u16, data: Vec<u8>) -> Self {
        Self {
            sid,
            data,
            continue_breaks: SmallVec::new(),
        }
    }

    #[inline]
    pub fn cursor(&self) -> ByteCursor<'_> {
        ByteCursor::new(&self.data)
    }

    /// Fail with [`XlsError::InvalidLength`] when the body is shorter than `min`.
    pub fn require_len(&self, min: usize) -> XlsResult<()> {
        if self.data.len() < min {
            return Err(XlsError::InvalidLength {
                record_type: self.sid,
                expected: min,
                found: self.data.len(),
            });
        }
        Ok(())
    }
}

/// Iterator over the records of a workbook stream.
pub struct RecordStream<'a> {
    data: &'a [u8],
    pos: usize,
    finished: bool,
}

impl<'a> RecordStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    /// Start reading at absolute stream offset `pos`, as stored in BOUNDSHEET.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos,
            finished: false,
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn peek_sid(&self) -> Option<u16> {
        if self.pos + 4 > self.data.len() {
            return None;
        }
        read_u16_le(self.data, self.pos).ok()
    }

    fn read_physical(&mut self) -> XlsResult<(u16, &'a [u8])> {
        let sid = read_u16_le(self.data, self.pos)?;
        let len = read_u16_le(self.data, self.pos + 2)? as usize;
        let start = self.pos + 4;
        let end = start + len;
        if end > self.data.len() {
            return Err(XlsError::UnexpectedEndOfStream(format!(
                "record 0x{sid:04X} at offset {} declares {len} bytes, {} remain",
                self.pos,
                self.data.len() - start
            )));
        }
        self.pos = end;
        Ok((sid, &self.data[start..end]))
    }

    fn next_record(&mut self) -> XlsResult<Option<Record>> {
        if self.pos + 4 > self.data.len() {
            // Streams are padded to the sector size with zero bytes.
            if self.data[self.pos.min(self.data.len())..].iter().any(|&b| b != 0) {
                return Err(XlsError::UnexpectedEndOfStream(format!(
                    "truncated record header at offset {}",
                    self.pos
                )));
            }
            return Ok(None);
        }
        let (sid, body) = self.read_physical()?;
        if sid == 0 && body.is_empty() {
            return Ok(None);
        }
        let mut record = Record::new(sid, body.to_vec());
        if merges_continue(sid) {
            while self.peek_sid() == Some(sid::CONTINUE) {
                let (_, more) = self.read_physical()?;
                if record.data.len() + more.len() > MAX_MERGED_RECORD_LENGTH {
                    return Err(XlsError::invalid_record(
                        sid,
                        format!("continued body exceeds {MAX_MERGED_RECORD_LENGTH} bytes"),
                    ));
                }
                record.continue_breaks.push(record.data.len());
                record.data.extend_from_slice(more);
            }
        }
        Ok(Some(record))
    }
}

impl Iterator for RecordStream<'_> {
    type Item = XlsResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            },
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            },
        }
    }
}

/// Serializes records, splitting long bodies into CONTINUE records.
#[derive(Debug, Default)]
pub struct RecordWriter {
    out: Vec<u8>,
}

impl RecordWriter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.out.len()
    }

    fn write_physical(&mut self, sid: u16, body: &[u8]) {
        self.out.put_u16_le(sid);
        self.out.put_u16_le(body.len() as u16);
        self.out.extend_from_slice(body);
    }

    pub fn write(&mut self, sid: u16, body: &[u8]) {
        let mut chunks = body.chunks(MAX_RECORD_LENGTH);
        self.write_physical(sid, chunks.next().unwrap_or(&[]));
        for chunk in chunks {
            self.write_physical(sid::CONTINUE, chunk);
        }
    }

    pub fn write_record(&mut self, record: &Record) {
        self.write(record.sid, &record.data);
    }

    /// Write a body that was already cut into physical pieces.
    pub(crate) fn write_pieces(&mut self, sid: u16, pieces: &[Vec<u8>]) {
        for (i, piece) in pieces.iter().enumerate() {
            self.write_physical(if i == 0 { sid } else { sid::CONTINUE }, piece);
        }
    }

    /// Overwrite a little-endian `u32` inside an already written record.
    pub(crate) fn patch_u32(&mut self, offset: usize, value: u32) {
        self.out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.out
    }
}

/// Substream kind announced by BOF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BofType {
    Globals,
    Worksheet,
    Chart,
    MacroSheet,
    Other(u16),
}

impl BofType {
    fn from_u16(value: u16) -> Self {
        match value {
            0x0005 => BofType::Globals,
            0x0010 => BofType::Worksheet,
            0x0020 => BofType::Chart,
            0x0040 => BofType::MacroSheet,
            other => BofType::Other(other),
        }
    }

    fn to_u16(self) -> u16 {
        match self {
            BofType::Globals => 0x0005,
            BofType::Worksheet => 0x0010,
            BofType::Chart => 0x0020,
            BofType::MacroSheet => 0x0040,
            BofType::Other(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BofRecord {
    pub substream: BofType,
}

impl BofRecord {
    pub fn parse(record: &Record) -> XlsResult<Self> {
        record.require_len(4)?;
        let mut cursor = record.cursor();
        let version = cursor.read_u16()?;
        if version != BIFF8_VERSION {
            return Err(XlsError::UnsupportedBiffVersion(version));
        }
        Ok(Self {
            substream: BofType::from_u16(cursor.read_u16()?),
        })
    }

    pub fn write(&self, writer: &mut RecordWriter) {
        let mut body = Vec::with_capacity(16);
        body.put_u16_le(BIFF8_VERSION);
        body.put_u16_le(self.substream.to_u16());
        // build and year of the writing application
        body.put_u16_le(0x0DBB);
        body.put_u16_le(0x07CC);
        // file history flags and lowest BIFF version
        body.put_u32_le(0x0000_0041);
        body.put_u32_le(0x0000_0006);
        writer.write(sid::BOF, &body);
    }
}

/// Used range of a sheet; `last_row` and `last_col` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DimensionsRecord {
    pub first_row: u32,
    pub last_row: u32,
    pub first_col: u16,
    pub last_col: u16,
}

impl DimensionsRecord {
    pub fn parse(record: &Record) -> XlsResult<Self> {
        record.require_len(12)?;
        let mut cursor = record.cursor();
        Ok(Self {
            first_row: cursor.read_u32()?,
            last_row: cursor.read_u32()?,
            first_col: cursor.read_u16()?,
            last_col: cursor.read_u16()?,
        })
    }

    pub fn write(&self, writer: &mut RecordWriter) {
        let mut body = Vec::with_capacity(14);
        body.put_u32_le(self.first_row);
        body.put_u32_le(self.last_row);
        body.put_u16_le(self.first_col);
        body.put_u16_le(self.last_col);
        body.put_u16_le(0);
        writer.write(sid::DIMENSIONS, &body);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetVisibility {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetVisibility {
    fn from_u8(value: u8) -> Self {
        match value & 0x03 {
            0x01 => SheetVisibility::Hidden,
            0x02 => SheetVisibility::VeryHidden,
            _ => SheetVisibility::Visible,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            SheetVisibility::Visible => 0x00,
            SheetVisibility::Hidden => 0x01,
            SheetVisibility::VeryHidden => 0x02,
        }
    }
}

/// BOUNDSHEET: name, kind and stream offset of one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSheetRecord {
    pub position: u32,
    pub visibility: SheetVisibility,
    pub sheet_type: u8,
    pub name: String,
}

impl BoundSheetRecord {
    pub const WORKSHEET: u8 = 0x00;

    pub fn parse(record: &Record) -> XlsResult<Self> {
        record.require_len(8)?;
        let mut cursor = record.cursor();
        let position = cursor.read_u32()?;
        let visibility = SheetVisibility::from_u8(cursor.read_u8()?);
        let sheet_type = cursor.read_u8()?;
        let name = strings::read_short_unicode_string(&mut cursor)?;
        Ok(Self {
            position,
            visibility,
            sheet_type,
            name,
        })
    }

    /// Write the record and return the offset of its position field.
    pub fn write(&self, writer: &mut RecordWriter) -> usize {
        let mut body = Vec::with_capacity(8 + self.name.len() * 2);
        body.put_u32_le(self.position);
        body.put_u8(self.visibility.to_u8());
        body.put_u8(self.sheet_type);
        strings::write_short_unicode_string(&mut body, &self.name);
        let offset = writer.position() + 4;
        writer.write(sid::BOUNDSHEET, &body);
        offset
    }
}

/// Row properties from a ROW record; the column bounds are recomputed on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRecord {
    pub height: u16,
    pub options: u16,
    pub xf_index: u16,
}

impl Default for RowRecord {
    fn default() -> Self {
        Self {
            height: 0x00FF,
            options: 0x0100,
            xf_index: 0x000F,
        }
    }
}

impl RowRecord {
    pub fn parse(record: &Record) -> XlsResult<(u16, Self)> {
        record.require_len(16)?;
        let mut cursor = record.cursor();
        let row = cursor.read_u16()?;
        cursor.skip(4)?;
        let height = cursor.read_u16()?;
        cursor.skip(4)?;
        let options = cursor.read_u16()?;
        let xf_index = cursor.read_u16()?;
        Ok((
            row,
            Self {
                height,
                options,
                xf_index,
            },
        ))
    }

    pub fn write(&self, writer: &mut RecordWriter, row: u16, first_col: u16, last_col: u16) {
        let mut body = Vec::with_capacity(16);
        body.put_u16_le(row);
        body.put_u16_le(first_col);
        body.put_u16_le(last_col);
        body.put_u16_le(self.height);
        body.put_u32_le(0);
        body.put_u16_le(self.options);
        body.put_u16_le(self.xf_index);
        writer.write(sid::ROW, &body);
    }
}

/// WINDOW1 with the defaults of a newly created workbook.
pub(crate) fn default_window1() -> Record {
    let mut body = Vec::with_capacity(18);
    body.put_u16_le(0x0168);
    body.put_u16_le(0x010E);
    body.put_u16_le(0x3A5C);
    body.put_u16_le(0x23BE);
    body.put_u16_le(0x0038);
    body.put_u16_le(0);
    body.put_u16_le(0);
    body.put_u16_le(1);
    body.put_u16_le(0x0258);
    Record::new(sid::WINDOW1, body)
}

/// WINDOW2 with the defaults of a newly created worksheet.
pub(crate) fn default_window2() -> Record {
    let mut body = Vec::with_capacity(18);
    body.put_u16_le(0x06B6);
    body.put_u16_le(0);
    body.put_u16_le(0);
    body.put_u16_le(0x0040);
    body.put_u16_le(0);
    body.put_u16_le(0);
    body.put_u16_le(0);
    body.put_u32_le(0);
    Record::new(sid::WINDOW2, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_bodies_split_and_rejoin() {
        let body: Vec<u8> = (0..20000u32).map(|i| i as u8).collect();
        let mut writer = RecordWriter::new();
        writer.write(sid::SST, &body);
        writer.write(sid::EOF, &[]);
        let bytes = writer.into_inner();
        // SST + two CONTINUE + EOF
        assert_eq!(bytes.len(), 20000 + 4 * 4);

        let records: Vec<Record> = RecordStream::new(&bytes).collect::<XlsResult<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].data, body);
        assert_eq!(
            records[0].continue_breaks.as_slice(),
            &[MAX_RECORD_LENGTH, 2 * MAX_RECORD_LENGTH]
        );
        assert_eq!(records[1].sid, sid::EOF);
    }

    #[test]
    fn test_unknown_records_keep_their_continues() {
        let mut writer = RecordWriter::new();
        writer.write(0x00EC, &[1, 2, 3]);
        writer.write(sid::CONTINUE, &[4, 5]);
        let bytes = writer.into_inner();
        let sids: Vec<u16> = RecordStream::new(&bytes).map(|r| r.unwrap().sid).collect();
        assert_eq!(sids, vec![0x00EC, sid::CONTINUE]);
    }

    #[test]
    fn test_truncated_stream() {
        let bytes = [0x03, 0x02, 0x0E, 0x00, 0x00];
        let mut stream = RecordStream::new(&bytes);
        assert!(matches!(
            stream.next(),
            Some(Err(XlsError::UnexpectedEndOfStream(_)))
        ));
        assert!(stream.next().is_none());

        // trailing sector padding is not an error
        let padded = [0x0A, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(RecordStream::new(&padded).count(), 1);
    }

    #[test]
    fn test_bof_and_boundsheet() {
        let mut writer = RecordWriter::new();
        BofRecord {
            substream: BofType::Worksheet,
        }
        .write(&mut writer);
        let offset = BoundSheetRecord {
            position: 0,
            visibility: SheetVisibility::Hidden,
            sheet_type: BoundSheetRecord::WORKSHEET,
            name: "Données".to_string(),
        }
        .write(&mut writer);
        writer.patch_u32(offset, 0x1234);
        let bytes = writer.into_inner();
        let records: Vec<Record> = RecordStream::new(&bytes).collect::<XlsResult<_>>().unwrap();
        assert_eq!(
            BofRecord::parse(&records[0]).unwrap().substream,
            BofType::Worksheet
        );
        let sheet = BoundSheetRecord::parse(&records[1]).unwrap();
        assert_eq!(sheet.position, 0x1234);
        assert_eq!(sheet.name, "Données");
        assert_eq!(sheet.visibility, SheetVisibility::Hidden);

        let biff5 = Record::new(sid::BOF, vec![0x00, 0x05, 0x10, 0x00]);
        assert!(matches!(
            BofRecord::parse(&biff5),
            Err(XlsError::UnsupportedBiffVersion(0x0500))
        ));
    }
}
