//! Cell value records: decoding into [`XlsCell`] values and encoding back.

use bitflags::bitflags;
use bytes::BufMut;

use crate::ole::xls::ErrorCode;
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::ptg::{Ptg, RangeAddress};
use crate::ole::xls::records::{Record, sid};
use crate::ole::xls::strings;

bitflags! {
    /// `grbit` of a FORMULA record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FormulaFlags: u16 {
        const ALWAYS_CALC = 0x0001;
        const CALC_ON_LOAD = 0x0002;
        const SHARED = 0x0008;
    }
}

/// Last computed result stored with a formula.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CachedValue {
    Number(f64),
    String(String),
    Bool(bool),
    Error(ErrorCode),
    #[default]
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormulaCell {
    pub cached: CachedValue,
    pub flags: FormulaFlags,
    pub tokens: Vec<Ptg>,
    /// ARRAY or TABLE record anchored at this cell, kept as read
    pub array: Option<Record>,
}

impl FormulaCell {
    pub fn new(tokens: Vec<Ptg>) -> Self {
        Self {
            cached: CachedValue::Empty,
            flags: FormulaFlags::CALC_ON_LOAD,
            tokens,
            array: None,
        }
    }
}

/// Contents of an occupied cell. Text is an index into the shared string table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Blank,
    Number(f64),
    Label(u32),
    Bool(bool),
    Error(ErrorCode),
    Formula(Box<FormulaCell>),
}

/// One cell of a sheet: its value and the index of its XF (format) record.
#[derive(Debug, Clone, PartialEq)]
pub struct XlsCell {
    pub xf_index: u16,
    pub value: CellValue,
}

impl XlsCell {
    pub const DEFAULT_XF: u16 = 0x000F;

    pub fn new(value: CellValue) -> Self {
        Self {
            xf_index: Self::DEFAULT_XF,
            value,
        }
    }

    pub fn blank() -> Self {
        Self::new(CellValue::Blank)
    }

    #[inline]
    pub fn is_blank(&self) -> bool {
        matches!(self.value, CellValue::Blank)
    }

    pub fn formula(&self) -> Option<&FormulaCell> {
        match &self.value {
            CellValue::Formula(f) => Some(f),
            _ => None,
        }
    }
}

/// A cell as decoded from its record, before strings are interned.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Cell(CellValue),
    /// Inline LABEL text
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCell {
    pub row: u16,
    pub col: u16,
    pub xf_index: u16,
    pub value: ParsedValue,
}

impl ParsedCell {
    fn cell(row: u16, col: u16, xf_index: u16, value: CellValue) -> Self {
        Self {
            row,
            col,
            xf_index,
            value: ParsedValue::Cell(value),
        }
    }
}

/// Decode an RK number: 30 significant bits, integer and ×100 flags.
pub fn decode_rk(rk: u32) -> f64 {
    let value = if rk & 0x02 != 0 {
        ((rk as i32) >> 2) as f64
    } else {
        f64::from_bits(((rk & 0xFFFF_FFFC) as u64) << 32)
    };
    if rk & 0x01 != 0 { value / 100.0 } else { value }
}

/// Whether `sid` is one of the records decoded by [`parse_cell_record`].
pub fn is_cell_record(record_sid: u16) -> bool {
    matches!(
        record_sid,
        sid::NUMBER
            | sid::RK
            | sid::MULRK
            | sid::LABELSST
            | sid::LABEL
            | sid::BOOLERR
            | sid::BLANK
            | sid::MULBLANK
            | sid::FORMULA
    )
}

/// Decode a cell record; MULRK and MULBLANK expand to one cell per column.
pub fn parse_cell_record(record: &Record) -> XlsResult<Vec<ParsedCell>> {
    let mut cursor = record.cursor();
    match record.sid {
        sid::NUMBER => {
            record.require_len(14)?;
            let (row, col, xf) = (cursor.read_u16()?, cursor.read_u16()?, cursor.read_u16()?);
            Ok(vec![ParsedCell::cell(row, col, xf, CellValue::Number(cursor.read_f64()?))])
        },
        sid::RK => {
            record.require_len(10)?;
            let (row, col, xf) = (cursor.read_u16()?, cursor.read_u16()?, cursor.read_u16()?);
            let value = decode_rk(cursor.read_u32()?);
            Ok(vec![ParsedCell::cell(row, col, xf, CellValue::Number(value))])
        },
        sid::MULRK => {
            record.require_len(6)?;
            let row = cursor.read_u16()?;
            let first_col = cursor.read_u16()?;
            let count = (record.data.len() - 6) / 6;
            let mut cells = Vec::with_capacity(count);
            for i in 0..count {
                let xf = cursor.read_u16()?;
                let value = decode_rk(cursor.read_u32()?);
                cells.push(ParsedCell::cell(row, first_col + i as u16, xf, CellValue::Number(value)));
            }
            Ok(cells)
        },
        sid::LABELSST => {
            record.require_len(10)?;
            let (row, col, xf) = (cursor.read_u16()?, cursor.read_u16()?, cursor.read_u16()?);
            Ok(vec![ParsedCell::cell(row, col, xf, CellValue::Label(cursor.read_u32()?))])
        },
        sid::LABEL => {
            record.require_len(9)?;
            let (row, col, xf) = (cursor.read_u16()?, cursor.read_u16()?, cursor.read_u16()?);
            let text = strings::read_unicode_string(&mut cursor)?;
            Ok(vec![ParsedCell {
                row,
                col,
                xf_index: xf,
                value: ParsedValue::Text(text),
            }])
        },
        sid::BOOLERR => {
            record.require_len(8)?;
            let (row, col, xf) = (cursor.read_u16()?, cursor.read_u16()?, cursor.read_u16()?);
            let value = cursor.read_u8()?;
            let value = if cursor.read_u8()? == 0 {
                CellValue::Bool(value != 0)
            } else {
                CellValue::Error(ErrorCode::from_code(value).ok_or_else(|| {
                    XlsError::invalid_record(sid::BOOLERR, format!("unknown error code 0x{value:02X}"))
                })?)
            };
            Ok(vec![ParsedCell::cell(row, col, xf, value)])
        },
        sid::BLANK => {
            record.require_len(6)?;
            let (row, col, xf) = (cursor.read_u16()?, cursor.read_u16()?, cursor.read_u16()?);
            Ok(vec![ParsedCell::cell(row, col, xf, CellValue::Blank)])
        },
        sid::MULBLANK => {
            record.require_len(6)?;
            let row = cursor.read_u16()?;
            let first_col = cursor.read_u16()?;
            let count = (record.data.len() - 6) / 2;
            let mut cells = Vec::with_capacity(count);
            for i in 0..count {
                let xf = cursor.read_u16()?;
                cells.push(ParsedCell::cell(row, first_col + i as u16, xf, CellValue::Blank));
            }
            Ok(cells)
        },
        sid::FORMULA => {
            let (row, col, xf, formula) = parse_formula(record)?;
            Ok(vec![ParsedCell::cell(row, col, xf, CellValue::Formula(Box::new(formula)))])
        },
        other => Err(XlsError::invalid_record(other, "not a cell record")),
    }
}

fn parse_formula(record: &Record) -> XlsResult<(u16, u16, u16, FormulaCell)> {
    record.require_len(22)?;
    let mut cursor = record.cursor();
    let (row, col, xf) = (cursor.read_u16()?, cursor.read_u16()?, cursor.read_u16()?);
    let result = cursor.read_array::<8>()?;
    let cached = if result[6] == 0xFF && result[7] == 0xFF {
        match result[0] {
            0x00 => CachedValue::String(String::new()),
            0x01 => CachedValue::Bool(result[2] != 0),
            0x02 => CachedValue::Error(ErrorCode::from_code(result[2]).unwrap_or(ErrorCode::NA)),
            _ => CachedValue::Empty,
        }
    } else {
        CachedValue::Number(f64::from_le_bytes(result))
    };
    let flags = FormulaFlags::from_bits_retain(cursor.read_u16()?);
    cursor.skip(4)?;
    let cce = cursor.read_u16()? as usize;
    let tokens = Ptg::read_tokens(&mut cursor, cce)?;
    Ok((
        row,
        col,
        xf,
        FormulaCell {
            cached,
            flags,
            tokens,
            array: None,
        },
    ))
}

/// SHRFMLA: tokens shared by every formula in `range`.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedFormulaRecord {
    pub range: RangeAddress,
    pub tokens: Vec<Ptg>,
}

impl SharedFormulaRecord {
    pub fn parse(record: &Record) -> XlsResult<Self> {
        record.require_len(10)?;
        let mut cursor = record.cursor();
        let range = RangeAddress::read_refu(&mut cursor)?;
        // reserved, cUse
        cursor.skip(2)?;
        let cce = cursor.read_u16()? as usize;
        let tokens = Ptg::read_tokens(&mut cursor, cce)?;
        Ok(Self { range, tokens })
    }

    pub fn to_record(&self) -> Record {
        let mut body = Vec::new();
        self.range.write_refu(&mut body);
        body.put_u8(0);
        body.put_u8(0);
        let mut rgce = Vec::new();
        let cce = Ptg::write_tokens(&self.tokens, &mut rgce);
        body.put_u16_le(cce as u16);
        body.extend_from_slice(&rgce);
        Record::new(sid::SHRFMLA, body)
    }
}

/// Text result of the preceding FORMULA record.
pub fn parse_string_record(record: &Record) -> XlsResult<String> {
    let mut cursor = record.cursor();
    Ok(strings::read_unicode_string(&mut cursor)?)
}

fn cell_header(row: u16, col: u16, xf_index: u16, capacity: usize) -> Vec<u8> {
    let mut body = Vec::with_capacity(capacity);
    body.put_u16_le(row);
    body.put_u16_le(col);
    body.put_u16_le(xf_index);
    body
}

fn encode_cached(cached: &CachedValue, out: &mut Vec<u8>) {
    let special = |out: &mut Vec<u8>, kind: u8, value: u8| {
        out.extend_from_slice(&[kind, 0, value, 0, 0, 0, 0xFF, 0xFF]);
    };
    match cached {
        CachedValue::Number(n) => out.put_f64_le(*n),
        CachedValue::String(_) => special(out, 0x00, 0),
        CachedValue::Bool(b) => special(out, 0x01, *b as u8),
        CachedValue::Error(e) => special(out, 0x02, e.code()),
        CachedValue::Empty => special(out, 0x03, 0),
    }
}

/// Encode one cell; formulas may produce ARRAY and STRING records too.
pub fn encode_cell(row: u16, col: u16, cell: &XlsCell) -> Vec<Record> {
    let xf = cell.xf_index;
    match &cell.value {
        CellValue::Blank => vec![Record::new(sid::BLANK, cell_header(row, col, xf, 6))],
        CellValue::Number(n) => {
            let mut body = cell_header(row, col, xf, 14);
            body.put_f64_le(*n);
            vec![Record::new(sid::NUMBER, body)]
        },
        CellValue::Label(index) => {
            let mut body = cell_header(row, col, xf, 10);
            body.put_u32_le(*index);
            vec![Record::new(sid::LABELSST, body)]
        },
        CellValue::Bool(b) => {
            let mut body = cell_header(row, col, xf, 8);
            body.put_u8(*b as u8);
            body.put_u8(0);
            vec![Record::new(sid::BOOLERR, body)]
        },
        CellValue::Error(e) => {
            let mut body = cell_header(row, col, xf, 8);
            body.put_u8(e.code());
            body.put_u8(1);
            vec![Record::new(sid::BOOLERR, body)]
        },
        CellValue::Formula(formula) => {
            let mut body = cell_header(row, col, xf, 32);
            encode_cached(&formula.cached, &mut body);
            body.put_u16_le((formula.flags - FormulaFlags::SHARED).bits());
            body.put_u32_le(0);
            let mut rgce = Vec::new();
            let cce = Ptg::write_tokens(&formula.tokens, &mut rgce);
            body.put_u16_le(cce as u16);
            body.extend_from_slice(&rgce);

            let mut records = vec![Record::new(sid::FORMULA, body)];
            if let Some(array) = &formula.array {
                records.push(array.clone());
            }
            if let CachedValue::String(text) = &formula.cached {
                let mut body = Vec::with_capacity(3 + text.len() * 2);
                strings::write_unicode_string(&mut body, text);
                records.push(Record::new(sid::STRING, body));
            }
            records
        },
    }
}

/// MULBLANK for blanks at `first_col..first_col + xf_indexes.len()`.
pub fn encode_mulblank(row: u16, first_col: u16, xf_indexes: &[u16]) -> Record {
    let mut body = Vec::with_capacity(6 + xf_indexes.len() * 2);
    body.put_u16_le(row);
    body.put_u16_le(first_col);
    for xf in xf_indexes {
        body.put_u16_le(*xf);
    }
    body.put_u16_le(first_col + xf_indexes.len() as u16 - 1);
    Record::new(sid::MULBLANK, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::ptg::{CellRef, OperandClass};

    #[test]
    fn test_rk_numbers() {
        // integer 42
        assert_eq!(decode_rk((42 << 2) | 0x02), 42.0);
        // integer -5
        assert_eq!(decode_rk(((-5i32 << 2) as u32) | 0x02), -5.0);
        // 1234 / 100
        assert_eq!(decode_rk((1234 << 2) | 0x03), 12.34);
        // 1.5 as the top 30 bits of the double
        let bits = (1.5f64.to_bits() >> 32) as u32;
        assert_eq!(decode_rk(bits), 1.5);
    }

    #[test]
    fn test_mulrk_and_mulblank_expand() {
        let mut body = vec![3, 0, 1, 0];
        for value in [10u32, 20] {
            body.extend_from_slice(&15u16.to_le_bytes());
            body.extend_from_slice(&((value << 2) | 0x02).to_le_bytes());
        }
        body.extend_from_slice(&2u16.to_le_bytes());
        let cells = parse_cell_record(&Record::new(sid::MULRK, body)).unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!((cells[1].row, cells[1].col), (3, 2));
        assert_eq!(cells[1].value, ParsedValue::Cell(CellValue::Number(20.0)));

        let record = encode_mulblank(0, 4, &[15, 16, 17]);
        let cells = parse_cell_record(&record).unwrap();
        assert_eq!(cells.iter().map(|c| c.col).collect::<Vec<_>>(), vec![4, 5, 6]);
        assert_eq!(cells[2].xf_index, 17);
    }

    #[test]
    fn test_formula_with_string_result() {
        let mut formula = FormulaCell::new(vec![
            Ptg::Ref {
                class: OperandClass::Value,
                cell: CellRef::relative(0, 0),
            },
            Ptg::Str("x".to_string()),
            Ptg::Concat,
        ]);
        formula.cached = CachedValue::String("ax".to_string());
        formula.flags |= FormulaFlags::SHARED;
        let cell = XlsCell::new(CellValue::Formula(Box::new(formula.clone())));
        let records = encode_cell(1, 2, &cell);
        assert_eq!(
            records.iter().map(|r| r.sid).collect::<Vec<_>>(),
            vec![sid::FORMULA, sid::STRING]
        );

        let parsed = parse_cell_record(&records[0]).unwrap();
        let ParsedValue::Cell(CellValue::Formula(decoded)) = &parsed[0].value else {
            panic!("expected a formula");
        };
        // shared flag is dropped on write, the text arrives in STRING
        assert!(!decoded.flags.contains(FormulaFlags::SHARED));
        assert_eq!(decoded.cached, CachedValue::String(String::new()));
        assert_eq!(decoded.tokens, formula.tokens);
        assert_eq!(parse_string_record(&records[1]).unwrap(), "ax");
    }

    #[test]
    fn test_boolerr() {
        let cell = XlsCell::new(CellValue::Error(ErrorCode::Div0));
        let records = encode_cell(0, 0, &cell);
        let parsed = parse_cell_record(&records[0]).unwrap();
        assert_eq!(parsed[0].value, ParsedValue::Cell(CellValue::Error(ErrorCode::Div0)));

        let bad = Record::new(sid::BOOLERR, vec![0, 0, 0, 0, 15, 0, 0x63, 1]);
        assert!(matches!(
            parse_cell_record(&bad),
            Err(XlsError::InvalidRecord { .. })
        ));
    }
}
