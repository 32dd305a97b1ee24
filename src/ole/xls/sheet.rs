//! One sheet substream of a workbook.

use std::collections::BTreeMap;

use crate::common::config::ReadOptions;
use crate::ole::xls::aggregates::{SharedValueManager, ValueRecordsAggregate};
use crate::ole::xls::cell::{self, CachedValue, CellValue, ParsedValue, SharedFormulaRecord, XlsCell};
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::ptg::{RowShifter, cell_name};
use crate::ole::xls::records::{
    BofRecord, BofType, BoundSheetRecord, DimensionsRecord, Record, RecordStream, RecordWriter, RowRecord,
    SheetVisibility, default_window2, sid,
};
use crate::ole::xls::sst::SharedStringTable;

/// Rows written between two DBCELL positions in files produced by Excel
const ROWS_PER_BLOCK: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Leading,
    Cells,
    Trailing,
}

/// A sheet: cells, row properties and the records this crate does not model.
#[derive(Debug, Clone)]
pub struct InternalSheet {
    name: String,
    visibility: SheetVisibility,
    sheet_type: u8,
    substream: BofType,
    values: ValueRecordsAggregate,
    rows: BTreeMap<u16, RowRecord>,
    /// Records between BOF and DIMENSIONS
    leading: Vec<Record>,
    /// Records after the cell table up to EOF
    trailing: Vec<Record>,
}

impl InternalSheet {
    /// An empty worksheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: SheetVisibility::Visible,
            sheet_type: BoundSheetRecord::WORKSHEET,
            substream: BofType::Worksheet,
            values: ValueRecordsAggregate::new(),
            rows: BTreeMap::new(),
            leading: Vec::new(),
            trailing: vec![default_window2()],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn visibility(&self) -> SheetVisibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: SheetVisibility) {
        self.visibility = visibility;
    }

    /// Whether this is a worksheet rather than a chart or macro sheet.
    pub fn is_worksheet(&self) -> bool {
        self.substream == BofType::Worksheet
    }

    pub fn values(&self) -> &ValueRecordsAggregate {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ValueRecordsAggregate {
        &mut self.values
    }

    pub fn cell(&self, row: u16, col: u16) -> Option<&XlsCell> {
        self.values.cell(row, col)
    }

    pub fn row_record(&self, row: u16) -> Option<&RowRecord> {
        self.rows.get(&row)
    }

    pub fn set_row_record(&mut self, row: u16, record: RowRecord) {
        self.rows.insert(row, record);
    }

    /// Used range with exclusive ends, as stored in DIMENSIONS.
    pub fn dimensions(&self) -> DimensionsRecord {
        match (self.values.first_row(), self.values.last_row()) {
            (Some(first_row), Some(last_row)) => DimensionsRecord {
                first_row: first_row as u32,
                last_row: last_row as u32 + 1,
                first_col: self.values.first_col().unwrap_or(0),
                last_col: self.values.last_col().map_or(0, |c| c + 1),
            },
            _ => DimensionsRecord::default(),
        }
    }

    /// Delete the rows described by `shifter` from this sheet.
    pub fn remove_rows(&mut self, shifter: &RowShifter, resolve_extern: impl Fn(u16) -> Option<(usize, usize)>) {
        self.values.remove_rows(shifter, resolve_extern);
        let first = shifter.first_row();
        let end = first as u32 + shifter.count() as u32;
        let moved = self.rows.split_off(&first);
        for (row, record) in moved {
            if (row as u32) >= end {
                self.rows.insert(row - shifter.count(), record);
            }
        }
    }

    /// Read the substream at `bound.position`; text cells are interned in `sst`.
    pub(crate) fn read(
        stream: &[u8],
        bound: &BoundSheetRecord,
        sst: &mut SharedStringTable,
        options: &ReadOptions,
    ) -> XlsResult<Self> {
        let mut records = RecordStream::at(stream, bound.position as usize);
        let bof = match records.next() {
            Some(record) => record?,
            None => {
                return Err(XlsError::UnexpectedEndOfStream(format!(
                    "sheet '{}' starts past the end of the stream",
                    bound.name
                )));
            },
        };
        if bof.sid != sid::BOF {
            return Err(XlsError::invalid_record(
                bof.sid,
                format!("sheet '{}' does not start with BOF", bound.name),
            ));
        }
        let substream = BofRecord::parse(&bof)?.substream;

        let mut sheet = Self {
            name: bound.name.clone(),
            visibility: bound.visibility,
            sheet_type: bound.sheet_type,
            substream,
            values: ValueRecordsAggregate::new(),
            rows: BTreeMap::new(),
            leading: Vec::new(),
            trailing: Vec::new(),
        };

        let mut shared = SharedValueManager::new();
        let mut phase = Phase::Leading;
        let mut depth = 0usize;
        let mut last_formula: Option<(u16, u16)> = None;
        let mut finished = false;

        for record in records {
            let record = record?;
            // Embedded substreams (charts in a worksheet) are kept verbatim.
            if depth > 0 || record.sid == sid::BOF || !sheet.is_worksheet() {
                match record.sid {
                    sid::BOF => depth += 1,
                    sid::EOF if depth == 0 => {
                        finished = true;
                        break;
                    },
                    sid::EOF => depth -= 1,
                    _ => {},
                }
                sheet.keep(phase, record);
                continue;
            }

            match record.sid {
                sid::EOF => {
                    finished = true;
                    break;
                },
                sid::INDEX | sid::DBCELL => {},
                sid::DIMENSIONS if phase == Phase::Leading => phase = Phase::Cells,
                sid::ROW => {
                    phase = phase.enter_cells();
                    let (row, row_record) = RowRecord::parse(&record)?;
                    sheet.rows.insert(row, row_record);
                },
                sid::SHRFMLA => shared.register(SharedFormulaRecord::parse(&record)?),
                sid::STRING => {
                    let text = cell::parse_string_record(&record)?;
                    match last_formula.and_then(|(r, c)| sheet.values.cell_mut(r, c)) {
                        Some(XlsCell {
                            value: CellValue::Formula(formula),
                            ..
                        }) => formula.cached = CachedValue::String(text),
                        _ => log::warn!("STRING record without a preceding formula in sheet '{}'", sheet.name),
                    }
                },
                sid::ARRAY | sid::TABLE => match last_formula.and_then(|(r, c)| sheet.values.cell_mut(r, c)) {
                    Some(XlsCell {
                        value: CellValue::Formula(formula),
                        ..
                    }) => formula.array = Some(record),
                    _ => {
                        log::warn!(
                            "record 0x{:04X} without a preceding formula in sheet '{}'",
                            record.sid,
                            sheet.name
                        );
                        sheet.keep(phase, record);
                    },
                },
                s if cell::is_cell_record(s) => {
                    phase = phase.enter_cells();
                    last_formula = None;
                    for parsed in cell::parse_cell_record(&record)? {
                        let value = match parsed.value {
                            ParsedValue::Cell(value) => value,
                            ParsedValue::Text(text) => CellValue::Label(sst.add(&text)),
                        };
                        match value {
                            CellValue::Label(index) if sst.get(index).is_none() => log::warn!(
                                "cell {} of sheet '{}' refers to missing shared string {index}",
                                cell_name(parsed.row as u32, parsed.col as u32),
                                sheet.name
                            ),
                            CellValue::Formula(_) => last_formula = Some((parsed.row, parsed.col)),
                            _ => {},
                        }
                        sheet.values.insert_cell(
                            parsed.row,
                            parsed.col,
                            XlsCell {
                                xf_index: parsed.xf_index,
                                value,
                            },
                        )?;
                    }
                },
                _ => {
                    if phase == Phase::Cells {
                        phase = Phase::Trailing;
                    }
                    sheet.keep(phase, record);
                },
            }
        }
        if !finished {
            return Err(XlsError::UnexpectedEndOfStream(format!(
                "sheet '{}' has no EOF record",
                sheet.name
            )));
        }

        for (row, col, formula) in sheet.values.formulas_mut() {
            shared.resolve(row, col, formula, options.shared_formulas)?;
        }
        log::debug!(
            "read sheet '{}': {} rows, {} shared formulas",
            sheet.name,
            sheet.values.row_count(),
            shared.len()
        );
        Ok(sheet)
    }

    fn keep(&mut self, phase: Phase, record: Record) {
        match phase {
            Phase::Leading => self.leading.push(record),
            Phase::Cells | Phase::Trailing => self.trailing.push(record),
        }
    }

    pub(crate) fn bound_sheet(&self) -> BoundSheetRecord {
        BoundSheetRecord {
            position: 0,
            visibility: self.visibility,
            sheet_type: self.sheet_type,
            name: self.name.clone(),
        }
    }

    /// Write BOF through EOF.
    pub(crate) fn write(&self, writer: &mut RecordWriter) {
        BofRecord {
            substream: self.substream,
        }
        .write(writer);
        for record in &self.leading {
            writer.write_record(record);
        }
        if self.is_worksheet() {
            self.dimensions().write(writer);
            self.write_cell_table(writer);
            for record in &self.trailing {
                writer.write_record(record);
            }
        }
        writer.write(sid::EOF, &[]);
    }

    fn write_cell_table(&self, writer: &mut RecordWriter) {
        let mut rows: Vec<u16> = self.rows.keys().copied().collect();
        rows.extend(self.values.iter().map(|(row, _, _)| row));
        rows.sort_unstable();
        rows.dedup();

        let default_row = RowRecord::default();
        for block in rows.chunks(ROWS_PER_BLOCK) {
            for &row in block {
                let mut cols = self.values.row_cells(row).map(|(col, _)| col);
                let first_col = cols.next();
                let last_col = cols.last().or(first_col);
                self.rows.get(&row).unwrap_or(&default_row).write(
                    writer,
                    row,
                    first_col.unwrap_or(0),
                    last_col.map_or(0, |c| c + 1),
                );
            }
            for &row in block {
                for record in self.values.row_records(row) {
                    writer.write_record(&record);
                }
            }
        }
    }
}

impl Phase {
    fn enter_cells(self) -> Self {
        match self {
            Phase::Leading => Phase::Cells,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::SharedFormulaPolicy;
    use crate::ole::xls::cell::{FormulaCell, FormulaFlags};
    use crate::ole::xls::ptg::{Ptg, RangeAddress};

    fn read_back(sheet: &InternalSheet, sst: &mut SharedStringTable) -> InternalSheet {
        let mut writer = RecordWriter::new();
        sheet.write(&mut writer);
        let bytes = writer.into_inner();
        InternalSheet::read(&bytes, &sheet.bound_sheet(), sst, &ReadOptions::new()).unwrap()
    }

    #[test]
    fn test_write_and_read_cells() {
        let mut sst = SharedStringTable::new();
        let mut sheet = InternalSheet::new("Data");
        let label = sst.add("hello");
        let values = sheet.values_mut();
        values.insert_cell(0, 0, XlsCell::new(CellValue::Number(1.25))).unwrap();
        values.insert_cell(0, 1, XlsCell::new(CellValue::Label(label))).unwrap();
        values.insert_cell(40, 3, XlsCell::new(CellValue::Bool(false))).unwrap();
        sheet.set_row_record(
            2,
            RowRecord {
                height: 600,
                ..RowRecord::default()
            },
        );

        let reread = read_back(&sheet, &mut sst);
        assert_eq!(reread.values(), sheet.values());
        assert_eq!(reread.row_record(2).map(|r| r.height), Some(600));
        assert_eq!(
            reread.dimensions(),
            DimensionsRecord {
                first_row: 0,
                last_row: 41,
                first_col: 0,
                last_col: 4,
            }
        );
    }

    fn shared_stream(policy_breaker: bool) -> Vec<u8> {
        let mut writer = RecordWriter::new();
        BofRecord {
            substream: BofType::Worksheet,
        }
        .write(&mut writer);
        DimensionsRecord::default().write(&mut writer);
        for row in 0..3u16 {
            let mut formula = FormulaCell::new(vec![Ptg::Exp { row: 0, col: 0 }]);
            formula.flags |= FormulaFlags::SHARED;
            for mut record in cell::encode_cell(row, 0, &XlsCell::new(CellValue::Formula(Box::new(formula)))) {
                if record.sid == sid::FORMULA {
                    // encode_cell drops the shared flag, put it back
                    record.data[14] |= FormulaFlags::SHARED.bits() as u8;
                }
                writer.write_record(&record);
            }
            if row == 0 && !policy_breaker {
                let group = SharedFormulaRecord {
                    range: RangeAddress::new(0, 2, 0, 0),
                    tokens: vec![Ptg::Str("shared".to_string())],
                };
                writer.write_record(&group.to_record());
            }
        }
        writer.write(sid::EOF, &[]);
        writer.into_inner()
    }

    #[test]
    fn test_shared_formulas_resolved_after_read() {
        let bytes = shared_stream(false);
        let bound = InternalSheet::new("S").bound_sheet();
        let sheet = InternalSheet::read(&bytes, &bound, &mut SharedStringTable::new(), &ReadOptions::new()).unwrap();
        for row in 0..3 {
            let formula = sheet.cell(row, 0).and_then(XlsCell::formula).unwrap();
            assert_eq!(formula.tokens, vec![Ptg::Str("shared".to_string())]);
        }

        let bytes = shared_stream(true);
        let strict = ReadOptions::new().with_shared_formula_policy(SharedFormulaPolicy::Strict);
        assert!(matches!(
            InternalSheet::read(&bytes, &bound, &mut SharedStringTable::new(), &strict),
            Err(XlsError::MissingSharedFormula { .. })
        ));
    }

    #[test]
    fn test_remove_rows_moves_row_records() {
        let mut sheet = InternalSheet::new("S");
        for row in [1u16, 3, 6] {
            sheet.set_row_record(
                row,
                RowRecord {
                    height: row * 100,
                    ..RowRecord::default()
                },
            );
        }
        sheet.remove_rows(&RowShifter::remove_rows(0, 2, 2), |_| None);
        assert_eq!(sheet.row_record(1).map(|r| r.height), Some(100));
        assert!(sheet.row_record(3).is_none());
        assert_eq!(sheet.row_record(4).map(|r| r.height), Some(600));
    }

    #[test]
    fn test_missing_eof_is_an_error() {
        let mut writer = RecordWriter::new();
        BofRecord {
            substream: BofType::Worksheet,
        }
        .write(&mut writer);
        let bytes = writer.into_inner();
        let bound = InternalSheet::new("S").bound_sheet();
        assert!(matches!(
            InternalSheet::read(&bytes, &bound, &mut SharedStringTable::new(), &ReadOptions::new()),
            Err(XlsError::UnexpectedEndOfStream(_))
        ));
    }
}
