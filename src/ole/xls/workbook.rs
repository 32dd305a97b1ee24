//! Workbook model over a BIFF8 `Workbook` stream.

use std::cell::RefCell;

use crate::common::config::ReadOptions;
use crate::ole::filesystem::CompoundFile;
use crate::ole::xls::ErrorCode;
use crate::ole::xls::cell::{CellValue, FormulaCell, XlsCell};
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::link_table::{LinkTable, NameRecord};
use crate::ole::xls::ptg::{
    ExternSheet, FormulaRenderingWorkbook, ParsingWorkbook, Ptg, RowShifter, parse_formula, render_formula,
};
use crate::ole::xls::records::{
    BofRecord, BofType, BoundSheetRecord, Record, RecordStream, RecordWriter, default_window1, sid,
};
use crate::ole::xls::sheet::InternalSheet;
use crate::ole::xls::sst::SharedStringTable;

/// Name of the workbook stream in the compound file
pub const WORKBOOK_STREAM: &str = "Workbook";
/// Name used by files written before BIFF8
const LEGACY_WORKBOOK_STREAM: &str = "Book";

/// CODEPAGE value for UTF-16 text, the only one BIFF8 writers use
const CODEPAGE_UTF16: u16 = 1200;

const MAX_SHEET_NAME_LENGTH: usize = 31;

/// A workbook: global records, shared strings, link table and sheets.
#[derive(Debug, Clone)]
pub struct InternalWorkbook {
    codepage: u16,
    sheets: Vec<InternalSheet>,
    sst: SharedStringTable,
    link_table: LinkTable,
    /// Unmodelled globals before the first BOUNDSHEET
    globals_head: Vec<Record>,
    /// Unmodelled globals after it
    globals_tail: Vec<Record>,
}

impl Default for InternalWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl InternalWorkbook {
    /// An empty workbook without sheets.
    pub fn new() -> Self {
        Self {
            codepage: CODEPAGE_UTF16,
            sheets: Vec::new(),
            sst: SharedStringTable::new(),
            link_table: LinkTable::new(),
            globals_head: vec![default_window1()],
            globals_tail: Vec::new(),
        }
    }

    /// Load the `Workbook` stream of `file`.
    pub fn from_compound_file(file: &CompoundFile, options: &ReadOptions) -> XlsResult<Self> {
        let root = file.root();
        let stream = if root.has_entry(WORKBOOK_STREAM) {
            root.document(WORKBOOK_STREAM)?
        } else if root.has_entry(LEGACY_WORKBOOK_STREAM) {
            root.document(LEGACY_WORKBOOK_STREAM)?
        } else {
            // Reports the missing stream with the filesystem's format hint.
            root.document(WORKBOOK_STREAM)?
        };
        Self::from_stream(stream, options)
    }

    /// Parse a complete workbook stream.
    pub fn from_stream(stream: &[u8], options: &ReadOptions) -> XlsResult<Self> {
        let mut records = RecordStream::new(stream);
        let bof = records
            .next()
            .ok_or_else(|| XlsError::UnexpectedEndOfStream("empty workbook stream".to_string()))??;
        if bof.sid != sid::BOF || BofRecord::parse(&bof)?.substream != BofType::Globals {
            return Err(XlsError::invalid_record(
                bof.sid,
                "workbook stream does not start with a globals BOF",
            ));
        }

        let mut workbook = Self {
            codepage: CODEPAGE_UTF16,
            sheets: Vec::new(),
            sst: SharedStringTable::new(),
            link_table: LinkTable::new(),
            globals_head: Vec::new(),
            globals_tail: Vec::new(),
        };
        let mut bound_sheets = Vec::new();
        let mut finished = false;
        for record in records {
            let record = record?;
            match record.sid {
                sid::EOF => {
                    finished = true;
                    break;
                },
                sid::FILEPASS => return Err(XlsError::PasswordProtected),
                sid::CODEPAGE => {
                    record.require_len(2)?;
                    workbook.codepage = record.cursor().read_u16()?;
                },
                sid::BOUNDSHEET => bound_sheets.push(BoundSheetRecord::parse(&record)?),
                sid::SST => workbook.sst = SharedStringTable::parse(&record)?,
                // Bucket offsets into the SST go stale once strings change.
                sid::EXTSST => {},
                s if LinkTable::is_link_record(s) => workbook.link_table.read_record(&record)?,
                _ if bound_sheets.is_empty() => workbook.globals_head.push(record),
                _ => workbook.globals_tail.push(record),
            }
        }
        if !finished {
            return Err(XlsError::UnexpectedEndOfStream(
                "workbook globals have no EOF record".to_string(),
            ));
        }
        log::debug!(
            "workbook globals: codepage {}, {} sheets, {} shared strings",
            workbook.codepage,
            bound_sheets.len(),
            workbook.sst.len()
        );

        for bound in &bound_sheets {
            let sheet = InternalSheet::read(stream, bound, &mut workbook.sst, options)?;
            workbook.sheets.push(sheet);
        }
        workbook.register_sheet_links();
        Ok(workbook)
    }

    /// Make sure every sheet has its own EXTERNSHEET entry, so formulas
    /// can refer to any sheet without growing the table while parsing.
    fn register_sheet_links(&mut self) {
        if self.sheets.is_empty() {
            return;
        }
        self.link_table.set_sheet_count(self.sheets.len());
        for index in 0..self.sheets.len() {
            self.link_table.add_extern_sheet(index, index);
        }
    }

    /// Serialize globals followed by every sheet substream.
    pub fn to_stream(&self) -> Vec<u8> {
        let mut writer = RecordWriter::new();
        BofRecord {
            substream: BofType::Globals,
        }
        .write(&mut writer);
        writer.write(sid::CODEPAGE, &self.codepage.to_le_bytes());
        for record in &self.globals_head {
            writer.write_record(record);
        }
        let position_offsets: Vec<usize> = self
            .sheets
            .iter()
            .map(|sheet| sheet.bound_sheet().write(&mut writer))
            .collect();
        self.link_table.write(&mut writer);
        self.sst.write(&mut writer);
        for record in &self.globals_tail {
            writer.write_record(record);
        }
        writer.write(sid::EOF, &[]);

        for (sheet, offset) in self.sheets.iter().zip(position_offsets) {
            let position = writer.position() as u32;
            writer.patch_u32(offset, position);
            sheet.write(&mut writer);
        }
        writer.into_inner()
    }

    /// A compound file holding this workbook as its `Workbook` stream.
    pub fn to_compound_file(&self) -> XlsResult<CompoundFile> {
        let mut file = CompoundFile::new();
        file.root_mut().create_document(WORKBOOK_STREAM, self.to_stream())?;
        Ok(file)
    }

    pub fn codepage(&self) -> u16 {
        self.codepage
    }

    pub fn sheets(&self) -> &[InternalSheet] {
        &self.sheets
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet(&self, index: usize) -> Option<&InternalSheet> {
        self.sheets.get(index)
    }

    fn sheet_mut(&mut self, index: usize) -> XlsResult<&mut InternalSheet> {
        self.sheets
            .get_mut(index)
            .ok_or(XlsError::SheetIndexOutOfRange(index))
    }

    /// Index of the sheet named `name`, compared case-insensitively.
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|sheet| sheet.name().eq_ignore_ascii_case(name))
    }

    pub fn sheet_by_name(&self, name: &str) -> XlsResult<&InternalSheet> {
        self.sheet_index(name)
            .map(|index| &self.sheets[index])
            .ok_or_else(|| XlsError::WorksheetNotFound(name.to_string()))
    }

    fn validate_sheet_name(&self, name: &str, renamed: Option<usize>) -> XlsResult<()> {
        let length = name.chars().count();
        if length == 0 || length > MAX_SHEET_NAME_LENGTH {
            return Err(XlsError::InvalidData(format!(
                "sheet name '{name}' must have 1 to {MAX_SHEET_NAME_LENGTH} characters"
            )));
        }
        if let Some(c) = name.chars().find(|c| matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\')) {
            return Err(XlsError::InvalidData(format!(
                "sheet name '{name}' contains '{c}'"
            )));
        }
        match self.sheet_index(name) {
            Some(existing) if Some(existing) != renamed => Err(XlsError::DuplicateSheetName(name.to_string())),
            _ => Ok(()),
        }
    }

    /// Append an empty worksheet and return its index.
    pub fn add_sheet(&mut self, name: &str) -> XlsResult<usize> {
        self.validate_sheet_name(name, None)?;
        self.sheets.push(InternalSheet::new(name));
        let index = self.sheets.len() - 1;
        self.link_table.set_sheet_count(self.sheets.len());
        self.link_table.add_extern_sheet(index, index);
        Ok(index)
    }

    pub fn rename_sheet(&mut self, index: usize, name: &str) -> XlsResult<()> {
        self.validate_sheet_name(name, Some(index))?;
        self.sheet_mut(index)?.set_name(name);
        Ok(())
    }

    pub fn sst(&self) -> &SharedStringTable {
        &self.sst
    }

    pub fn link_table(&self) -> &LinkTable {
        &self.link_table
    }

    /// Text of shared string `index`.
    pub fn string(&self, index: u32) -> Option<&str> {
        self.sst.get(index)
    }

    pub fn cell(&self, sheet: usize, row: u16, col: u16) -> Option<&XlsCell> {
        self.sheets.get(sheet)?.cell(row, col)
    }

    fn set_value(&mut self, sheet: usize, row: u16, col: u16, value: CellValue) -> XlsResult<()> {
        let target = self.sheet_mut(sheet)?;
        let xf_index = target
            .cell(row, col)
            .map_or(XlsCell::DEFAULT_XF, |cell| cell.xf_index);
        target
            .values_mut()
            .insert_cell(row, col, XlsCell { xf_index, value })
    }

    pub fn set_number(&mut self, sheet: usize, row: u16, col: u16, value: f64) -> XlsResult<()> {
        self.set_value(sheet, row, col, CellValue::Number(value))
    }

    pub fn set_string(&mut self, sheet: usize, row: u16, col: u16, value: &str) -> XlsResult<()> {
        self.sheet_mut(sheet)?;
        let index = self.sst.add(value);
        self.set_value(sheet, row, col, CellValue::Label(index))
    }

    pub fn set_bool(&mut self, sheet: usize, row: u16, col: u16, value: bool) -> XlsResult<()> {
        self.set_value(sheet, row, col, CellValue::Bool(value))
    }

    pub fn set_error(&mut self, sheet: usize, row: u16, col: u16, value: ErrorCode) -> XlsResult<()> {
        self.set_value(sheet, row, col, CellValue::Error(value))
    }

    pub fn set_blank(&mut self, sheet: usize, row: u16, col: u16) -> XlsResult<()> {
        self.set_value(sheet, row, col, CellValue::Blank)
    }

    /// Parse `formula` as entered on `sheet` and store it at `(row, col)`.
    pub fn set_formula(&mut self, sheet: usize, row: u16, col: u16, formula: &str) -> XlsResult<()> {
        if sheet >= self.sheets.len() {
            return Err(XlsError::SheetIndexOutOfRange(sheet));
        }
        let tokens = self.parse_on_sheet(formula, sheet)?;
        self.set_formula_tokens(sheet, row, col, tokens)
    }

    pub fn set_formula_tokens(&mut self, sheet: usize, row: u16, col: u16, tokens: Vec<Ptg>) -> XlsResult<()> {
        self.set_value(
            sheet,
            row,
            col,
            CellValue::Formula(Box::new(FormulaCell::new(tokens))),
        )
    }

    pub fn remove_cell(&mut self, sheet: usize, row: u16, col: u16) -> XlsResult<Option<XlsCell>> {
        Ok(self.sheet_mut(sheet)?.values_mut().remove_cell(row, col))
    }

    /// Parse `formula` as entered on `sheet`, adding EXTERNSHEET entries
    /// for sheet spans such as `Jan:Mar!A1` that are not linked yet.
    fn parse_on_sheet(&mut self, formula: &str, sheet: usize) -> XlsResult<Vec<Ptg>> {
        let recorder = SheetSpanRecorder {
            workbook: self,
            spans: RefCell::default(),
        };
        let tokens = parse_formula(formula, &recorder, sheet)?;
        let spans = recorder.spans.into_inner();
        if spans.is_empty() {
            return Ok(tokens);
        }
        for (first, last) in spans {
            self.link_table.add_extern_sheet(first, last);
        }
        Ok(parse_formula(formula, self, sheet)?)
    }

    /// Formula text of the cell at `(row, col)`, `None` when it holds no formula.
    pub fn formula_text(&self, sheet: usize, row: u16, col: u16) -> XlsResult<Option<String>> {
        match self.cell(sheet, row, col).and_then(XlsCell::formula) {
            Some(formula) => Ok(Some(render_formula(&formula.tokens, self)?)),
            None => Ok(None),
        }
    }

    /// Define a name whose definition is parsed from `formula`; returns its
    /// 1-based index.
    pub fn define_name(&mut self, name: &str, scope: Option<usize>, formula: &str) -> XlsResult<u16> {
        match scope {
            Some(sheet) if sheet >= self.sheets.len() => return Err(XlsError::SheetIndexOutOfRange(sheet)),
            _ => {},
        }
        let exists = self.link_table.names().iter().any(|n| {
            n.sheet_scope as usize == scope.map_or(0, |s| s + 1) && n.display_name().eq_ignore_ascii_case(name)
        });
        if exists {
            return Err(XlsError::InvalidData(format!("name '{name}' is already defined")));
        }
        let tokens = self.parse_on_sheet(formula, scope.unwrap_or(0))?;
        Ok(self.link_table.add_name(NameRecord::new(name, scope, tokens)))
    }

    /// Delete `count` rows starting at `first_row` from `sheet` and move the
    /// rows below up. References to the moved rows are adjusted in every
    /// sheet and in defined names; references to deleted rows become `#REF!`.
    pub fn remove_rows(&mut self, sheet: usize, first_row: u16, count: u16) -> XlsResult<()> {
        if sheet >= self.sheets.len() {
            return Err(XlsError::SheetIndexOutOfRange(sheet));
        }
        if count == 0 {
            return Ok(());
        }
        let shifter = RowShifter::remove_rows(sheet, first_row, count);
        let link_table = &self.link_table;
        let resolve = |index: u16| link_table.resolve_extern_sheet(index);
        for (index, target) in self.sheets.iter_mut().enumerate() {
            if index == sheet {
                target.remove_rows(&shifter, resolve);
            } else {
                target.values_mut().adjust_formulas(&shifter, index, resolve);
            }
        }

        let extern_count = (0..=u16::MAX)
            .take_while(|&i| self.link_table.extern_sheet(i).is_some())
            .count();
        let externs: Vec<_> = (0..extern_count as u16)
            .map(|i| self.link_table.resolve_extern_sheet(i))
            .collect();
        for name in self.link_table.names_mut() {
            if let Some(tokens) = name.tokens.as_mut() {
                // Names have no sheet of their own: only 3D references move.
                shifter.adjust_formula(tokens, usize::MAX, |i| externs.get(i as usize).copied().flatten());
            }
        }
        Ok(())
    }
}

/// Parser context that notes the sheet spans missing from the link table.
struct SheetSpanRecorder<'a> {
    workbook: &'a InternalWorkbook,
    spans: RefCell<Vec<(usize, usize)>>,
}

impl ParsingWorkbook for SheetSpanRecorder<'_> {
    fn sheet_index(&self, name: &str) -> Option<usize> {
        self.workbook.sheet_index(name)
    }

    fn extern_sheet_index(&self, first_sheet: usize, last_sheet: usize) -> Option<u16> {
        self.workbook
            .link_table
            .extern_sheet_index(first_sheet, last_sheet)
            .or_else(|| {
                self.spans.borrow_mut().push((first_sheet, last_sheet));
                Some(0)
            })
    }

    fn name_index(&self, name: &str, sheet: usize) -> Option<u16> {
        self.workbook.link_table.name_index(name, sheet)
    }
}

impl ParsingWorkbook for InternalWorkbook {
    fn sheet_index(&self, name: &str) -> Option<usize> {
        InternalWorkbook::sheet_index(self, name)
    }

    fn extern_sheet_index(&self, first_sheet: usize, last_sheet: usize) -> Option<u16> {
        self.link_table.extern_sheet_index(first_sheet, last_sheet)
    }

    fn name_index(&self, name: &str, sheet: usize) -> Option<u16> {
        self.link_table.name_index(name, sheet)
    }
}

impl FormulaRenderingWorkbook for InternalWorkbook {
    fn sheet_name_by_extern_index(&self, extern_index: u16) -> Option<ExternSheet> {
        if let Some((first, last)) = self.link_table.resolve_extern_sheet(extern_index) {
            return Some(ExternSheet {
                workbook: None,
                first_sheet: self.sheets.get(first)?.name().to_string(),
                last_sheet: self.sheets.get(last)?.name().to_string(),
            });
        }
        let (url, first, last) = self.link_table.external_sheet_names(extern_index)?;
        let first = first?.to_string();
        Some(ExternSheet {
            workbook: Some(url.trim_start_matches(|c: char| c.is_control()).to_string()),
            last_sheet: last.map_or_else(|| first.clone(), str::to_string),
            first_sheet: first,
        })
    }

    fn name_text(&self, index: u16) -> Option<String> {
        self.link_table.name(index).map(NameRecord::display_name)
    }

    fn external_name_text(&self, extern_index: u16, name_index: u16) -> Option<String> {
        self.link_table
            .external_name(extern_index, name_index)
            .map(str::to_string)
    }
}

#[cfg(feature = "eval_engine")]
impl crate::sheet::eval::EvaluationWorkbook for InternalWorkbook {
    fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    fn sheet_index(&self, name: &str) -> Option<usize> {
        InternalWorkbook::sheet_index(self, name)
    }

    fn sheet_name(&self, sheet: usize) -> Option<&str> {
        self.sheets.get(sheet).map(InternalSheet::name)
    }

    fn cell(&self, sheet: usize, row: u16, col: u16) -> Option<crate::sheet::eval::EvaluationCell<'_>> {
        use crate::sheet::eval::EvaluationCell;

        let cell = InternalWorkbook::cell(self, sheet, row, col)?;
        Some(match &cell.value {
            CellValue::Blank => EvaluationCell::Blank,
            CellValue::Number(n) => EvaluationCell::Number(*n),
            CellValue::Label(index) => EvaluationCell::String(self.sst.get(*index).unwrap_or_default()),
            CellValue::Bool(b) => EvaluationCell::Bool(*b),
            CellValue::Error(e) => EvaluationCell::Error(*e),
            CellValue::Formula(formula) => EvaluationCell::Formula {
                tokens: &formula.tokens,
                cached: &formula.cached,
            },
        })
    }

    fn resolve_extern_sheet(&self, extern_index: u16) -> Option<(usize, usize)> {
        self.link_table.resolve_extern_sheet(extern_index)
    }

    fn name_formula(&self, index: u16) -> Option<&[Ptg]> {
        self.link_table.name(index)?.tokens.as_deref()
    }

    fn used_range(&self, sheet: usize) -> Option<(u16, u16)> {
        let values = self.sheets.get(sheet)?.values();
        Some((values.last_row()?, values.last_col()?))
    }
}
