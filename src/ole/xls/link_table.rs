//! Workbook link table: SUPBOOK, EXTERNNAME, EXTERNSHEET and NAME records.
//!
//! 3D references in formulas carry an index into the EXTERNSHEET list,
//! whose entries point at a SUPBOOK (external book) and a sheet span
//! inside it. Defined names are referenced by their 1-based position.

use bytes::BufMut;

use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::ptg::Ptg;
use crate::ole::xls::records::{Record, RecordWriter, sid};
use crate::ole::xls::strings;

const SUPBOOK_INTERNAL: u16 = 0x0401;
const SUPBOOK_ADD_IN: u16 = 0x3A01;

/// `fBuiltin` in the NAME record flags
pub const NAME_FLAG_BUILTIN: u16 = 0x0020;

const BUILTIN_NAMES: [&str; 14] = [
    "Consolidate_Area",
    "Auto_Open",
    "Auto_Close",
    "Extract",
    "Database",
    "Criteria",
    "Print_Area",
    "Print_Titles",
    "Recorder",
    "Data_Form",
    "Auto_Activate",
    "Auto_Deactivate",
    "Sheet_Title",
    "_FilterDatabase",
];

/// Display text of a built-in name code.
pub fn builtin_name(code: u8) -> Option<&'static str> {
    BUILTIN_NAMES.get(code as usize).copied()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupBookKind {
    /// Sheets of this workbook
    Internal { sheet_count: u16 },
    AddIn,
    External { url: String, sheet_names: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternName {
    pub name: String,
    /// Body of the EXTERNNAME record as read
    raw: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupBook {
    pub kind: SupBookKind,
    pub names: Vec<ExternName>,
}

impl SupBook {
    fn parse(record: &Record) -> XlsResult<Self> {
        record.require_len(4)?;
        let mut cursor = record.cursor();
        let sheet_count = cursor.read_u16()?;
        let marker = cursor.read_u16()?;
        let kind = match marker {
            SUPBOOK_INTERNAL => SupBookKind::Internal { sheet_count },
            SUPBOOK_ADD_IN => SupBookKind::AddIn,
            _ => {
                cursor.set_position(2)?;
                let url = strings::read_unicode_string(&mut cursor)?;
                let mut sheet_names = Vec::with_capacity(sheet_count as usize);
                for _ in 0..sheet_count {
                    sheet_names.push(strings::read_unicode_string(&mut cursor)?);
                }
                SupBookKind::External { url, sheet_names }
            },
        };
        Ok(Self {
            kind,
            names: Vec::new(),
        })
    }

    fn write(&self, writer: &mut RecordWriter) {
        let mut body = Vec::with_capacity(4);
        match &self.kind {
            SupBookKind::Internal { sheet_count } => {
                body.put_u16_le(*sheet_count);
                body.put_u16_le(SUPBOOK_INTERNAL);
            },
            SupBookKind::AddIn => {
                body.put_u16_le(1);
                body.put_u16_le(SUPBOOK_ADD_IN);
            },
            SupBookKind::External { url, sheet_names } => {
                body.put_u16_le(sheet_names.len() as u16);
                strings::write_unicode_string(&mut body, url);
                for name in sheet_names {
                    strings::write_unicode_string(&mut body, name);
                }
            },
        }
        writer.write(sid::SUPBOOK, &body);
        for name in &self.names {
            writer.write(sid::EXTERNNAME, &name.raw);
        }
    }
}

/// One EXTERNSHEET entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternSheetRef {
    pub supbook: u16,
    /// Negative for references that do not target a sheet
    pub first_sheet: i16,
    pub last_sheet: i16,
}

/// A defined name.
#[derive(Debug, Clone, PartialEq)]
pub struct NameRecord {
    pub flags: u16,
    pub keyboard_shortcut: u8,
    /// 1-based sheet the name is local to, 0 for workbook scope
    pub sheet_scope: u16,
    pub name: String,
    /// Built-in name code when [`NAME_FLAG_BUILTIN`] is set
    pub builtin: Option<u8>,
    /// Decoded definition, `None` when the tokens could not be decoded
    pub tokens: Option<Vec<Ptg>>,
    raw_formula: Vec<u8>,
    raw_cce: u16,
}

impl NameRecord {
    pub fn new(name: impl Into<String>, sheet_scope: Option<usize>, tokens: Vec<Ptg>) -> Self {
        Self {
            flags: 0,
            keyboard_shortcut: 0,
            sheet_scope: sheet_scope.map_or(0, |s| s as u16 + 1),
            name: name.into(),
            builtin: None,
            tokens: Some(tokens),
            raw_formula: Vec::new(),
            raw_cce: 0,
        }
    }

    /// Text used when the name appears in a formula.
    pub fn display_name(&self) -> String {
        match self.builtin.and_then(builtin_name) {
            Some(builtin) => builtin.to_string(),
            None => self.name.clone(),
        }
    }

    fn parse(record: &Record) -> XlsResult<Self> {
        record.require_len(15)?;
        let mut cursor = record.cursor();
        let flags = cursor.read_u16()?;
        let keyboard_shortcut = cursor.read_u8()?;
        let cch = cursor.read_u8()? as usize;
        let cce = cursor.read_u16()?;
        cursor.skip(2)?;
        let sheet_scope = cursor.read_u16()?;
        cursor.skip(4)?;
        let high_byte = cursor.read_u8()? & strings::FLAG_HIGH_BYTE != 0;
        let name = strings::read_chars(&mut cursor, cch, high_byte)?;
        let builtin = if flags & NAME_FLAG_BUILTIN != 0 {
            name.chars().next().map(|c| c as u32 as u8)
        } else {
            None
        };

        let raw_formula = cursor.rest().to_vec();
        let tokens = match Ptg::read_tokens(&mut cursor, cce as usize) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                log::warn!("keeping undecodable definition of name '{name}' as raw bytes: {e}");
                None
            },
        };
        Ok(Self {
            flags,
            keyboard_shortcut,
            sheet_scope,
            name,
            builtin,
            tokens,
            raw_formula,
            raw_cce: cce,
        })
    }

    fn write(&self, writer: &mut RecordWriter) {
        let (cce, formula) = match &self.tokens {
            Some(tokens) => {
                let mut rgce = Vec::new();
                let cce = Ptg::write_tokens(tokens, &mut rgce);
                (cce as u16, rgce)
            },
            None => (self.raw_cce, self.raw_formula.clone()),
        };
        let mut body = Vec::with_capacity(15 + self.name.len() * 2 + formula.len());
        body.put_u16_le(self.flags);
        body.put_u8(self.keyboard_shortcut);
        body.put_u8(strings::char_count(&self.name) as u8);
        body.put_u16_le(cce);
        body.put_u16_le(0);
        body.put_u16_le(self.sheet_scope);
        body.put_u32_le(0);
        strings::write_flagged_chars(&mut body, &self.name);
        body.extend_from_slice(&formula);
        writer.write(sid::NAME, &body);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkTable {
    books: Vec<SupBook>,
    extern_sheets: Vec<ExternSheetRef>,
    names: Vec<NameRecord>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `record_sid` belongs to the link table.
    pub fn is_link_record(record_sid: u16) -> bool {
        matches!(
            record_sid,
            sid::SUPBOOK | sid::EXTERNNAME | sid::EXTERNSHEET | sid::NAME
        )
    }

    pub fn read_record(&mut self, record: &Record) -> XlsResult<()> {
        match record.sid {
            sid::SUPBOOK => self.books.push(SupBook::parse(record)?),
            sid::EXTERNNAME => {
                let book = self.books.last_mut().ok_or_else(|| {
                    XlsError::invalid_record(sid::EXTERNNAME, "EXTERNNAME without a preceding SUPBOOK")
                })?;
                record.require_len(7)?;
                let mut cursor = record.cursor();
                cursor.skip(6)?;
                let name = strings::read_short_unicode_string(&mut cursor)?;
                book.names.push(ExternName {
                    name,
                    raw: record.data.clone(),
                });
            },
            sid::EXTERNSHEET => {
                let mut cursor = record.cursor();
                let count = cursor.read_u16()? as usize;
                if count * 6 > cursor.remaining() {
                    return Err(XlsError::InvalidLength {
                        record_type: sid::EXTERNSHEET,
                        expected: 2 + count * 6,
                        found: record.data.len(),
                    });
                }
                for _ in 0..count {
                    self.extern_sheets.push(ExternSheetRef {
                        supbook: cursor.read_u16()?,
                        first_sheet: cursor.read_i16()?,
                        last_sheet: cursor.read_i16()?,
                    });
                }
            },
            sid::NAME => self.names.push(NameRecord::parse(record)?),
            other => return Err(XlsError::invalid_record(other, "not a link table record")),
        }
        Ok(())
    }

    pub fn write(&self, writer: &mut RecordWriter) {
        for book in &self.books {
            book.write(writer);
        }
        if !self.extern_sheets.is_empty() {
            let mut body = Vec::with_capacity(2 + self.extern_sheets.len() * 6);
            body.put_u16_le(self.extern_sheets.len() as u16);
            for entry in &self.extern_sheets {
                body.put_u16_le(entry.supbook);
                body.put_i16_le(entry.first_sheet);
                body.put_i16_le(entry.last_sheet);
            }
            writer.write(sid::EXTERNSHEET, &body);
        }
        for name in &self.names {
            name.write(writer);
        }
    }

    fn internal_book(&self) -> Option<usize> {
        self.books
            .iter()
            .position(|book| matches!(book.kind, SupBookKind::Internal { .. }))
    }

    /// Record the current sheet count in the internal SUPBOOK, creating it if needed.
    pub fn set_sheet_count(&mut self, sheet_count: usize) {
        let kind = SupBookKind::Internal {
            sheet_count: sheet_count as u16,
        };
        match self.internal_book() {
            Some(index) => self.books[index].kind = kind,
            None => {
                // The internal book is conventionally first; existing entries shift.
                self.books.insert(
                    0,
                    SupBook {
                        kind,
                        names: Vec::new(),
                    },
                );
                for entry in &mut self.extern_sheets {
                    entry.supbook += 1;
                }
            },
        }
    }

    /// EXTERNSHEET index for the local sheet span `first..=last`.
    pub fn extern_sheet_index(&self, first: usize, last: usize) -> Option<u16> {
        let book = self.internal_book()? as u16;
        self.extern_sheets
            .iter()
            .position(|e| {
                e.supbook == book && e.first_sheet as isize == first as isize && e.last_sheet as isize == last as isize
            })
            .map(|i| i as u16)
    }

    /// Index of the entry for `first..=last`, appending one when missing.
    pub fn add_extern_sheet(&mut self, first: usize, last: usize) -> u16 {
        if let Some(index) = self.extern_sheet_index(first, last) {
            return index;
        }
        if self.internal_book().is_none() {
            self.set_sheet_count(last + 1);
        }
        let supbook = self.internal_book().unwrap_or_default() as u16;
        self.extern_sheets.push(ExternSheetRef {
            supbook,
            first_sheet: first as i16,
            last_sheet: last as i16,
        });
        (self.extern_sheets.len() - 1) as u16
    }

    pub fn extern_sheet(&self, index: u16) -> Option<&ExternSheetRef> {
        self.extern_sheets.get(index as usize)
    }

    pub fn book(&self, index: u16) -> Option<&SupBook> {
        self.books.get(index as usize)
    }

    /// Local sheet span of an EXTERNSHEET entry. External books resolve to `None`.
    pub fn resolve_extern_sheet(&self, index: u16) -> Option<(usize, usize)> {
        let entry = self.extern_sheet(index)?;
        match self.book(entry.supbook)?.kind {
            SupBookKind::Internal { .. } if entry.first_sheet >= 0 && entry.last_sheet >= entry.first_sheet => {
                Some((entry.first_sheet as usize, entry.last_sheet as usize))
            },
            _ => None,
        }
    }

    /// Workbook and sheet names of an external EXTERNSHEET entry.
    pub fn external_sheet_names(&self, index: u16) -> Option<(&str, Option<&str>, Option<&str>)> {
        let entry = self.extern_sheet(index)?;
        match &self.book(entry.supbook)?.kind {
            SupBookKind::External { url, sheet_names } => {
                let sheet = |i: i16| usize::try_from(i).ok().and_then(|i| sheet_names.get(i)).map(String::as_str);
                Some((url.as_str(), sheet(entry.first_sheet), sheet(entry.last_sheet)))
            },
            _ => None,
        }
    }

    pub fn external_name(&self, extern_index: u16, name_index: u16) -> Option<&str> {
        let entry = self.extern_sheet(extern_index)?;
        let book = self.book(entry.supbook)?;
        // EXTERNNAME indexes are 1-based
        let name = book.names.get((name_index as usize).checked_sub(1)?)?;
        Some(name.name.as_str())
    }

    pub fn names(&self) -> &[NameRecord] {
        &self.names
    }

    pub fn names_mut(&mut self) -> &mut [NameRecord] {
        &mut self.names
    }

    /// Name by the 1-based index used in `tName` tokens.
    pub fn name(&self, index: u16) -> Option<&NameRecord> {
        self.names.get((index as usize).checked_sub(1)?)
    }

    /// 1-based index of `text` as seen from `sheet`: a sheet-local
    /// definition wins over a workbook-scoped one.
    pub fn name_index(&self, text: &str, sheet: usize) -> Option<u16> {
        let matches = |n: &NameRecord| n.display_name().eq_ignore_ascii_case(text);
        let local = self
            .names
            .iter()
            .position(|n| n.sheet_scope as usize == sheet + 1 && matches(n));
        let global = || self.names.iter().position(|n| n.sheet_scope == 0 && matches(n));
        local.or_else(global).map(|i| (i + 1) as u16)
    }

    pub fn add_name(&mut self, name: NameRecord) -> u16 {
        self.names.push(name);
        self.names.len() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::ptg::{AreaRef, CellRef, OperandClass};
    use crate::ole::xls::records::RecordStream;

    fn reread(table: &LinkTable) -> LinkTable {
        let mut writer = RecordWriter::new();
        table.write(&mut writer);
        let bytes = writer.into_inner();
        let mut reread = LinkTable::new();
        for record in RecordStream::new(&bytes) {
            reread.read_record(&record.unwrap()).unwrap();
        }
        reread
    }

    #[test]
    fn test_extern_sheets_resolve_to_local_spans() {
        let mut table = LinkTable::new();
        table.set_sheet_count(3);
        assert_eq!(table.add_extern_sheet(0, 0), 0);
        assert_eq!(table.add_extern_sheet(1, 2), 1);
        assert_eq!(table.add_extern_sheet(0, 0), 0);
        assert_eq!(table.extern_sheet_index(2, 2), None);

        let reread = reread(&table);
        assert_eq!(reread.resolve_extern_sheet(1), Some((1, 2)));
        assert_eq!(reread.resolve_extern_sheet(5), None);
    }

    #[test]
    fn test_external_book_entries() {
        let mut table = LinkTable::new();
        table.books.push(SupBook {
            kind: SupBookKind::External {
                url: "\u{1}other.xls".to_string(),
                sheet_names: vec!["Data".to_string()],
            },
            names: Vec::new(),
        });
        table.extern_sheets.push(ExternSheetRef {
            supbook: 0,
            first_sheet: 0,
            last_sheet: 0,
        });
        table.set_sheet_count(1);
        let reread = reread(&table);
        assert_eq!(reread.extern_sheet(0).map(|e| e.supbook), Some(1));
        assert_eq!(reread.resolve_extern_sheet(0), None);
        assert_eq!(
            reread.external_sheet_names(0),
            Some(("\u{1}other.xls", Some("Data"), Some("Data")))
        );
    }

    #[test]
    fn test_names_scoping_and_builtins() {
        let area = Ptg::Area3d {
            class: OperandClass::Reference,
            extern_index: 0,
            area: AreaRef::new(CellRef::new(0, 0, false, false), CellRef::new(9, 0, false, false)),
        };
        let mut table = LinkTable::new();
        table.add_name(NameRecord::new("Rates", None, vec![area.clone()]));
        table.add_name(NameRecord::new("Rates", Some(1), vec![Ptg::Num(1.5)]));
        let mut print_area = NameRecord::new("\u{6}", Some(0), vec![area]);
        print_area.flags = NAME_FLAG_BUILTIN;
        print_area.builtin = Some(6);
        table.add_name(print_area);

        let reread = reread(&table);
        assert_eq!(reread.name_index("rates", 0), Some(1));
        assert_eq!(reread.name_index("Rates", 1), Some(2));
        assert_eq!(reread.name_index("Print_Area", 0), Some(3));
        assert_eq!(reread.name(2).and_then(|n| n.tokens.clone()), Some(vec![Ptg::Num(1.5)]));
        assert_eq!(reread.name(3).map(NameRecord::display_name).as_deref(), Some("Print_Area"));
        assert!(reread.name(0).is_none());
    }
}
