//! Cell and area addresses as encoded in reference tokens, plus A1 text.

use bytes::BufMut;

use crate::common::binary::{BinaryResult, ByteCursor};

/// Last addressable row in BIFF8 (0-based)
pub const MAX_ROW: u16 = 0xFFFF;
/// Last addressable column in BIFF8 (0-based, column IV)
pub const MAX_COL: u16 = 0x00FF;

const COL_MASK: u16 = 0x3FFF;
const COL_RELATIVE: u16 = 0x4000;
const ROW_RELATIVE: u16 = 0x8000;

/// Convert a 0-based column index to letters (`0` → `A`, `26` → `AA`).
pub fn column_to_letters(col: u32) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

/// Convert column letters (case-insensitive) to a 0-based index.
pub fn letters_to_column(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut col: u32 = 0;
    for ch in letters.chars() {
        let ch = ch.to_ascii_uppercase();
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col * 26 + (ch as u32 - 'A' as u32 + 1);
    }
    Some(col - 1)
}

/// Plain `A1` text for a 0-based cell address.
pub fn cell_name(row: u32, col: u32) -> String {
    format!("{}{}", column_to_letters(col), row + 1)
}

/// Address of one cell inside a reference token.
///
/// The relative flags only matter for copy/shift operations. In `RefN`
/// tokens a relative component holds a signed offset instead of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellRef {
    pub row: u16,
    pub col: u16,
    pub row_relative: bool,
    pub col_relative: bool,
}

impl CellRef {
    pub fn new(row: u16, col: u16, row_relative: bool, col_relative: bool) -> Self {
        Self {
            row,
            col,
            row_relative,
            col_relative,
        }
    }

    /// Fully relative reference, as produced by typing `A1`.
    pub fn relative(row: u16, col: u16) -> Self {
        Self::new(row, col, true, true)
    }

    pub(crate) fn col_word(&self) -> u16 {
        let mut word = self.col & COL_MASK;
        if self.col_relative {
            word |= COL_RELATIVE;
        }
        if self.row_relative {
            word |= ROW_RELATIVE;
        }
        word
    }

    pub(crate) fn from_words(row: u16, col_word: u16) -> Self {
        Self {
            row,
            col: col_word & COL_MASK,
            row_relative: col_word & ROW_RELATIVE != 0,
            col_relative: col_word & COL_RELATIVE != 0,
        }
    }

    pub(crate) fn read(cursor: &mut ByteCursor<'_>) -> BinaryResult<Self> {
        let row = cursor.read_u16()?;
        let col_word = cursor.read_u16()?;
        Ok(Self::from_words(row, col_word))
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.put_u16_le(self.row);
        out.put_u16_le(self.col_word());
    }

    /// Resolve a `RefN` address against the cell that owns the formula.
    pub fn resolve_relative(&self, base_row: u16, base_col: u16) -> CellRef {
        let row = if self.row_relative {
            base_row.wrapping_add(self.row)
        } else {
            self.row
        };
        let col = if self.col_relative {
            // Column offsets are signed 8-bit values.
            (base_col as u8).wrapping_add(self.col as u8) as u16
        } else {
            self.col
        };
        CellRef::new(row, col, self.row_relative, self.col_relative)
    }

    /// Text form with `$` markers on absolute components.
    pub fn format(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.col_relative { "" } else { "$" },
            column_to_letters(self.col as u32),
            if self.row_relative { "" } else { "$" },
            self.row as u32 + 1
        )
    }
}

/// Rectangular address inside an area token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AreaRef {
    pub first: CellRef,
    pub last: CellRef,
}

impl AreaRef {
    pub fn new(first: CellRef, last: CellRef) -> Self {
        Self { first, last }
    }

    pub(crate) fn read(cursor: &mut ByteCursor<'_>) -> BinaryResult<Self> {
        let first_row = cursor.read_u16()?;
        let last_row = cursor.read_u16()?;
        let first_col = cursor.read_u16()?;
        let last_col = cursor.read_u16()?;
        Ok(Self {
            first: CellRef::from_words(first_row, first_col),
            last: CellRef::from_words(last_row, last_col),
        })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.put_u16_le(self.first.row);
        out.put_u16_le(self.last.row);
        out.put_u16_le(self.first.col_word());
        out.put_u16_le(self.last.col_word());
    }

    /// Whether the area spans every row, i.e. a column reference like `A:A`.
    pub fn is_whole_column(&self) -> bool {
        self.first.row == 0 && self.last.row == MAX_ROW
    }

    pub fn is_whole_row(&self) -> bool {
        self.first.col == 0 && self.last.col == MAX_COL
    }

    pub fn resolve_relative(&self, base_row: u16, base_col: u16) -> AreaRef {
        AreaRef {
            first: self.first.resolve_relative(base_row, base_col),
            last: self.last.resolve_relative(base_row, base_col),
        }
    }

    pub fn format(&self) -> String {
        if self.is_whole_column() {
            let dollar = |rel: bool| if rel { "" } else { "$" };
            return format!(
                "{}{}:{}{}",
                dollar(self.first.col_relative),
                column_to_letters(self.first.col as u32),
                dollar(self.last.col_relative),
                column_to_letters(self.last.col as u32)
            );
        }
        if self.is_whole_row() {
            let dollar = |rel: bool| if rel { "" } else { "$" };
            return format!(
                "{}{}:{}{}",
                dollar(self.first.row_relative),
                self.first.row as u32 + 1,
                dollar(self.last.row_relative),
                self.last.row as u32 + 1
            );
        }
        format!("{}:{}", self.first.format(), self.last.format())
    }
}

/// Unflagged cell range as used by SHRFMLA, ARRAY and memory tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RangeAddress {
    pub first_row: u16,
    pub last_row: u16,
    pub first_col: u16,
    pub last_col: u16,
}

impl RangeAddress {
    pub fn new(first_row: u16, last_row: u16, first_col: u16, last_col: u16) -> Self {
        Self {
            first_row: first_row.min(last_row),
            last_row: first_row.max(last_row),
            first_col: first_col.min(last_col),
            last_col: first_col.max(last_col),
        }
    }

    #[inline]
    pub fn contains(&self, row: u16, col: u16) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    /// `Ref8U`: four 16-bit fields.
    pub(crate) fn read_ref8(cursor: &mut ByteCursor<'_>) -> BinaryResult<Self> {
        Ok(Self {
            first_row: cursor.read_u16()?,
            last_row: cursor.read_u16()?,
            first_col: cursor.read_u16()?,
            last_col: cursor.read_u16()?,
        })
    }

    pub(crate) fn write_ref8(&self, out: &mut Vec<u8>) {
        out.put_u16_le(self.first_row);
        out.put_u16_le(self.last_row);
        out.put_u16_le(self.first_col);
        out.put_u16_le(self.last_col);
    }

    /// `RefU`: 16-bit rows, 8-bit columns.
    pub(crate) fn read_refu(cursor: &mut ByteCursor<'_>) -> BinaryResult<Self> {
        Ok(Self {
            first_row: cursor.read_u16()?,
            last_row: cursor.read_u16()?,
            first_col: cursor.read_u8()? as u16,
            last_col: cursor.read_u8()? as u16,
        })
    }

    pub(crate) fn write_refu(&self, out: &mut Vec<u8>) {
        out.put_u16_le(self.first_row);
        out.put_u16_le(self.last_row);
        out.put_u8(self.first_col as u8);
        out.put_u8(self.last_col as u8);
    }

    pub fn format(&self) -> String {
        let first = cell_name(self.first_row as u32, self.first_col as u32);
        if self.first_row == self.last_row && self.first_col == self.last_col {
            return first;
        }
        format!(
            "{}:{}",
            first,
            cell_name(self.last_row as u32, self.last_col as u32)
        )
    }
}

/// Split `A1`, `$B$2` or `AA10` into a cell reference.
pub fn parse_cell_ref(text: &str) -> Option<CellRef> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    let col_relative = bytes.first() != Some(&b'$');
    if !col_relative {
        pos += 1;
    }
    let letters_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
        pos += 1;
    }
    let col = letters_to_column(&text[letters_start..pos])?;
    let row_relative = bytes.get(pos) != Some(&b'$');
    if !row_relative {
        pos += 1;
    }
    let digits = &text[pos..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 || row > MAX_ROW as u32 + 1 || col > MAX_COL as u32 {
        return None;
    }
    Some(CellRef::new(
        (row - 1) as u16,
        col as u16,
        row_relative,
        col_relative,
    ))
}
