//! Values produced while evaluating a formula.

use crate::ole::xls::ptg::{MAX_COL, MAX_ROW};

/// Error values share their representation with stored cell errors.
pub use crate::ole::xls::ErrorCode as ErrorEval;

/// Result of evaluating a token or a whole formula.
///
/// `Ref` and `Area` only appear while a formula is running; cell results
/// are always dereferenced to one of the scalar variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueEval {
    Number(f64),
    String(String),
    Bool(bool),
    Blank,
    Error(ErrorEval),
    Ref(RefEval),
    Area(AreaEval),
}

impl ValueEval {
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, ValueEval::Error(_))
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        matches!(self, ValueEval::Ref(_) | ValueEval::Area(_))
    }

    /// Area covered by a `Ref` or `Area` value.
    pub fn as_area(&self) -> Option<AreaEval> {
        match self {
            ValueEval::Ref(r) => Some(r.to_area()),
            ValueEval::Area(a) => Some(*a),
            _ => None,
        }
    }
}

impl From<ErrorEval> for ValueEval {
    fn from(error: ErrorEval) -> Self {
        ValueEval::Error(error)
    }
}

impl From<f64> for ValueEval {
    fn from(n: f64) -> Self {
        ValueEval::Number(n)
    }
}

impl From<bool> for ValueEval {
    fn from(b: bool) -> Self {
        ValueEval::Bool(b)
    }
}

/// A single cell, possibly repeated over a sheet span (`Sheet1:Sheet3!A1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefEval {
    pub first_sheet: usize,
    pub last_sheet: usize,
    pub row: u16,
    pub col: u16,
}

impl RefEval {
    pub fn new(sheet: usize, row: u16, col: u16) -> Self {
        Self::spanning(sheet, sheet, row, col)
    }

    pub fn spanning(first_sheet: usize, last_sheet: usize, row: u16, col: u16) -> Self {
        Self {
            first_sheet: first_sheet.min(last_sheet),
            last_sheet: first_sheet.max(last_sheet),
            row,
            col,
        }
    }

    #[inline]
    pub fn is_single_sheet(&self) -> bool {
        self.first_sheet == self.last_sheet
    }

    pub fn to_area(&self) -> AreaEval {
        AreaEval::spanning(self.first_sheet, self.last_sheet, self.row, self.col, self.row, self.col)
    }

    /// Area at bounds relative to this cell, see [`AreaEval::offset`].
    pub fn offset(
        &self,
        rel_first_row: i32,
        rel_last_row: i32,
        rel_first_col: i32,
        rel_last_col: i32,
    ) -> Result<AreaEval, ErrorEval> {
        self.to_area()
            .offset(rel_first_row, rel_last_row, rel_first_col, rel_last_col)
    }
}

/// A rectangular range. Bounds are inclusive and always normalized so the
/// first row/column is not greater than the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaEval {
    first_sheet: usize,
    last_sheet: usize,
    first_row: u16,
    last_row: u16,
    first_col: u16,
    last_col: u16,
}

impl AreaEval {
    pub fn new(sheet: usize, first_row: u16, first_col: u16, last_row: u16, last_col: u16) -> Self {
        Self::spanning(sheet, sheet, first_row, first_col, last_row, last_col)
    }

    pub fn spanning(
        first_sheet: usize,
        last_sheet: usize,
        first_row: u16,
        first_col: u16,
        last_row: u16,
        last_col: u16,
    ) -> Self {
        Self {
            first_sheet: first_sheet.min(last_sheet),
            last_sheet: first_sheet.max(last_sheet),
            first_row: first_row.min(last_row),
            last_row: first_row.max(last_row),
            first_col: first_col.min(last_col),
            last_col: first_col.max(last_col),
        }
    }

    #[inline]
    pub fn first_sheet(&self) -> usize {
        self.first_sheet
    }

    #[inline]
    pub fn last_sheet(&self) -> usize {
        self.last_sheet
    }

    #[inline]
    pub fn first_row(&self) -> u16 {
        self.first_row
    }

    #[inline]
    pub fn last_row(&self) -> u16 {
        self.last_row
    }

    #[inline]
    pub fn first_col(&self) -> u16 {
        self.first_col
    }

    #[inline]
    pub fn last_col(&self) -> u16 {
        self.last_col
    }

    #[inline]
    pub fn is_single_sheet(&self) -> bool {
        self.first_sheet == self.last_sheet
    }

    pub fn height(&self) -> u32 {
        (self.last_row - self.first_row) as u32 + 1
    }

    pub fn width(&self) -> u32 {
        (self.last_col - self.first_col) as u32 + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }

    pub fn contains_row(&self, row: u16) -> bool {
        (self.first_row..=self.last_row).contains(&row)
    }

    pub fn contains_col(&self, col: u16) -> bool {
        (self.first_col..=self.last_col).contains(&col)
    }

    pub fn contains(&self, sheet: usize, row: u16, col: u16) -> bool {
        (self.first_sheet..=self.last_sheet).contains(&sheet) && self.contains_row(row) && self.contains_col(col)
    }

    /// Cell at a 0-based position inside the area.
    pub fn cell_at(&self, rel_row: u32, rel_col: u32) -> Option<RefEval> {
        if rel_row >= self.height() || rel_col >= self.width() {
            return None;
        }
        Some(RefEval::spanning(
            self.first_sheet,
            self.last_sheet,
            self.first_row + rel_row as u16,
            self.first_col + rel_col as u16,
        ))
    }

    /// One row of the area as a new area.
    pub fn row_slice(&self, rel_row: u32) -> Option<AreaEval> {
        if rel_row >= self.height() {
            return None;
        }
        let row = self.first_row + rel_row as u16;
        Some(Self {
            first_row: row,
            last_row: row,
            ..*self
        })
    }

    /// One column of the area as a new area.
    pub fn col_slice(&self, rel_col: u32) -> Option<AreaEval> {
        if rel_col >= self.width() {
            return None;
        }
        let col = self.first_col + rel_col as u16;
        Some(Self {
            first_col: col,
            last_col: col,
            ..*self
        })
    }

    /// New area whose bounds are given relative to this area's top-left
    /// cell. The bounds may come in either order. The receiver is left
    /// untouched; a result outside the sheet is `#REF!`.
    pub fn offset(
        &self,
        rel_first_row: i32,
        rel_last_row: i32,
        rel_first_col: i32,
        rel_last_col: i32,
    ) -> Result<AreaEval, ErrorEval> {
        let (first_row, last_row) = relative_span(self.first_row, rel_first_row as i64, rel_last_row as i64, MAX_ROW)?;
        let (first_col, last_col) = relative_span(self.first_col, rel_first_col as i64, rel_last_col as i64, MAX_COL)?;
        Ok(Self {
            first_row,
            last_row,
            first_col,
            last_col,
            ..*self
        })
    }

    /// Area moved by `rows`/`cols` and resized to `height` x `width`, as
    /// the OFFSET function does. A negative size extends up or left from
    /// the moved corner; a zero size is `#REF!`.
    pub fn moved(&self, rows: i32, cols: i32, height: i32, width: i32) -> Result<AreaEval, ErrorEval> {
        let (rel_first_row, rel_last_row) = sized_span(rows, height)?;
        let (rel_first_col, rel_last_col) = sized_span(cols, width)?;
        self.offset(rel_first_row, rel_last_row, rel_first_col, rel_last_col)
    }

    /// Cells shared by both areas. Rows and columns must each overlap.
    pub fn intersect(&self, other: &AreaEval) -> Option<AreaEval> {
        if self.first_sheet != other.first_sheet || self.last_sheet != other.last_sheet {
            return None;
        }
        let first_row = self.first_row.max(other.first_row);
        let last_row = self.last_row.min(other.last_row);
        if first_row > last_row {
            return None;
        }
        let first_col = self.first_col.max(other.first_col);
        let last_col = self.last_col.min(other.last_col);
        if first_col > last_col {
            return None;
        }
        Some(Self {
            first_row,
            last_row,
            first_col,
            last_col,
            ..*self
        })
    }

    /// Smallest area covering both, as built by the `:` operator.
    pub fn bounding(&self, other: &AreaEval) -> Option<AreaEval> {
        if self.first_sheet != other.first_sheet || self.last_sheet != other.last_sheet {
            return None;
        }
        Some(Self {
            first_row: self.first_row.min(other.first_row),
            last_row: self.last_row.max(other.last_row),
            first_col: self.first_col.min(other.first_col),
            last_col: self.last_col.max(other.last_col),
            ..*self
        })
    }
}

fn relative_span(start: u16, rel_first: i64, rel_last: i64, max: u16) -> Result<(u16, u16), ErrorEval> {
    let low = start as i64 + rel_first.min(rel_last);
    let high = start as i64 + rel_first.max(rel_last);
    if low < 0 || high > max as i64 {
        return Err(ErrorEval::Ref);
    }
    Ok((low as u16, high as u16))
}

fn sized_span(by: i32, size: i32) -> Result<(i32, i32), ErrorEval> {
    let (by, size) = (by as i64, size as i64);
    let (first, last) = match size {
        0 => return Err(ErrorEval::Ref),
        1.. => (by, by + size - 1),
        _ => (by + size + 1, by),
    };
    let clamp = |n: i64| n.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    Ok((clamp(first), clamp(last)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_is_normalized() {
        let area = AreaEval::new(0, 9, 4, 2, 1);
        assert_eq!((area.first_row(), area.last_row()), (2, 9));
        assert_eq!((area.first_col(), area.last_col()), (1, 4));
        assert_eq!((area.height(), area.width()), (8, 4));
    }

    #[test]
    fn test_offset_returns_new_area() {
        let area = AreaEval::new(0, 2, 2, 3, 3);
        let shifted = area.offset(1, 2, -1, 0).unwrap();
        assert_eq!(shifted, AreaEval::new(0, 3, 1, 4, 2));
        assert_eq!(area, AreaEval::new(0, 2, 2, 3, 3));
        // Reversed bounds are normalized.
        assert_eq!(area.offset(2, 1, 0, -1), Ok(shifted));
        assert_eq!(area.offset(-3, 0, 0, 0), Err(ErrorEval::Ref));

        let cell = RefEval::spanning(1, 3, 5, 5);
        let around = cell.offset(-1, 1, -1, 1).unwrap();
        assert_eq!(around, AreaEval::spanning(1, 3, 4, 4, 6, 6));
    }

    #[test]
    fn test_moved_and_resized() {
        let area = AreaEval::new(0, 2, 2, 3, 3);
        assert_eq!(area.moved(1, -1, 2, 2), Ok(AreaEval::new(0, 3, 1, 4, 2)));
        assert_eq!(area.moved(0, 0, -3, 1), Ok(AreaEval::new(0, 0, 2, 2, 2)));
        assert_eq!(area.moved(-3, 0, 1, 1), Err(ErrorEval::Ref));
        assert_eq!(area.moved(0, 0, 0, 1), Err(ErrorEval::Ref));
        assert_eq!(area.moved(0, 254, 1, 1), Err(ErrorEval::Ref));
    }

    #[test]
    fn test_intersection_needs_row_and_column_overlap() {
        let a = AreaEval::new(0, 0, 0, 4, 4);
        let b = AreaEval::new(0, 2, 3, 8, 9);
        assert_eq!(a.intersect(&b), Some(AreaEval::new(0, 2, 3, 4, 4)));

        // Rows overlap, columns do not.
        let c = AreaEval::new(0, 0, 5, 4, 6);
        assert_eq!(a.intersect(&c), None);
        // Columns overlap, rows do not.
        let d = AreaEval::new(0, 5, 0, 6, 4);
        assert_eq!(a.intersect(&d), None);
        // Different sheets never intersect.
        assert_eq!(a.intersect(&AreaEval::new(1, 0, 0, 4, 4)), None);
    }

    #[test]
    fn test_slices_and_cells() {
        let area = AreaEval::new(2, 1, 1, 3, 2);
        assert_eq!(area.cell_at(2, 1), Some(RefEval::new(2, 3, 2)));
        assert_eq!(area.cell_at(3, 0), None);
        assert_eq!(area.row_slice(1), Some(AreaEval::new(2, 2, 1, 2, 2)));
        assert_eq!(area.col_slice(0), Some(AreaEval::new(2, 1, 1, 3, 1)));
        assert_eq!(area.col_slice(2), None);
    }
}
