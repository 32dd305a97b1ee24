//! Cell storage of one sheet.

use crate::ole::xls::cell::{self, CellValue, FormulaCell, XlsCell};
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::ptg::{MAX_COL, RowShifter};
use crate::ole::xls::records::Record;

/// Cells stored per row in sparse, column-indexed vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueRecordsAggregate {
    rows: Vec<Vec<Option<XlsCell>>>,
}

impl ValueRecordsAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `cell` at `(row, col)`, replacing any previous cell.
    pub fn insert_cell(&mut self, row: u16, col: u16, cell: XlsCell) -> XlsResult<()> {
        if col > MAX_COL {
            return Err(XlsError::InvalidCellAddress {
                row: row as u32,
                col: col as u32,
            });
        }
        let (row, col) = (row as usize, col as usize);
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, None);
        }
        cells[col] = Some(cell);
        Ok(())
    }

    pub fn remove_cell(&mut self, row: u16, col: u16) -> Option<XlsCell> {
        let cells = self.rows.get_mut(row as usize)?;
        let removed = cells.get_mut(col as usize)?.take();
        while matches!(cells.last(), Some(None)) {
            cells.pop();
        }
        removed
    }

    pub fn cell(&self, row: u16, col: u16) -> Option<&XlsCell> {
        self.rows.get(row as usize)?.get(col as usize)?.as_ref()
    }

    pub fn cell_mut(&mut self, row: u16, col: u16) -> Option<&mut XlsCell> {
        self.rows.get_mut(row as usize)?.get_mut(col as usize)?.as_mut()
    }

    /// Occupied cells of `row` in column order.
    pub fn row_cells(&self, row: u16) -> impl Iterator<Item = (u16, &XlsCell)> {
        self.rows
            .get(row as usize)
            .into_iter()
            .flat_map(|cells| cells.iter().enumerate())
            .filter_map(|(col, cell)| cell.as_ref().map(|cell| (col as u16, cell)))
    }

    /// Every occupied cell in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16, &XlsCell)> {
        self.rows.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter_map(move |(col, cell)| cell.as_ref().map(|cell| (row as u16, col as u16, cell)))
        })
    }

    pub fn formulas_mut(&mut self) -> impl Iterator<Item = (u16, u16, &mut FormulaCell)> {
        self.rows.iter_mut().enumerate().flat_map(|(row, cells)| {
            cells.iter_mut().enumerate().filter_map(move |(col, cell)| match cell {
                Some(XlsCell {
                    value: CellValue::Formula(formula),
                    ..
                }) => Some((row as u16, col as u16, formula.as_mut())),
                _ => None,
            })
        })
    }

    fn row_is_empty(cells: &[Option<XlsCell>]) -> bool {
        cells.iter().all(Option::is_none)
    }

    /// Number of rows holding at least one cell.
    pub fn row_count(&self) -> usize {
        self.rows.iter().filter(|cells| !Self::row_is_empty(cells)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn first_row(&self) -> Option<u16> {
        self.rows.iter().position(|cells| !Self::row_is_empty(cells)).map(|r| r as u16)
    }

    pub fn last_row(&self) -> Option<u16> {
        self.rows.iter().rposition(|cells| !Self::row_is_empty(cells)).map(|r| r as u16)
    }

    pub fn first_col(&self) -> Option<u16> {
        self.rows
            .iter()
            .filter_map(|cells| cells.iter().position(Option::is_some))
            .min()
            .map(|c| c as u16)
    }

    pub fn last_col(&self) -> Option<u16> {
        self.rows
            .iter()
            .filter_map(|cells| cells.iter().rposition(Option::is_some))
            .max()
            .map(|c| c as u16)
    }

    /// Delete the rows described by `shifter` and move the rows below up.
    ///
    /// References in this sheet's formulas are adjusted too; formulas on
    /// other sheets are the caller's business.
    pub fn remove_rows(&mut self, shifter: &RowShifter, resolve_extern: impl Fn(u16) -> Option<(usize, usize)>) {
        let start = (shifter.first_row() as usize).min(self.rows.len());
        let end = (shifter.first_row() as usize + shifter.count() as usize).min(self.rows.len());
        self.rows.drain(start..end);
        self.adjust_formulas(shifter, shifter.sheet(), resolve_extern);
    }

    /// Apply a row shift to the tokens of every formula stored here.
    pub fn adjust_formulas(
        &mut self,
        shifter: &RowShifter,
        sheet: usize,
        resolve_extern: impl Fn(u16) -> Option<(usize, usize)>,
    ) {
        for (_, _, formula) in self.formulas_mut() {
            if shifter.adjust_formula(&mut formula.tokens, sheet, &resolve_extern) {
                // Cached results no longer describe the formula.
                formula.flags |= cell::FormulaFlags::CALC_ON_LOAD;
            }
        }
    }

    /// Records for one row. Runs of two or more adjacent blanks collapse
    /// into a MULBLANK record.
    pub fn row_records(&self, row: u16) -> Vec<Record> {
        let mut records = Vec::new();
        let mut blanks: Vec<u16> = Vec::new();
        let mut run_start = 0u16;

        let flush = |records: &mut Vec<Record>, run_start: u16, blanks: &mut Vec<u16>| match blanks.len() {
            0 => {},
            1 => {
                let cell = XlsCell {
                    xf_index: blanks[0],
                    value: CellValue::Blank,
                };
                records.extend(cell::encode_cell(row, run_start, &cell));
                blanks.clear();
            },
            _ => {
                records.push(cell::encode_mulblank(row, run_start, blanks));
                blanks.clear();
            },
        };

        for (col, cell) in self.row_cells(row) {
            if cell.is_blank() {
                if blanks.is_empty() || run_start + blanks.len() as u16 != col {
                    flush(&mut records, run_start, &mut blanks);
                    run_start = col;
                }
                blanks.push(cell.xf_index);
                continue;
            }
            flush(&mut records, run_start, &mut blanks);
            records.extend(cell::encode_cell(row, col, cell));
        }
        flush(&mut records, run_start, &mut blanks);
        records
    }

    /// Records for every row in order.
    pub fn to_records(&self) -> Vec<Record> {
        (0..self.rows.len())
            .flat_map(|row| self.row_records(row as u16))
            .collect()
    }
}
