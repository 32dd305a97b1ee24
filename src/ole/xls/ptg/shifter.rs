//! Reference adjustment after rows are removed from a sheet.

use super::{AreaRef, CellRef, MAX_ROW, Ptg};

/// Rewrites references after `count` rows starting at `first_row` were
/// deleted from sheet `sheet` and the rows below moved up.
///
/// References into the deleted band become `#REF!` tokens. Areas that
/// only partly overlap the band shrink. Token sizes never change, so the
/// rewrite is done in place.
#[derive(Debug, Clone, Copy)]
pub struct RowShifter {
    sheet: usize,
    first_row: u16,
    count: u16,
}

enum RowMove {
    Unchanged,
    Moved(u16),
    Deleted,
}

impl RowShifter {
    pub fn remove_rows(sheet: usize, first_row: u16, count: u16) -> Self {
        Self {
            sheet,
            first_row,
            count,
        }
    }

    pub fn sheet(&self) -> usize {
        self.sheet
    }

    pub fn first_row(&self) -> u16 {
        self.first_row
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    #[inline]
    fn end_row(&self) -> u32 {
        self.first_row as u32 + self.count as u32
    }

    fn move_row(&self, row: u16) -> RowMove {
        if row < self.first_row {
            RowMove::Unchanged
        } else if (row as u32) < self.end_row() {
            RowMove::Deleted
        } else {
            RowMove::Moved(row - self.count)
        }
    }

    fn shift_cell(&self, cell: &CellRef) -> Option<CellRef> {
        match self.move_row(cell.row) {
            RowMove::Unchanged => Some(*cell),
            RowMove::Moved(row) => Some(CellRef { row, ..*cell }),
            RowMove::Deleted => None,
        }
    }

    fn shift_area(&self, area: &AreaRef) -> Option<AreaRef> {
        if area.first.row == 0 && area.last.row == MAX_ROW {
            return Some(*area);
        }
        let first = match self.move_row(area.first.row) {
            RowMove::Unchanged => area.first.row,
            RowMove::Moved(row) => row,
            // Rows below the band slide up into its first row.
            RowMove::Deleted => {
                if (area.last.row as u32) < self.end_row() {
                    return None;
                }
                self.first_row
            },
        };
        let last = match self.move_row(area.last.row) {
            RowMove::Unchanged => area.last.row,
            RowMove::Moved(row) => row,
            RowMove::Deleted => self.first_row.checked_sub(1)?,
        };
        Some(AreaRef {
            first: CellRef {
                row: first,
                ..area.first
            },
            last: CellRef {
                row: last,
                ..area.last
            },
        })
    }

    /// Adjust the tokens of a formula stored on `formula_sheet`.
    ///
    /// `resolve_extern` maps an EXTERNSHEET index to the sheet range it
    /// covers. Returns whether any token changed.
    pub fn adjust_formula(
        &self,
        tokens: &mut [Ptg],
        formula_sheet: usize,
        resolve_extern: impl Fn(u16) -> Option<(usize, usize)>,
    ) -> bool {
        let same_sheet = formula_sheet == self.sheet;
        let targets_sheet = |extern_index: u16| {
            resolve_extern(extern_index) == Some((self.sheet, self.sheet))
        };
        let mut changed = false;
        for token in tokens.iter_mut() {
            let replacement = match token {
                Ptg::Ref { class, cell } if same_sheet => match self.shift_cell(cell) {
                    Some(shifted) if shifted == *cell => None,
                    Some(shifted) => Some(Ptg::Ref {
                        class: *class,
                        cell: shifted,
                    }),
                    None => Some(Ptg::RefErr { class: *class }),
                },
                Ptg::Area { class, area } if same_sheet => match self.shift_area(area) {
                    Some(shifted) if shifted == *area => None,
                    Some(shifted) => Some(Ptg::Area {
                        class: *class,
                        area: shifted,
                    }),
                    None => Some(Ptg::AreaErr { class: *class }),
                },
                Ptg::Ref3d {
                    class,
                    extern_index,
                    cell,
                } if targets_sheet(*extern_index) => match self.shift_cell(cell) {
                    Some(shifted) if shifted == *cell => None,
                    Some(shifted) => Some(Ptg::Ref3d {
                        class: *class,
                        extern_index: *extern_index,
                        cell: shifted,
                    }),
                    None => Some(Ptg::RefErr3d {
                        class: *class,
                        extern_index: *extern_index,
                    }),
                },
                Ptg::Area3d {
                    class,
                    extern_index,
                    area,
                } if targets_sheet(*extern_index) => match self.shift_area(area) {
                    Some(shifted) if shifted == *area => None,
                    Some(shifted) => Some(Ptg::Area3d {
                        class: *class,
                        extern_index: *extern_index,
                        area: shifted,
                    }),
                    None => Some(Ptg::AreaErr3d {
                        class: *class,
                        extern_index: *extern_index,
                    }),
                },
                _ => None,
            };
            if let Some(replacement) = replacement {
                *token = replacement;
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::super::OperandClass;
    use super::*;

    fn area(first_row: u16, last_row: u16) -> Ptg {
        Ptg::Area {
            class: OperandClass::Reference,
            area: AreaRef::new(CellRef::relative(first_row, 0), CellRef::relative(last_row, 0)),
        }
    }

    fn cell(row: u16) -> Ptg {
        Ptg::Ref {
            class: OperandClass::Value,
            cell: CellRef::relative(row, 1),
        }
    }

    #[test]
    fn test_cells_move_or_become_ref_errors() {
        let shifter = RowShifter::remove_rows(0, 2, 3);
        let mut tokens = vec![cell(1), cell(3), cell(5), cell(10)];
        assert!(shifter.adjust_formula(&mut tokens, 0, |_| None));
        assert_eq!(
            tokens,
            vec![
                cell(1),
                Ptg::RefErr {
                    class: OperandClass::Value
                },
                cell(2),
                cell(7),
            ]
        );
    }

    #[test]
    fn test_areas_shrink_around_deleted_band() {
        let shifter = RowShifter::remove_rows(0, 2, 3);
        let mut tokens = vec![area(0, 9), area(3, 8), area(2, 4), area(0, 3)];
        shifter.adjust_formula(&mut tokens, 0, |_| None);
        assert_eq!(
            tokens,
            vec![
                area(0, 6),
                area(2, 5),
                Ptg::AreaErr {
                    class: OperandClass::Reference
                },
                area(0, 1),
            ]
        );
    }

    #[test]
    fn test_other_sheets_untouched() {
        let shifter = RowShifter::remove_rows(1, 0, 4);
        let mut tokens = vec![cell(6)];
        assert!(!shifter.adjust_formula(&mut tokens, 0, |_| None));
        assert_eq!(tokens, vec![cell(6)]);

        let mut tokens = vec![Ptg::Ref3d {
            class: OperandClass::Value,
            extern_index: 0,
            cell: CellRef::relative(6, 0),
        }];
        assert!(shifter.adjust_formula(&mut tokens, 0, |_| Some((1, 1))));
        assert_eq!(
            tokens,
            vec![Ptg::Ref3d {
                class: OperandClass::Value,
                extern_index: 0,
                cell: CellRef::relative(2, 0),
            }]
        );
    }
}
