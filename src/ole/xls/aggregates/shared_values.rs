//! Shared formulas of one sheet.
//!
//! A SHRFMLA record stores the tokens once for a rectangular range. Each
//! FORMULA record in the range carries the shared flag and a single
//! `tExp` token naming the first cell of the group. Groups are only ever
//! looked up in the manager of the sheet that owns the formula.

use crate::common::config::SharedFormulaPolicy;
use crate::ole::xls::ErrorCode;
use crate::ole::xls::cell::{CachedValue, FormulaCell, FormulaFlags, SharedFormulaRecord};
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::ptg::{Ptg, cell_name, convert_shared_formula};

#[derive(Debug, Default)]
pub struct SharedValueManager {
    /// In the order the SHRFMLA records were read
    groups: Vec<SharedFormulaRecord>,
}

impl SharedValueManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, group: SharedFormulaRecord) {
        let anchor = (group.range.first_row, group.range.first_col);
        match self.groups.iter_mut().find(|g| (g.range.first_row, g.range.first_col) == anchor) {
            Some(existing) => {
                log::warn!(
                    "duplicate shared formula anchored at {}, keeping the last one",
                    cell_name(anchor.0 as u32, anchor.1 as u32)
                );
                *existing = group;
            },
            None => self.groups.push(group),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group whose anchor is `(anchor_row, anchor_col)`, falling back to the
    /// most recently read group whose range covers the formula cell.
    pub fn find(&self, anchor_row: u16, anchor_col: u16, row: u16, col: u16) -> Option<&SharedFormulaRecord> {
        self.groups
            .iter()
            .find(|group| {
                (group.range.first_row, group.range.first_col) == (anchor_row, anchor_col)
                    && group.range.contains(row, col)
            })
            .or_else(|| self.groups.iter().rev().find(|group| group.range.contains(row, col)))
    }

    /// Replace the `tExp` pointer of a shared formula at `(row, col)` by the
    /// group's tokens converted for that cell, and clear the shared flag.
    ///
    /// Without a group the pointer cannot be kept: a lenient read turns the
    /// formula into the constant it last evaluated to, or `#REF!`.
    pub fn resolve(&self, row: u16, col: u16, formula: &mut FormulaCell, policy: SharedFormulaPolicy) -> XlsResult<()> {
        if !formula.flags.contains(FormulaFlags::SHARED) {
            return Ok(());
        }
        let Some((anchor_row, anchor_col)) = Ptg::is_exp(&formula.tokens) else {
            log::warn!(
                "formula at {} is flagged shared but has its own tokens, clearing the flag",
                cell_name(row as u32, col as u32)
            );
            formula.flags.remove(FormulaFlags::SHARED);
            return Ok(());
        };

        match self.find(anchor_row, anchor_col, row, col) {
            Some(group) => {
                formula.tokens = convert_shared_formula(&group.tokens, row, col);
                formula.flags.remove(FormulaFlags::SHARED);
                Ok(())
            },
            None => match policy {
                SharedFormulaPolicy::Lenient => {
                    log::warn!(
                        "no shared formula in this sheet covers {}, replacing it by its cached result",
                        cell_name(row as u32, col as u32)
                    );
                    formula.tokens = vec![cached_constant(&formula.cached)];
                    formula.flags.remove(FormulaFlags::SHARED);
                    Ok(())
                },
                SharedFormulaPolicy::Strict => Err(XlsError::MissingSharedFormula {
                    cell: cell_name(row as u32, col as u32),
                }),
            },
        }
    }
}

/// Literal token standing for a cached formula result.
fn cached_constant(cached: &CachedValue) -> Ptg {
    match cached {
        CachedValue::Number(n) => Ptg::Num(*n),
        // tStr holds at most 255 characters.
        CachedValue::String(s) if s.chars().count() <= 255 => Ptg::Str(s.clone()),
        CachedValue::Bool(b) => Ptg::Bool(*b),
        CachedValue::Error(e) => Ptg::Err(*e),
        CachedValue::String(_) | CachedValue::Empty => Ptg::Err(ErrorCode::Ref),
    }
}
