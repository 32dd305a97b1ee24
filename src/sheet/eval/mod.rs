//! Formula evaluation over parsed token arrays.
//!
//! [`WorkbookEvaluator`] runs the reverse-polish [`Ptg`] array of a formula
//! cell against any [`EvaluationWorkbook`]. Results are cached per cell
//! until the caller reports a change with
//! [`WorkbookEvaluator::notify_update_cell`] or clears the cache.
//!
//! Arithmetic goes through a decimal representation limited to 15
//! significant digits so that results match what a spreadsheet shows,
//! e.g. `0.1 + 0.2` is exactly `0.3`.

mod cache;
mod engine;
mod value;

pub use cache::CellId;
pub use value::{AreaEval, ErrorEval, RefEval, ValueEval};

use std::cell::RefCell;
use std::collections::HashSet;

use crate::ole::xls::ptg::Ptg;
use crate::ole::xls::{CachedValue, ErrorCode};
use cache::EvaluationCache;
use engine::EvalContext;

/// Read access to a workbook, as needed by the evaluator.
pub trait EvaluationWorkbook {
    fn sheet_count(&self) -> usize;

    /// Index of the sheet called `name`, compared case-insensitively.
    fn sheet_index(&self, name: &str) -> Option<usize>;

    fn sheet_name(&self, sheet: usize) -> Option<&str>;

    /// `None` for cells that do not exist.
    fn cell(&self, sheet: usize, row: u16, col: u16) -> Option<EvaluationCell<'_>>;

    /// Sheet span `(first, last)` of an EXTERNSHEET entry in this workbook.
    fn resolve_extern_sheet(&self, extern_index: u16) -> Option<(usize, usize)>;

    /// Tokens of the defined name with 1-based `index`.
    fn name_formula(&self, index: u16) -> Option<&[Ptg]>;

    /// Last used `(row, col)` of a sheet. Range iteration stops there; all
    /// cells beyond are treated as blank.
    fn used_range(&self, _sheet: usize) -> Option<(u16, u16)> {
        None
    }
}

/// Content of one cell as seen by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvaluationCell<'a> {
    Blank,
    Number(f64),
    String(&'a str),
    Bool(bool),
    Error(ErrorCode),
    Formula {
        tokens: &'a [Ptg],
        cached: &'a CachedValue,
    },
}

struct EvalState {
    cache: EvaluationCache,
    visiting: HashSet<CellId>,
}

/// Evaluates formula cells and caches their results.
///
/// The evaluator does not own the workbook; pass the same workbook to every
/// call, and report edits through the `notify_*` methods so that stale
/// results are dropped.
pub struct WorkbookEvaluator {
    eval_state: RefCell<EvalState>,
}

impl Default for WorkbookEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkbookEvaluator {
    pub fn new() -> Self {
        Self {
            eval_state: RefCell::new(EvalState {
                cache: EvaluationCache::default(),
                visiting: HashSet::new(),
            }),
        }
    }

    /// Value of the cell at `(sheet, row, col)`.
    ///
    /// Formula cells are evaluated (or served from the cache); a formula
    /// whose result is blank evaluates to `0`. Plain cells return their
    /// stored value and missing cells are [`ValueEval::Blank`].
    pub fn evaluate(&self, workbook: &dyn EvaluationWorkbook, sheet: usize, row: u16, col: u16) -> ValueEval {
        self.cell_value(workbook, CellId::new(sheet, row, col), None)
    }

    /// Evaluate `tokens` as if they were the formula of `(sheet, row, col)`.
    /// The result is not cached.
    pub fn evaluate_tokens(
        &self,
        workbook: &dyn EvaluationWorkbook,
        tokens: &[Ptg],
        sheet: usize,
        row: u16,
        col: u16,
    ) -> ValueEval {
        let ctx = EvalContext::new(self, workbook, sheet, row, col, None);
        ctx.finish(engine::evaluate_tokens(&ctx, tokens))
    }

    /// Forget results that depend on the cell, after its value or formula
    /// changed.
    pub fn notify_update_cell(&self, sheet: usize, row: u16, col: u16) {
        let dropped = self
            .eval_state
            .borrow_mut()
            .cache
            .invalidate(CellId::new(sheet, row, col));
        log::trace!("Cell ({sheet}, {row}, {col}) changed, dropped {dropped} cached results");
    }

    /// Forget results that depend on the cell, after it was removed.
    pub fn notify_delete_cell(&self, sheet: usize, row: u16, col: u16) {
        self.notify_update_cell(sheet, row, col);
    }

    pub fn clear_all_cached_result_values(&self) {
        self.eval_state.borrow_mut().cache.invalidate_all();
    }

    /// Whether a result for the cell is currently cached.
    pub fn is_cached(&self, sheet: usize, row: u16, col: u16) -> bool {
        self.eval_state
            .borrow()
            .cache
            .get(&CellId::new(sheet, row, col))
            .is_some()
    }

    /// Value of a cell read from a formula. `dependent` is the formula cell
    /// doing the read, if any.
    pub(crate) fn cell_value(
        &self,
        workbook: &dyn EvaluationWorkbook,
        id: CellId,
        dependent: Option<CellId>,
    ) -> ValueEval {
        if let Some(dependent) = dependent {
            self.eval_state.borrow_mut().cache.add_dependency(id, dependent);
        }
        match workbook.cell(id.sheet, id.row, id.col) {
            None | Some(EvaluationCell::Blank) => ValueEval::Blank,
            Some(EvaluationCell::Number(n)) => ValueEval::Number(n),
            Some(EvaluationCell::String(s)) => ValueEval::String(s.to_string()),
            Some(EvaluationCell::Bool(b)) => ValueEval::Bool(b),
            Some(EvaluationCell::Error(e)) => ValueEval::Error(e),
            Some(EvaluationCell::Formula { tokens, cached }) => self.formula_value(workbook, id, tokens, cached),
        }
    }

    pub(crate) fn add_area_dependency(&self, area: AreaEval, dependent: CellId) {
        self.eval_state
            .borrow_mut()
            .cache
            .add_area_dependency(area, dependent);
    }

    fn formula_value(
        &self,
        workbook: &dyn EvaluationWorkbook,
        id: CellId,
        tokens: &[Ptg],
        cached: &CachedValue,
    ) -> ValueEval {
        // Fast path: cached value
        {
            let state = self.eval_state.borrow();
            if let Some(value) = state.cache.get(&id) {
                return value.clone();
            }
            if state.visiting.contains(&id) {
                log::warn!(
                    "Circular reference at sheet {} {}",
                    id.sheet,
                    crate::ole::xls::ptg::cell_name(id.row as u32, id.col as u32)
                );
                return ValueEval::Error(ErrorEval::Value);
            }
        }

        self.eval_state.borrow_mut().visiting.insert(id);

        let ctx = EvalContext::new(self, workbook, id.sheet, id.row, id.col, Some(id));
        let result = match tokens.first() {
            // Array and table members keep the result computed by the host.
            Some(Ptg::Exp { .. } | Ptg::Tbl { .. }) => ctx.finish(cached_value(cached)),
            _ => ctx.finish(engine::evaluate_tokens(&ctx, tokens)),
        };

        {
            let mut state = self.eval_state.borrow_mut();
            state.visiting.remove(&id);
            state.cache.insert(id, result.clone());
        }
        result
    }
}

fn cached_value(cached: &CachedValue) -> ValueEval {
    match cached {
        CachedValue::Number(n) => ValueEval::Number(*n),
        CachedValue::String(s) => ValueEval::String(s.clone()),
        CachedValue::Bool(b) => ValueEval::Bool(*b),
        CachedValue::Error(e) => ValueEval::Error(*e),
        CachedValue::Empty => ValueEval::Blank,
    }
}
