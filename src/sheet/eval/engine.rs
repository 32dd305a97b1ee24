//! Runtime evaluation of formula token arrays.
//!
//! Tokens are run on an operand stack. Control tokens written by Excel are
//! honored: `tAttrIf`, `tAttrSkip` and `tAttrChoose` jump over the branches
//! that are not taken, and `tAttrSum` is a one-argument `SUM`. Jump
//! distances are in bytes, so they are translated through the encoded size
//! of each token.

use crate::common::number_text::number_to_text;
use crate::ole::xls::ptg::{
    ArrayValue, AttrPtg, FUNCTION_INDEX_EXTERNAL, FUNCTION_INDEX_IF, FUNCTION_INDEX_SUM, FormulaError, FormulaResult,
    Ptg, cell_name, function_by_index,
};

use super::cache::CellId;
use super::value::{AreaEval, ErrorEval, RefEval, ValueEval};
use super::{EvaluationWorkbook, WorkbookEvaluator};

mod aggregate;
mod bin_op;
mod dispatch;
mod info;
mod logical;
mod lookup;
mod math;
mod registry;
mod text;

#[cfg(test)]
mod tests;

pub(crate) type EvalResult = Result<ValueEval, ErrorEval>;

/// Names may refer to other names; deeper chains are treated as cycles.
const MAX_NAME_DEPTH: usize = 32;

/// Everything a running formula needs: the workbook, the cell it belongs
/// to and the evaluator that owns the result cache.
#[derive(Clone, Copy)]
pub(crate) struct EvalContext<'a> {
    evaluator: &'a WorkbookEvaluator,
    workbook: &'a dyn EvaluationWorkbook,
    sheet: usize,
    row: u16,
    col: u16,
    current: Option<CellId>,
    name_depth: usize,
}

impl<'a> EvalContext<'a> {
    pub(crate) fn new(
        evaluator: &'a WorkbookEvaluator,
        workbook: &'a dyn EvaluationWorkbook,
        sheet: usize,
        row: u16,
        col: u16,
        current: Option<CellId>,
    ) -> Self {
        Self {
            evaluator,
            workbook,
            sheet,
            row,
            col,
            current,
            name_depth: 0,
        }
    }

    #[inline]
    pub(crate) fn row(&self) -> u16 {
        self.row
    }

    #[inline]
    pub(crate) fn col(&self) -> u16 {
        self.col
    }

    /// Value of one cell, evaluating it if it holds a formula.
    pub(crate) fn cell_value(&self, sheet: usize, row: u16, col: u16) -> ValueEval {
        self.evaluator
            .cell_value(self.workbook, CellId::new(sheet, row, col), self.current)
    }

    /// Reduce a reference to the single value it stands for.
    ///
    /// Multi-cell areas use implicit intersection: a one-column area yields
    /// the cell on the formula's row, a one-row area the cell in the
    /// formula's column. Anything else is `#VALUE!`.
    pub(crate) fn single_value(&self, value: ValueEval) -> ValueEval {
        match value {
            ValueEval::Ref(r) if r.is_single_sheet() => self.cell_value(r.first_sheet, r.row, r.col),
            ValueEval::Area(area) if area.is_single_sheet() => {
                let sheet = area.first_sheet();
                if area.is_single_cell() {
                    self.cell_value(sheet, area.first_row(), area.first_col())
                } else if area.width() == 1 && area.contains_row(self.row) {
                    self.cell_value(sheet, self.row, area.first_col())
                } else if area.height() == 1 && area.contains_col(self.col) {
                    self.cell_value(sheet, area.first_row(), self.col)
                } else {
                    ValueEval::Error(ErrorEval::Value)
                }
            },
            ValueEval::Ref(_) | ValueEval::Area(_) => ValueEval::Error(ErrorEval::Value),
            other => other,
        }
    }

    /// Values of every cell of `area` in row-major order, sheet by sheet.
    /// Cells past the sheet's used range are skipped.
    pub(crate) fn area_values(&self, area: &AreaEval) -> Vec<ValueEval> {
        if let Some(current) = self.current {
            self.evaluator.add_area_dependency(*area, current);
        }
        let mut values = Vec::new();
        for sheet in area.first_sheet()..=area.last_sheet() {
            let (last_row, last_col) = match self.workbook.used_range(sheet) {
                Some((row, col)) => (area.last_row().min(row), area.last_col().min(col)),
                None => (area.last_row(), area.last_col()),
            };
            if area.first_row() > last_row || area.first_col() > last_col {
                continue;
            }
            for row in area.first_row()..=last_row {
                for col in area.first_col()..=last_col {
                    values.push(self.cell_value(sheet, row, col));
                }
            }
        }
        values
    }

    /// Dereference the final value of a formula. Blank results become `0`.
    pub(crate) fn finish(&self, value: ValueEval) -> ValueEval {
        match self.single_value(value) {
            ValueEval::Blank => ValueEval::Number(0.0),
            other => other,
        }
    }

    fn name_value(&self, index: u16) -> ValueEval {
        let Some(tokens) = self.workbook.name_formula(index) else {
            return ValueEval::Error(ErrorEval::Name);
        };
        if self.name_depth >= MAX_NAME_DEPTH {
            log::warn!("Defined name {index} refers to itself");
            return ValueEval::Error(ErrorEval::Value);
        }
        let nested = Self {
            name_depth: self.name_depth + 1,
            ..*self
        };
        evaluate_tokens(&nested, tokens)
    }

    fn location(&self) -> String {
        let sheet = self.workbook.sheet_name(self.sheet).unwrap_or("?");
        format!("{sheet}!{}", cell_name(self.row as u32, self.col as u32))
    }
}

/// Run `tokens` and return the value left on the stack, which may still be
/// a reference. Malformed token arrays evaluate to `#VALUE!`.
pub(crate) fn evaluate_tokens(ctx: &EvalContext<'_>, tokens: &[Ptg]) -> ValueEval {
    match run(ctx, tokens) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Cannot evaluate formula at {}: {e}", ctx.location());
            ValueEval::Error(ErrorEval::Value)
        },
    }
}

fn run(ctx: &EvalContext<'_>, tokens: &[Ptg]) -> FormulaResult<ValueEval> {
    // Byte offset of every token, plus the end of the array.
    let mut starts = Vec::with_capacity(tokens.len() + 1);
    let mut position = 0;
    for token in tokens {
        starts.push(position);
        position += token.encoded_size();
    }
    starts.push(position);
    let token_at = |byte: usize| {
        starts.binary_search(&byte).map_err(|_| {
            FormulaError::InvalidTokens(format!("jump to byte {byte} lands inside a token"))
        })
    };

    let mut stack: Vec<ValueEval> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let index = i;
        i += 1;
        match &tokens[index] {
            Ptg::Int(n) => stack.push(ValueEval::Number(*n as f64)),
            Ptg::Num(n) => stack.push(ValueEval::Number(*n)),
            Ptg::Str(s) => stack.push(ValueEval::String(s.clone())),
            Ptg::Bool(b) => stack.push(ValueEval::Bool(*b)),
            Ptg::Err(e) => stack.push(ValueEval::Error(*e)),
            Ptg::MissingArg => stack.push(ValueEval::Blank),
            Ptg::Array { value, .. } => {
                // Only the top-left element takes part in scalar evaluation.
                let first = match value.value(0, 0) {
                    Some(ArrayValue::Number(n)) => ValueEval::Number(*n),
                    Some(ArrayValue::String(s)) => ValueEval::String(s.clone()),
                    Some(ArrayValue::Bool(b)) => ValueEval::Bool(*b),
                    Some(ArrayValue::Error(e)) => ValueEval::Error(*e),
                    Some(ArrayValue::Empty) | None => ValueEval::Blank,
                };
                stack.push(first);
            },
            Ptg::Ref { cell, .. } => stack.push(ValueEval::Ref(RefEval::new(ctx.sheet, cell.row, cell.col))),
            Ptg::RefN { cell, .. } => {
                let cell = cell.resolve_relative(ctx.row, ctx.col);
                stack.push(ValueEval::Ref(RefEval::new(ctx.sheet, cell.row, cell.col)));
            },
            Ptg::Area { area, .. } => stack.push(ValueEval::Area(AreaEval::new(
                ctx.sheet,
                area.first.row,
                area.first.col,
                area.last.row,
                area.last.col,
            ))),
            Ptg::AreaN { area, .. } => {
                let area = area.resolve_relative(ctx.row, ctx.col);
                stack.push(ValueEval::Area(AreaEval::new(
                    ctx.sheet,
                    area.first.row,
                    area.first.col,
                    area.last.row,
                    area.last.col,
                )));
            },
            Ptg::Ref3d {
                extern_index, cell, ..
            } => stack.push(match ctx.workbook.resolve_extern_sheet(*extern_index) {
                Some((first, last)) => ValueEval::Ref(RefEval::spanning(first, last, cell.row, cell.col)),
                None => ValueEval::Error(ErrorEval::Ref),
            }),
            Ptg::Area3d {
                extern_index, area, ..
            } => stack.push(match ctx.workbook.resolve_extern_sheet(*extern_index) {
                Some((first, last)) => ValueEval::Area(AreaEval::spanning(
                    first,
                    last,
                    area.first.row,
                    area.first.col,
                    area.last.row,
                    area.last.col,
                )),
                None => ValueEval::Error(ErrorEval::Ref),
            }),
            Ptg::RefErr { .. } | Ptg::AreaErr { .. } | Ptg::RefErr3d { .. } | Ptg::AreaErr3d { .. } => {
                stack.push(ValueEval::Error(ErrorEval::Ref))
            },
            Ptg::Name { index, .. } => stack.push(ctx.name_value(*index)),
            Ptg::NameX { .. } => stack.push(ValueEval::Error(ErrorEval::Name)),
            Ptg::Exp { .. } | Ptg::Tbl { .. } => stack.push(ValueEval::Error(ErrorEval::NA)),
            // The operand tokens inside a memory expression follow directly.
            Ptg::MemArea { .. } | Ptg::MemErr { .. } | Ptg::MemNoMem { .. } | Ptg::MemFunc { .. } | Ptg::Paren => {},
            Ptg::Attr(attr) => {
                let after = starts[index + 1];
                if attr.is_sum() {
                    let arg = pop(&mut stack)?;
                    stack.push(dispatch::eval_function(ctx, FUNCTION_INDEX_SUM, &[arg]));
                } else if attr.is_if() {
                    i = optimized_if(ctx, tokens, &mut stack, attr, after, &token_at)?;
                } else if attr.is_choose() {
                    i = optimized_choose(ctx, &mut stack, attr, starts[index], &token_at)?;
                } else if attr.is_skip() {
                    i = token_at(after + attr.data as usize + 1)?;
                }
            },
            Ptg::UnaryPlus | Ptg::UnaryMinus | Ptg::Percent => {
                let operand = pop(&mut stack)?;
                stack.push(bin_op::eval_unary_op(ctx, &tokens[index], operand));
            },
            Ptg::Add
            | Ptg::Sub
            | Ptg::Mul
            | Ptg::Div
            | Ptg::Power
            | Ptg::Concat
            | Ptg::Lt
            | Ptg::Le
            | Ptg::Eq
            | Ptg::Ge
            | Ptg::Gt
            | Ptg::Ne
            | Ptg::Intersection
            | Ptg::Union
            | Ptg::Range => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                stack.push(bin_op::eval_binary_op(ctx, &tokens[index], left, right));
            },
            Ptg::Func { index: function, .. } => {
                let meta = function_by_index(*function).ok_or(FormulaError::UnknownFunction(*function))?;
                let args = pop_args(&mut stack, meta.min_args as usize)?;
                stack.push(dispatch::eval_function(ctx, *function, &args));
            },
            Ptg::FuncVar {
                index: function, argc, ..
            } => {
                let args = pop_args(&mut stack, *argc as usize)?;
                if *function == FUNCTION_INDEX_EXTERNAL {
                    stack.push(ValueEval::Error(ErrorEval::Name));
                } else {
                    stack.push(dispatch::eval_function(ctx, *function, &args));
                }
            },
        }
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(value), true) => Ok(value),
        (None, _) => Err(FormulaError::InvalidTokens("formula produced no value".to_string())),
        (Some(_), false) => Err(FormulaError::InvalidTokens(format!(
            "{} values left on the stack",
            stack.len() + 1
        ))),
    }
}

/// `tAttrIf`: on a true condition fall through into the true branch,
/// otherwise jump to the false branch. Returns the next token index.
fn optimized_if(
    ctx: &EvalContext<'_>,
    tokens: &[Ptg],
    stack: &mut Vec<ValueEval>,
    attr: &AttrPtg,
    after: usize,
    token_at: &impl Fn(usize) -> FormulaResult<usize>,
) -> FormulaResult<usize> {
    let condition = pop(stack)?;
    let next = token_at(after)?;
    let false_branch = token_at(after + attr.data as usize)?;
    // IF without a false argument: the jump lands on the IF itself.
    let no_false_arg = matches!(
        tokens.get(false_branch),
        Some(Ptg::FuncVar { index, .. }) if *index == FUNCTION_INDEX_IF
    );

    match to_bool(&ctx.single_value(condition.clone())) {
        Ok(true) => Ok(next),
        Ok(false) => {
            if no_false_arg {
                stack.push(condition);
                stack.push(ValueEval::Bool(false));
            }
            Ok(false_branch)
        },
        Err(error) => {
            stack.push(ValueEval::Error(error));
            if no_false_arg {
                return Ok(false_branch + 1);
            }
            // The token before the false branch is the skip that ends the
            // true branch; it jumps past the whole IF.
            match false_branch.checked_sub(1).and_then(|k| tokens.get(k)) {
                Some(Ptg::Attr(skip)) if skip.is_skip() => {
                    let skip_end = after + attr.data as usize;
                    token_at(skip_end + skip.data as usize + 1)
                },
                _ => Err(FormulaError::InvalidTokens("IF branch is not closed by tAttrSkip".to_string())),
            }
        },
    }
}

/// `tAttrChoose`: jump to the selected argument, or past the CHOOSE with
/// an error when the index is out of range.
fn optimized_choose(
    ctx: &EvalContext<'_>,
    stack: &mut Vec<ValueEval>,
    attr: &AttrPtg,
    start: usize,
    token_at: &impl Fn(usize) -> FormulaResult<usize>,
) -> FormulaResult<usize> {
    // Offsets count from the start of the jump table.
    let table = start + 4;
    let past_choose = table + attr.choose_offset as usize + 4;
    let selector = pop(stack)?;
    let choice = to_number(&ctx.single_value(selector)).map(|n| n.trunc());
    match choice {
        Ok(n) if n >= 1.0 && n <= attr.jump_table.len() as f64 => {
            token_at(table + attr.jump_table[n as usize - 1] as usize)
        },
        Ok(_) => {
            stack.push(ValueEval::Error(ErrorEval::Value));
            token_at(past_choose)
        },
        Err(error) => {
            stack.push(ValueEval::Error(error));
            token_at(past_choose)
        },
    }
}

fn pop(stack: &mut Vec<ValueEval>) -> FormulaResult<ValueEval> {
    stack
        .pop()
        .ok_or_else(|| FormulaError::InvalidTokens("operand stack is empty".to_string()))
}

fn pop_args(stack: &mut Vec<ValueEval>, count: usize) -> FormulaResult<Vec<ValueEval>> {
    if stack.len() < count {
        return Err(FormulaError::InvalidTokens(format!(
            "function needs {count} arguments, {} on the stack",
            stack.len()
        )));
    }
    Ok(stack.split_off(stack.len() - count))
}

/// Parse text the way a cell entry would be read as a number.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (digits, scale) = match trimmed.strip_suffix('%') {
        Some(rest) => (rest.trim_end(), 100.0),
        None => (trimmed, 1.0),
    };
    let n: f64 = fast_float2::parse(digits).ok()?;
    n.is_finite().then_some(n / scale)
}

/// Coerce a scalar to a number: booleans are 0/1, blanks 0, text must
/// parse as a number.
pub(crate) fn to_number(value: &ValueEval) -> Result<f64, ErrorEval> {
    match value {
        ValueEval::Number(n) => Ok(*n),
        ValueEval::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        ValueEval::Blank => Ok(0.0),
        ValueEval::String(s) => parse_number(s).ok_or(ErrorEval::Value),
        ValueEval::Error(e) => Err(*e),
        ValueEval::Ref(_) | ValueEval::Area(_) => Err(ErrorEval::Value),
    }
}

/// Coerce a scalar to text.
pub(crate) fn to_text(value: &ValueEval) -> Result<String, ErrorEval> {
    match value {
        ValueEval::Number(n) => Ok(number_to_text(*n)),
        ValueEval::Bool(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
        ValueEval::Blank => Ok(String::new()),
        ValueEval::String(s) => Ok(s.clone()),
        ValueEval::Error(e) => Err(*e),
        ValueEval::Ref(_) | ValueEval::Area(_) => Err(ErrorEval::Value),
    }
}

/// Coerce a scalar to a boolean. Only `TRUE` and `FALSE` are accepted as
/// text, in any case.
pub(crate) fn to_bool(value: &ValueEval) -> Result<bool, ErrorEval> {
    match value {
        ValueEval::Bool(b) => Ok(*b),
        ValueEval::Number(n) => Ok(*n != 0.0),
        ValueEval::Blank => Ok(false),
        ValueEval::String(s) if s.eq_ignore_ascii_case("TRUE") => Ok(true),
        ValueEval::String(s) if s.eq_ignore_ascii_case("FALSE") => Ok(false),
        ValueEval::String(_) | ValueEval::Ref(_) | ValueEval::Area(_) => Err(ErrorEval::Value),
        ValueEval::Error(e) => Err(*e),
    }
}

/// Argument `index` reduced to a single value; missing trailing arguments
/// are blank.
pub(crate) fn scalar_arg(ctx: &EvalContext<'_>, args: &[ValueEval], index: usize) -> ValueEval {
    match args.get(index) {
        Some(arg) => ctx.single_value(arg.clone()),
        None => ValueEval::Blank,
    }
}

pub(crate) fn number_arg(ctx: &EvalContext<'_>, args: &[ValueEval], index: usize) -> Result<f64, ErrorEval> {
    to_number(&scalar_arg(ctx, args, index))
}

pub(crate) fn text_arg(ctx: &EvalContext<'_>, args: &[ValueEval], index: usize) -> Result<String, ErrorEval> {
    to_text(&scalar_arg(ctx, args, index))
}

/// A finite number, or `#NUM!`.
pub(crate) fn finite(n: f64) -> EvalResult {
    if n.is_finite() {
        Ok(ValueEval::Number(if n == 0.0 { 0.0 } else { n }))
    } else {
        Err(ErrorEval::Num)
    }
}

/// Walk every value an argument stands for. References are expanded to
/// their cells; `from_ref` tells the callback which case it is in, since
/// most functions treat referenced text differently from literal text.
pub(crate) fn for_each_value(
    ctx: &EvalContext<'_>,
    args: &[ValueEval],
    mut f: impl FnMut(&ValueEval, bool) -> Result<(), ErrorEval>,
) -> Result<(), ErrorEval> {
    for arg in args {
        match arg.as_area() {
            Some(area) => {
                for value in ctx.area_values(&area) {
                    f(&value, true)?;
                }
            },
            None => f(arg, false)?,
        }
    }
    Ok(())
}
