use crate::sheet::eval::{ErrorEval, RefEval, ValueEval};

use super::super::{EvalContext, EvalResult, number_arg};
use super::{area_arg, is_omitted};

/// Non-negative integer argument.
fn position_arg(ctx: &EvalContext<'_>, args: &[ValueEval], index: usize) -> Result<u32, ErrorEval> {
    let n = number_arg(ctx, args, index)?.trunc();
    if n < 0.0 {
        return Err(ErrorEval::Value);
    }
    Ok(n.min(u32::MAX as f64) as u32)
}

/// INDEX(reference, row, [column]). A zero row or column selects the whole
/// column or row. With a single index on a one-row area the index counts
/// columns.
pub(crate) fn eval_index(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let first = args.first().ok_or(ErrorEval::Value)?;
    let Some(area) = first.as_area() else {
        // A plain value behaves as a 1x1 array.
        if let ValueEval::Error(e) = first {
            return Err(*e);
        }
        let row = position_arg(ctx, args, 1)?;
        let col = if is_omitted(args, 2) { 1 } else { position_arg(ctx, args, 2)? };
        return if row <= 1 && col <= 1 {
            Ok(first.clone())
        } else {
            Err(ErrorEval::Ref)
        };
    };

    let mut row = position_arg(ctx, args, 1)?;
    let mut col = if is_omitted(args, 2) {
        None
    } else {
        Some(position_arg(ctx, args, 2)?)
    };
    if col.is_none() {
        if area.height() == 1 && area.width() > 1 {
            col = Some(row);
            row = 1;
        } else if area.width() == 1 {
            col = Some(1);
        }
    }

    let selected = match (row, col) {
        (0, None | Some(0)) => Some(area),
        (0, Some(c)) => area.col_slice(c - 1),
        (r, None | Some(0)) => area.row_slice(r - 1),
        (r, Some(c)) => area.cell_at(r - 1, c - 1).map(|cell| cell.to_area()),
    };
    match selected {
        Some(area) if area.is_single_cell() => Ok(ValueEval::Ref(RefEval::spanning(
            area.first_sheet(),
            area.last_sheet(),
            area.first_row(),
            area.first_col(),
        ))),
        Some(area) => Ok(ValueEval::Area(area)),
        None => Err(ErrorEval::Ref),
    }
}

/// OFFSET(reference, rows, cols, [height], [width]). Height and width
/// default to the size of the reference.
pub(crate) fn eval_offset(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let base = area_arg(args, 0)?;
    let rows = number_arg(ctx, args, 1)?.trunc();
    let cols = number_arg(ctx, args, 2)?.trunc();
    let height = if is_omitted(args, 3) {
        base.height() as f64
    } else {
        number_arg(ctx, args, 3)?.trunc()
    };
    let width = if is_omitted(args, 4) {
        base.width() as f64
    } else {
        number_arg(ctx, args, 4)?.trunc()
    };

    let clamp = |n: f64| n.clamp(i32::MIN as f64, i32::MAX as f64) as i32;
    let moved = base.moved(clamp(rows), clamp(cols), clamp(height), clamp(width))?;
    Ok(ValueEval::Area(moved))
}
