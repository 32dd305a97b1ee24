use crate::sheet::eval::{ErrorEval, ValueEval};

use super::super::{EvalContext, EvalResult};
use super::area_arg;

pub(crate) fn eval_row(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    if args.is_empty() {
        return Ok(ValueEval::Number(ctx.row() as f64 + 1.0));
    }
    Ok(ValueEval::Number(area_arg(args, 0)?.first_row() as f64 + 1.0))
}

pub(crate) fn eval_column(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    if args.is_empty() {
        return Ok(ValueEval::Number(ctx.col() as f64 + 1.0));
    }
    Ok(ValueEval::Number(area_arg(args, 0)?.first_col() as f64 + 1.0))
}

pub(crate) fn eval_rows(_ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    match args.first() {
        Some(ValueEval::Error(e)) => Err(*e),
        Some(value) => Ok(ValueEval::Number(value.as_area().map_or(1, |a| a.height()) as f64)),
        None => Err(ErrorEval::Value),
    }
}

pub(crate) fn eval_columns(_ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    match args.first() {
        Some(ValueEval::Error(e)) => Err(*e),
        Some(value) => Ok(ValueEval::Number(value.as_area().map_or(1, |a| a.width()) as f64)),
        None => Err(ErrorEval::Value),
    }
}
