use crate::sheet::eval::ValueEval;

use super::super::{EvalContext, EvalResult};
use super::collect_numbers;

pub(crate) fn eval_min(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let min = collect_numbers(ctx, args)?.into_iter().reduce(f64::min);
    Ok(ValueEval::Number(min.unwrap_or(0.0)))
}

pub(crate) fn eval_max(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let max = collect_numbers(ctx, args)?.into_iter().reduce(f64::max);
    Ok(ValueEval::Number(max.unwrap_or(0.0)))
}
