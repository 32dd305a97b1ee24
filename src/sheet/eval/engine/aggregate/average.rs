use crate::sheet::eval::ValueEval;

use super::super::bin_op::{add, divide};
use super::super::{EvalContext, EvalResult};
use super::collect_numbers;

pub(crate) fn eval_average(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let numbers = collect_numbers(ctx, args)?;
    let count = numbers.len() as f64;
    let total = numbers.into_iter().fold(0.0, add);
    Ok(ValueEval::Number(divide(total, count)?))
}
