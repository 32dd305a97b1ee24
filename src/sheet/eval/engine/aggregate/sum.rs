use crate::sheet::eval::ValueEval;

use super::super::bin_op::{add, multiply};
use super::super::{EvalContext, EvalResult};
use super::collect_numbers;

pub(crate) fn eval_sum(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let total = collect_numbers(ctx, args)?.into_iter().fold(0.0, add);
    Ok(ValueEval::Number(total))
}

pub(crate) fn eval_product(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let numbers = collect_numbers(ctx, args)?;
    if numbers.is_empty() {
        return Ok(ValueEval::Number(0.0));
    }
    Ok(ValueEval::Number(numbers.into_iter().fold(1.0, multiply)))
}
