pub(crate) mod average;
pub(crate) mod count;
pub(crate) mod extrema;
pub(crate) mod sum;

pub(crate) use average::eval_average;
pub(crate) use count::{eval_count, eval_counta};
pub(crate) use extrema::{eval_max, eval_min};
pub(crate) use sum::{eval_product, eval_sum};

use crate::sheet::eval::{ErrorEval, ValueEval};

use super::{EvalContext, for_each_value, to_number};

/// Numbers an aggregate works on. Referenced cells contribute numbers only
/// and ignore text and booleans; literal arguments are coerced, with a
/// missing argument counting as zero. The first error wins.
pub(crate) fn collect_numbers(ctx: &EvalContext<'_>, args: &[ValueEval]) -> Result<Vec<f64>, ErrorEval> {
    let mut numbers = Vec::new();
    for_each_value(ctx, args, |value, from_ref| {
        match value {
            ValueEval::Number(n) => numbers.push(*n),
            ValueEval::Error(e) => return Err(*e),
            _ if from_ref => {},
            other => numbers.push(to_number(other)?),
        }
        Ok(())
    })?;
    Ok(numbers)
}
