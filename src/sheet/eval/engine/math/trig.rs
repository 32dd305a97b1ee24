use crate::sheet::eval::ValueEval;

use super::super::{EvalContext, EvalResult, finite, number_arg};

pub(crate) fn eval_pi(_ctx: &EvalContext<'_>, _args: &[ValueEval]) -> EvalResult {
    Ok(ValueEval::Number(std::f64::consts::PI))
}

pub(crate) fn eval_sin(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    finite(number_arg(ctx, args, 0)?.sin())
}

pub(crate) fn eval_cos(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    finite(number_arg(ctx, args, 0)?.cos())
}

pub(crate) fn eval_tan(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    finite(number_arg(ctx, args, 0)?.tan())
}
