use crate::sheet::eval::{ErrorEval, ValueEval};

use super::{EvalContext, EvalResult, scalar_arg};

pub(crate) fn eval_isblank(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    Ok(ValueEval::Bool(matches!(scalar_arg(ctx, args, 0), ValueEval::Blank)))
}

pub(crate) fn eval_iserror(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    Ok(ValueEval::Bool(scalar_arg(ctx, args, 0).is_error()))
}

pub(crate) fn eval_isna(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    Ok(ValueEval::Bool(matches!(
        scalar_arg(ctx, args, 0),
        ValueEval::Error(ErrorEval::NA)
    )))
}

pub(crate) fn eval_isnumber(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    Ok(ValueEval::Bool(matches!(scalar_arg(ctx, args, 0), ValueEval::Number(_))))
}

pub(crate) fn eval_istext(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    Ok(ValueEval::Bool(matches!(scalar_arg(ctx, args, 0), ValueEval::String(_))))
}

pub(crate) fn eval_na(_ctx: &EvalContext<'_>, _args: &[ValueEval]) -> EvalResult {
    Err(ErrorEval::NA)
}
