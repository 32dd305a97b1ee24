use crate::sheet::eval::{ErrorEval, ValueEval};

use super::super::bin_op::power;
use super::super::{EvalContext, EvalResult, finite, number_arg};

pub(crate) fn eval_abs(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    finite(number_arg(ctx, args, 0)?.abs())
}

pub(crate) fn eval_sign(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let n = number_arg(ctx, args, 0)?;
    Ok(ValueEval::Number(if n > 0.0 {
        1.0
    } else if n < 0.0 {
        -1.0
    } else {
        0.0
    }))
}

pub(crate) fn eval_power(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let base = number_arg(ctx, args, 0)?;
    let exponent = number_arg(ctx, args, 1)?;
    finite(power(base, exponent))
}

/// Remainder with the sign of the divisor.
pub(crate) fn eval_mod(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let n = number_arg(ctx, args, 0)?;
    let d = number_arg(ctx, args, 1)?;
    if d == 0.0 {
        return Err(ErrorEval::Div0);
    }
    finite(n - d * (n / d).floor())
}

pub(crate) fn eval_sqrt(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let n = number_arg(ctx, args, 0)?;
    if n < 0.0 {
        return Err(ErrorEval::Num);
    }
    finite(n.sqrt())
}

pub(crate) fn eval_exp(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    finite(number_arg(ctx, args, 0)?.exp())
}

pub(crate) fn eval_ln(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let n = number_arg(ctx, args, 0)?;
    if n <= 0.0 {
        return Err(ErrorEval::Num);
    }
    finite(n.ln())
}

pub(crate) fn eval_log10(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let n = number_arg(ctx, args, 0)?;
    if n <= 0.0 {
        return Err(ErrorEval::Num);
    }
    finite(n.log10())
}
