use crate::sheet::eval::{ErrorEval, ValueEval};

use super::super::{EvalContext, EvalResult, number_arg, text_arg};

/// Character count argument; a missing argument defaults to one.
fn count_arg(ctx: &EvalContext<'_>, args: &[ValueEval], index: usize) -> Result<usize, ErrorEval> {
    if args.len() <= index {
        return Ok(1);
    }
    let n = number_arg(ctx, args, index)?.trunc();
    if n < 0.0 {
        return Err(ErrorEval::Value);
    }
    Ok(n as usize)
}

pub(crate) fn eval_left(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let text = text_arg(ctx, args, 0)?;
    let count = count_arg(ctx, args, 1)?;
    Ok(ValueEval::String(text.chars().take(count).collect()))
}

pub(crate) fn eval_right(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let text = text_arg(ctx, args, 0)?;
    let count = count_arg(ctx, args, 1)?;
    let skip = text.chars().count().saturating_sub(count);
    Ok(ValueEval::String(text.chars().skip(skip).collect()))
}

/// MID(text, start, count) with a 1-based start.
pub(crate) fn eval_mid(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let text = text_arg(ctx, args, 0)?;
    let start = number_arg(ctx, args, 1)?.trunc();
    let count = number_arg(ctx, args, 2)?.trunc();
    if start < 1.0 || count < 0.0 {
        return Err(ErrorEval::Value);
    }
    Ok(ValueEval::String(
        text.chars().skip(start as usize - 1).take(count as usize).collect(),
    ))
}
