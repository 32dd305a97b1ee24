use crate::sheet::eval::{ErrorEval, ValueEval};

use super::super::{EvalContext, EvalResult, number_arg, parse_number, scalar_arg, text_arg};

/// Longest string a cell can hold.
pub(crate) const MAX_TEXT_LEN: usize = 32767;

pub(crate) fn eval_concatenate(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let mut out = String::new();
    for index in 0..args.len() {
        out.push_str(&text_arg(ctx, args, index)?);
    }
    if out.chars().count() > MAX_TEXT_LEN {
        return Err(ErrorEval::Value);
    }
    Ok(ValueEval::String(out))
}

pub(crate) fn eval_len(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    Ok(ValueEval::Number(text_arg(ctx, args, 0)?.chars().count() as f64))
}

pub(crate) fn eval_upper(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    Ok(ValueEval::String(text_arg(ctx, args, 0)?.to_uppercase()))
}

pub(crate) fn eval_lower(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    Ok(ValueEval::String(text_arg(ctx, args, 0)?.to_lowercase()))
}

/// Strip leading and trailing spaces and collapse inner runs to one space.
pub(crate) fn eval_trim(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let text = text_arg(ctx, args, 0)?;
    Ok(ValueEval::String(
        text.split(' ').filter(|part| !part.is_empty()).collect::<Vec<_>>().join(" "),
    ))
}

pub(crate) fn eval_rept(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let text = text_arg(ctx, args, 0)?;
    let times = number_arg(ctx, args, 1)?.trunc();
    if times < 0.0 || text.chars().count() as f64 * times > MAX_TEXT_LEN as f64 {
        return Err(ErrorEval::Value);
    }
    Ok(ValueEval::String(text.repeat(times as usize)))
}

pub(crate) fn eval_value(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    match scalar_arg(ctx, args, 0) {
        ValueEval::Number(n) => Ok(ValueEval::Number(n)),
        ValueEval::Blank => Ok(ValueEval::Number(0.0)),
        ValueEval::String(s) => parse_number(&s).map(ValueEval::Number).ok_or(ErrorEval::Value),
        ValueEval::Error(e) => Err(e),
        _ => Err(ErrorEval::Value),
    }
}
