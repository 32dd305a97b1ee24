use crate::sheet::eval::{ErrorEval, ValueEval};

use super::{EvalContext, EvalResult, for_each_value, scalar_arg, to_bool};

/// IF(condition, [if_true], [if_false]). The chosen argument is returned
/// as is, so IF can yield a reference.
pub(crate) fn eval_if(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let condition = to_bool(&scalar_arg(ctx, args, 0))?;
    let chosen = if condition { args.get(1) } else { args.get(2) };
    Ok(match chosen {
        Some(value) => value.clone(),
        None => ValueEval::Bool(condition),
    })
}

/// Booleans seen across all arguments. Text and blanks in references are
/// skipped; `None` when nothing was seen.
fn collect_bools(ctx: &EvalContext<'_>, args: &[ValueEval]) -> Result<Option<Vec<bool>>, ErrorEval> {
    let mut seen = Vec::new();
    for_each_value(ctx, args, |value, from_ref| {
        match value {
            ValueEval::Error(e) => return Err(*e),
            ValueEval::String(_) | ValueEval::Blank if from_ref => {},
            other => seen.push(to_bool(other)?),
        }
        Ok(())
    })?;
    Ok((!seen.is_empty()).then_some(seen))
}

pub(crate) fn eval_and(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    match collect_bools(ctx, args)? {
        Some(values) => Ok(ValueEval::Bool(values.iter().all(|b| *b))),
        None => Err(ErrorEval::Value),
    }
}

pub(crate) fn eval_or(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    match collect_bools(ctx, args)? {
        Some(values) => Ok(ValueEval::Bool(values.iter().any(|b| *b))),
        None => Err(ErrorEval::Value),
    }
}

pub(crate) fn eval_not(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    Ok(ValueEval::Bool(!to_bool(&scalar_arg(ctx, args, 0))?))
}

pub(crate) fn eval_true(_ctx: &EvalContext<'_>, _args: &[ValueEval]) -> EvalResult {
    Ok(ValueEval::Bool(true))
}

pub(crate) fn eval_false(_ctx: &EvalContext<'_>, _args: &[ValueEval]) -> EvalResult {
    Ok(ValueEval::Bool(false))
}
