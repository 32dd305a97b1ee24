use crate::sheet::eval::ValueEval;

use super::super::{EvalContext, EvalResult, for_each_value, to_number};

/// Numbers in referenced cells, plus literal arguments that read as numbers.
/// Errors are not counted and do not propagate.
pub(crate) fn eval_count(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let mut count = 0u32;
    for_each_value(ctx, args, |value, from_ref| {
        let counted = match value {
            ValueEval::Number(_) => true,
            ValueEval::Bool(_) | ValueEval::String(_) if !from_ref => to_number(value).is_ok(),
            _ => false,
        };
        if counted {
            count += 1;
        }
        Ok(())
    })?;
    Ok(ValueEval::Number(count as f64))
}

/// Non-blank referenced cells plus every literal argument.
pub(crate) fn eval_counta(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let mut count = 0u32;
    for_each_value(ctx, args, |value, from_ref| {
        if !(from_ref && matches!(value, ValueEval::Blank)) {
            count += 1;
        }
        Ok(())
    })?;
    Ok(ValueEval::Number(count as f64))
}
