use crate::sheet::eval::{ErrorEval, ValueEval};

use super::super::{EvalContext, EvalResult, number_arg};

/// CHOOSE(index, value1, ...). The selected argument is returned as is.
pub(crate) fn eval_choose(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let index = number_arg(ctx, args, 0)?.trunc();
    if index < 1.0 || index >= args.len() as f64 {
        return Err(ErrorEval::Value);
    }
    Ok(args[index as usize].clone())
}
