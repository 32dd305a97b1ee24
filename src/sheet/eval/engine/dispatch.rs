use crate::ole::xls::ptg::function_by_index;
use crate::sheet::eval::{ErrorEval, ValueEval};

use super::EvalContext;
use super::registry::FUNCTION_MAP;

/// Call the built-in function with BIFF index `index`.
pub(super) fn eval_function(ctx: &EvalContext<'_>, index: u16, args: &[ValueEval]) -> ValueEval {
    let Some(meta) = function_by_index(index) else {
        log::debug!("Unknown function index {index}");
        return ValueEval::Error(ErrorEval::Name);
    };
    match FUNCTION_MAP.get(meta.name) {
        Some(func) => func(ctx, args).unwrap_or_else(ValueEval::Error),
        None => {
            log::debug!("Unsupported function: {}", meta.name);
            ValueEval::Error(ErrorEval::Name)
        },
    }
}
