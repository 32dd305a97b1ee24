pub(crate) mod choose;
pub(crate) mod index;
pub(crate) mod position;

pub(crate) use choose::eval_choose;
pub(crate) use index::{eval_index, eval_offset};
pub(crate) use position::{eval_column, eval_columns, eval_row, eval_rows};

use crate::sheet::eval::{AreaEval, ErrorEval, ValueEval};

/// Area of a reference argument. Errors pass through; other values are
/// `#VALUE!`.
pub(crate) fn area_arg(args: &[ValueEval], index: usize) -> Result<AreaEval, ErrorEval> {
    match args.get(index) {
        Some(ValueEval::Error(e)) => Err(*e),
        Some(value) => value.as_area().ok_or(ErrorEval::Value),
        None => Err(ErrorEval::Value),
    }
}

/// Whether an optional argument was left out.
pub(crate) fn is_omitted(args: &[ValueEval], index: usize) -> bool {
    matches!(args.get(index), None | Some(ValueEval::Blank))
}
