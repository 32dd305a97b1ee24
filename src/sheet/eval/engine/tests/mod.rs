mod arithmetic;
mod control;
mod functions;
mod references;
mod saved;

use crate::ole::xls::InternalWorkbook;
use crate::sheet::eval::{ValueEval, WorkbookEvaluator};

const TOL: f64 = 1e-9;

/// Workbook with a single sheet named `Sheet1`.
fn sheet1() -> InternalWorkbook {
    let mut workbook = InternalWorkbook::new();
    workbook.add_sheet("Sheet1").expect("add sheet");
    workbook
}

/// Evaluate `formula` placed in Z100 of `workbook`'s first sheet.
fn eval_in(workbook: &mut InternalWorkbook, formula: &str) -> ValueEval {
    workbook.set_formula(0, 99, 25, formula).expect("parse formula");
    WorkbookEvaluator::new().evaluate(workbook, 0, 99, 25)
}

fn eval(formula: &str) -> ValueEval {
    eval_in(&mut sheet1(), formula)
}

fn assert_number(value: ValueEval, expected: f64) {
    match value {
        ValueEval::Number(n) => assert!((n - expected).abs() < TOL, "expected {expected}, got {n}"),
        other => panic!("expected {expected}, got {other:?}"),
    }
}
