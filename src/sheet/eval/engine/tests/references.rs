#![cfg(all(test, feature = "eval_engine"))]

use super::{assert_number, eval, eval_in, sheet1};
use crate::ole::xls::ptg::{AttrPtg, CellRef, OperandClass, Ptg};
use crate::ole::xls::{CachedValue, InternalWorkbook};
use crate::sheet::eval::{ErrorEval, EvaluationCell, EvaluationWorkbook, ValueEval, WorkbookEvaluator};

fn grid() -> InternalWorkbook {
    let mut workbook = sheet1();
    for row in 0..5u16 {
        for col in 0..5u16 {
            workbook
                .set_number(0, row, col, (row * 10 + col) as f64)
                .expect("set number");
        }
    }
    workbook
}

#[test]
fn eval_intersection() {
    let mut workbook = grid();
    // B2:D4 and C3:E5 overlap in C3:D4.
    assert_eq!(
        eval_in(&mut workbook, "SUM(B2:D4 C3:E5)"),
        ValueEval::Number(22.0 + 23.0 + 32.0 + 33.0)
    );
    // The overlap is exactly the inner rectangle.
    assert_eq!(eval_in(&mut workbook, "ROWS(A1:E5 C3:D4)"), ValueEval::Number(2.0));
    assert_eq!(eval_in(&mut workbook, "COLUMNS(A1:E5 C3:D4)"), ValueEval::Number(2.0));
    assert_eq!(eval_in(&mut workbook, "A1:E5 C3"), ValueEval::Number(22.0));
    // Rows overlap but columns do not.
    assert_eq!(
        eval_in(&mut workbook, "SUM(A1:B5 D1:E5)"),
        ValueEval::Error(ErrorEval::Null)
    );
}

#[test]
fn eval_range_operator_and_union() {
    let mut workbook = grid();
    // A1:B3 built from two single cells, then summed through tAttrSum.
    let tokens = vec![
        Ptg::Ref {
            class: OperandClass::Reference,
            cell: CellRef::relative(0, 0),
        },
        Ptg::Ref {
            class: OperandClass::Reference,
            cell: CellRef::relative(2, 1),
        },
        Ptg::Range,
        Ptg::Attr(AttrPtg::sum()),
    ];
    let evaluator = WorkbookEvaluator::new();
    assert_eq!(evaluator.evaluate_tokens(&workbook, &tokens, 0, 9, 9), ValueEval::Number(63.0));
    assert_eq!(eval_in(&mut workbook, "SUM((A1,B1))"), ValueEval::Error(ErrorEval::Value));
}

#[test]
fn eval_implicit_intersection() {
    let mut workbook = grid();
    // Z100 is outside the column, so a multi-row range has no single value.
    assert_eq!(eval_in(&mut workbook, "A1:A5+1"), ValueEval::Error(ErrorEval::Value));

    workbook.set_formula(0, 2, 7, "A1:A5*2").expect("formula");
    let evaluator = WorkbookEvaluator::new();
    assert_eq!(evaluator.evaluate(&workbook, 0, 2, 7), ValueEval::Number(40.0));
}

#[test]
fn eval_cross_sheet_and_names() {
    let mut workbook = sheet1();
    let inputs = workbook.add_sheet("Inputs").expect("add sheet");
    workbook.set_number(inputs, 0, 0, 4.0).expect("set");
    workbook.set_number(inputs, 1, 0, 6.0).expect("set");
    workbook.define_name("Rate", None, "Inputs!$A$1").expect("name");
    workbook.define_name("Values", None, "Inputs!$A$1:$A$2").expect("name");

    assert_eq!(eval_in(&mut workbook, "Inputs!A2*Rate"), ValueEval::Number(24.0));
    assert_eq!(eval_in(&mut workbook, "SUM(Values)"), ValueEval::Number(10.0));
    assert_eq!(eval_in(&mut workbook, "SUM(Sheet1:Inputs!A1)"), ValueEval::Number(4.0));
}

#[test]
fn eval_relative_tokens_follow_the_cell() {
    let workbook = grid();
    // RefN one row up and one column left of the evaluating cell.
    let tokens = vec![Ptg::RefN {
        class: OperandClass::Value,
        cell: CellRef::new(0xFFFF, 0xFF, true, true),
    }];
    let evaluator = WorkbookEvaluator::new();
    assert_eq!(evaluator.evaluate_tokens(&workbook, &tokens, 0, 3, 3), ValueEval::Number(22.0));
    assert_eq!(evaluator.evaluate_tokens(&workbook, &tokens, 0, 1, 1), ValueEval::Number(0.0));
}

#[test]
fn eval_results_are_cached_until_notified() {
    let mut workbook = sheet1();
    workbook.set_number(0, 0, 0, 1.0).expect("set");
    workbook.set_formula(0, 0, 1, "A1*10").expect("formula");
    workbook.set_formula(0, 0, 2, "B1+1").expect("formula");
    workbook.set_formula(0, 0, 3, "5").expect("formula");

    let evaluator = WorkbookEvaluator::new();
    assert_eq!(evaluator.evaluate(&workbook, 0, 0, 2), ValueEval::Number(11.0));
    assert_eq!(evaluator.evaluate(&workbook, 0, 0, 3), ValueEval::Number(5.0));
    assert!(evaluator.is_cached(0, 0, 1));

    workbook.set_number(0, 0, 0, 2.0).expect("set");
    // Stale until the change is reported.
    assert_eq!(evaluator.evaluate(&workbook, 0, 0, 2), ValueEval::Number(11.0));
    evaluator.notify_update_cell(0, 0, 0);
    assert!(!evaluator.is_cached(0, 0, 1));
    assert!(!evaluator.is_cached(0, 0, 2));
    assert!(evaluator.is_cached(0, 0, 3));
    assert_eq!(evaluator.evaluate(&workbook, 0, 0, 2), ValueEval::Number(21.0));

    workbook.remove_cell(0, 0, 0).expect("remove");
    evaluator.notify_delete_cell(0, 0, 0);
    assert_eq!(evaluator.evaluate(&workbook, 0, 0, 2), ValueEval::Number(1.0));

    evaluator.clear_all_cached_result_values();
    assert!(!evaluator.is_cached(0, 0, 3));
}

#[test]
fn eval_area_reader_notified_for_cell_added_later() {
    let mut workbook = sheet1();
    workbook.set_number(0, 0, 1, 1.0).expect("set");
    workbook.set_formula(0, 0, 0, "SUM(B1:B10)").expect("formula");

    let evaluator = WorkbookEvaluator::new();
    assert_eq!(evaluator.evaluate(&workbook, 0, 0, 0), ValueEval::Number(1.0));

    // B5 lay past the used range when A1 was first evaluated.
    workbook.set_number(0, 4, 1, 10.0).expect("set");
    evaluator.notify_update_cell(0, 4, 1);
    assert!(!evaluator.is_cached(0, 0, 0));
    assert_eq!(evaluator.evaluate(&workbook, 0, 0, 0), ValueEval::Number(11.0));

    // A cell outside the summed range leaves the result alone.
    workbook.set_number(0, 4, 2, 5.0).expect("set");
    evaluator.notify_update_cell(0, 4, 2);
    assert!(evaluator.is_cached(0, 0, 0));
}

#[test]
fn eval_circular_reference() {
    let mut workbook = sheet1();
    workbook.set_formula(0, 0, 0, "B1+1").expect("formula");
    workbook.set_formula(0, 0, 1, "A1+1").expect("formula");
    let evaluator = WorkbookEvaluator::new();
    assert_eq!(evaluator.evaluate(&workbook, 0, 0, 0), ValueEval::Error(ErrorEval::Value));
}

#[test]
fn eval_blank_and_plain_cells() {
    let mut workbook = sheet1();
    workbook.set_string(0, 0, 0, "text").expect("set");
    workbook.set_formula(0, 0, 1, "C1").expect("formula");
    let evaluator = WorkbookEvaluator::new();
    assert_eq!(evaluator.evaluate(&workbook, 0, 0, 0), ValueEval::String("text".to_string()));
    // A formula that yields a blank cell evaluates to zero; the cell itself stays blank.
    assert_eq!(evaluator.evaluate(&workbook, 0, 0, 1), ValueEval::Number(0.0));
    assert_eq!(evaluator.evaluate(&workbook, 0, 0, 2), ValueEval::Blank);
    assert_number(eval("Sheet1!C1+0"), 0.0);
}

/// One sheet of fixed cells, for states the workbook API does not create.
struct FixedBook {
    cells: Vec<((u16, u16), Vec<Ptg>, CachedValue)>,
}

impl EvaluationWorkbook for FixedBook {
    fn sheet_count(&self) -> usize {
        1
    }

    fn sheet_index(&self, name: &str) -> Option<usize> {
        name.eq_ignore_ascii_case("Fixed").then_some(0)
    }

    fn sheet_name(&self, sheet: usize) -> Option<&str> {
        (sheet == 0).then_some("Fixed")
    }

    fn cell(&self, sheet: usize, row: u16, col: u16) -> Option<EvaluationCell<'_>> {
        if sheet != 0 {
            return None;
        }
        self.cells
            .iter()
            .find(|(at, _, _)| *at == (row, col))
            .map(|(_, tokens, cached)| EvaluationCell::Formula { tokens, cached })
    }

    fn resolve_extern_sheet(&self, _extern_index: u16) -> Option<(usize, usize)> {
        None
    }

    fn name_formula(&self, _index: u16) -> Option<&[Ptg]> {
        None
    }
}

#[test]
fn eval_array_members_use_cached_result() {
    let book = FixedBook {
        cells: vec![
            ((0, 0), vec![Ptg::Exp { row: 0, col: 0 }], CachedValue::Number(7.5)),
            ((1, 0), vec![Ptg::Exp { row: 0, col: 0 }], CachedValue::String("x".to_string())),
            (
                (2, 0),
                vec![
                    Ptg::Ref {
                        class: OperandClass::Value,
                        cell: CellRef::relative(0, 0),
                    },
                    Ptg::Int(2),
                    Ptg::Mul,
                ],
                CachedValue::Empty,
            ),
            // Unknown extern sheet.
            (
                (3, 0),
                vec![Ptg::Ref3d {
                    class: OperandClass::Value,
                    extern_index: 9,
                    cell: CellRef::relative(0, 0),
                }],
                CachedValue::Empty,
            ),
        ],
    };
    let evaluator = WorkbookEvaluator::new();
    assert_eq!(evaluator.evaluate(&book, 0, 0, 0), ValueEval::Number(7.5));
    assert_eq!(evaluator.evaluate(&book, 0, 1, 0), ValueEval::String("x".to_string()));
    assert_eq!(evaluator.evaluate(&book, 0, 2, 0), ValueEval::Number(15.0));
    assert_eq!(evaluator.evaluate(&book, 0, 3, 0), ValueEval::Error(ErrorEval::Ref));
}
