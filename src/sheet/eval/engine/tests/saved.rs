#![cfg(all(test, feature = "eval_engine"))]

use std::fs;

use tempfile::tempdir;

use crate::common::ReadOptions;
use crate::ole::CompoundFile;
use crate::ole::xls::InternalWorkbook;
use crate::sheet::eval::{ErrorEval, ValueEval, WorkbookEvaluator};

fn build_workbook(path: &std::path::Path) {
    let mut workbook = InternalWorkbook::new();
    let data = workbook.add_sheet("Data").expect("add sheet");
    let report = workbook.add_sheet("Report").expect("add sheet");
    for row in 0..4u16 {
        workbook.set_number(data, row, 0, (row + 1) as f64 * 1.1).expect("set");
    }
    workbook.set_string(data, 4, 0, "total").expect("set");
    workbook.define_name("Amounts", None, "Data!$A$1:$A$4").expect("name");

    workbook.set_formula(report, 0, 0, "SUM(Amounts)").expect("set");
    workbook.set_formula(report, 1, 0, "A1/COUNT(Data!A1:A5)").expect("set");
    workbook.set_formula(report, 2, 0, "Data!A5&\": \"&A1").expect("set");
    workbook.set_formula(report, 3, 0, "INDEX(Amounts,5)").expect("set");

    let file = workbook.to_compound_file().expect("compound file");
    fs::write(path, file.to_bytes().expect("serialize")).expect("write file");
}

#[test]
fn eval_workbook_read_back_from_disk() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("report.xls");
    build_workbook(&path);

    let bytes = fs::read(&path).expect("read file");
    let file = CompoundFile::open(&bytes).expect("open compound file");
    let workbook = InternalWorkbook::from_compound_file(&file, &ReadOptions::new()).expect("load workbook");
    let report = workbook.sheet_index("Report").expect("sheet");
    let evaluator = WorkbookEvaluator::new();

    assert_eq!(evaluator.evaluate(&workbook, report, 0, 0), ValueEval::Number(11.0));
    assert_eq!(evaluator.evaluate(&workbook, report, 1, 0), ValueEval::Number(2.75));
    assert_eq!(
        evaluator.evaluate(&workbook, report, 2, 0),
        ValueEval::String("total: 11".to_string())
    );
    assert_eq!(
        evaluator.evaluate(&workbook, report, 3, 0),
        ValueEval::Error(ErrorEval::Ref)
    );
}
