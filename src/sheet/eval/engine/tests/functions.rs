#![cfg(all(test, feature = "eval_engine"))]

use super::{TOL, assert_number, eval, eval_in, sheet1};
use crate::ole::xls::ErrorCode;
use crate::sheet::eval::{ErrorEval, ValueEval};

fn numbers_in_column_a() -> crate::ole::xls::InternalWorkbook {
    let mut workbook = sheet1();
    for (row, n) in [1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
        workbook.set_number(0, row as u16, 0, n).expect("set");
    }
    workbook.set_string(0, 4, 0, "text").expect("set");
    workbook.set_bool(0, 5, 0, true).expect("set");
    workbook
}

#[test]
fn eval_aggregates() {
    let mut workbook = numbers_in_column_a();
    assert_eq!(eval_in(&mut workbook, "SUM(A1:A6)"), ValueEval::Number(10.0));
    assert_eq!(eval_in(&mut workbook, "AVERAGE(A1:A6)"), ValueEval::Number(2.5));
    assert_eq!(eval_in(&mut workbook, "COUNT(A1:A6)"), ValueEval::Number(4.0));
    assert_eq!(eval_in(&mut workbook, "COUNTA(A1:A8)"), ValueEval::Number(6.0));
    assert_eq!(eval_in(&mut workbook, "MIN(A1:A6)"), ValueEval::Number(1.0));
    assert_eq!(eval_in(&mut workbook, "MAX(A1:A6,9)"), ValueEval::Number(9.0));
    assert_eq!(eval_in(&mut workbook, "PRODUCT(A1:A6)"), ValueEval::Number(24.0));
    // Literal arguments are coerced, referenced text is skipped.
    assert_eq!(eval_in(&mut workbook, "SUM(A1:A6,\"5\",TRUE)"), ValueEval::Number(16.0));
    assert_eq!(eval_in(&mut workbook, "SUM(\"x\")"), ValueEval::Error(ErrorEval::Value));
    assert_eq!(eval_in(&mut workbook, "COUNT(1,\"2\",\"x\",TRUE)"), ValueEval::Number(3.0));
    assert_eq!(eval_in(&mut workbook, "MIN(B1:B3)"), ValueEval::Number(0.0));

    workbook.set_error(0, 6, 0, ErrorCode::NA).expect("set");
    assert_eq!(eval_in(&mut workbook, "SUM(A1:A7)"), ValueEval::Error(ErrorEval::NA));
    assert_eq!(eval_in(&mut workbook, "COUNT(A1:A7)"), ValueEval::Number(4.0));
}

#[test]
fn eval_math() {
    assert_eq!(eval("ABS(-3.5)"), ValueEval::Number(3.5));
    assert_eq!(eval("ROUND(2.345,2)"), ValueEval::Number(2.35));
    assert_eq!(eval("ROUND(-2.5,0)"), ValueEval::Number(-3.0));
    assert_eq!(eval("ROUND(1234.5,-2)"), ValueEval::Number(1200.0));
    assert_eq!(eval("MOD(-3,2)"), ValueEval::Number(1.0));
    assert_eq!(eval("MOD(7,-4)"), ValueEval::Number(-1.0));
    assert_eq!(eval("SQRT(16)"), ValueEval::Number(4.0));
    assert_eq!(eval("SQRT(-1)"), ValueEval::Error(ErrorEval::Num));
    assert_eq!(eval("INT(-1.5)"), ValueEval::Number(-2.0));
    assert_eq!(eval("SIGN(-0.1)"), ValueEval::Number(-1.0));
    assert_eq!(eval("LN(0)"), ValueEval::Error(ErrorEval::Num));
    assert_number(eval("PI()"), std::f64::consts::PI);
    assert_number(eval("EXP(1)"), std::f64::consts::E);
    assert!(matches!(eval("COS(0)"), ValueEval::Number(n) if (n - 1.0).abs() < TOL));
}

#[test]
fn eval_logical() {
    assert_eq!(eval("IF(1>2,\"yes\",\"no\")"), ValueEval::String("no".to_string()));
    assert_eq!(eval("IF(TRUE,5)"), ValueEval::Number(5.0));
    assert_eq!(eval("IF(FALSE,5)"), ValueEval::Bool(false));
    assert_eq!(eval("IF(\"maybe\",1,2)"), ValueEval::Error(ErrorEval::Value));
    assert_eq!(eval("AND(TRUE,1,\"TRUE\")"), ValueEval::Bool(true));
    assert_eq!(eval("OR(FALSE,0)"), ValueEval::Bool(false));
    assert_eq!(eval("AND(A1:A3)"), ValueEval::Error(ErrorEval::Value));
    assert_eq!(eval("NOT(0)"), ValueEval::Bool(true));
    assert_eq!(eval("TRUE()"), ValueEval::Bool(true));
    assert_eq!(eval("FALSE()"), ValueEval::Bool(false));
}

#[test]
fn eval_text_and_info() {
    assert_eq!(
        eval("CONCATENATE(\"a\",1.5,TRUE)"),
        ValueEval::String("a1.5TRUE".to_string())
    );
    assert_eq!(eval("LEN(\"héllo\")"), ValueEval::Number(5.0));
    assert_eq!(eval("LEN(12.5)"), ValueEval::Number(4.0));
    assert_eq!(eval("UPPER(\"abc\")"), ValueEval::String("ABC".to_string()));
    assert_eq!(eval("TRIM(\"  a   b \")"), ValueEval::String("a b".to_string()));
    assert_eq!(eval("LEFT(\"spread\",3)"), ValueEval::String("spr".to_string()));
    assert_eq!(eval("RIGHT(\"spread\")"), ValueEval::String("d".to_string()));
    assert_eq!(eval("MID(\"spread\",2,3)"), ValueEval::String("pre".to_string()));
    assert_eq!(eval("VALUE(\"1.5\")"), ValueEval::Number(1.5));

    assert_eq!(eval("ISBLANK(A1)"), ValueEval::Bool(true));
    assert_eq!(eval("ISBLANK(0)"), ValueEval::Bool(false));
    assert_eq!(eval("ISERROR(1/0)"), ValueEval::Bool(true));
    assert_eq!(eval("ISERROR(1)"), ValueEval::Bool(false));
    assert_eq!(eval("ISNA(NA())"), ValueEval::Bool(true));
    assert_eq!(eval("ISNUMBER(\"1\")"), ValueEval::Bool(false));
    assert_eq!(eval("ISTEXT(\"1\")"), ValueEval::Bool(true));
}

#[test]
fn eval_reference_functions() {
    let mut workbook = sheet1();
    for row in 0..4u16 {
        for col in 0..3u16 {
            workbook
                .set_number(0, row, col, (row * 3 + col + 1) as f64)
                .expect("set");
        }
    }

    assert_eq!(eval_in(&mut workbook, "ROWS(A1:C4)"), ValueEval::Number(4.0));
    assert_eq!(eval_in(&mut workbook, "COLUMNS(A1:C4)"), ValueEval::Number(3.0));
    assert_eq!(eval_in(&mut workbook, "ROWS(5)"), ValueEval::Number(1.0));
    assert_eq!(eval_in(&mut workbook, "ROW(B3)"), ValueEval::Number(3.0));
    assert_eq!(eval_in(&mut workbook, "COLUMN()"), ValueEval::Number(26.0));

    // B2:C3 holds 5, 6, 8, 9.
    assert_eq!(eval_in(&mut workbook, "SUM(OFFSET(A1,1,1,2,2))"), ValueEval::Number(28.0));
    assert_eq!(eval_in(&mut workbook, "OFFSET(A1,3,2)"), ValueEval::Number(12.0));
    assert_eq!(eval_in(&mut workbook, "SUM(OFFSET(C4,0,0,-2,-2))"), ValueEval::Number(8.0 + 9.0 + 11.0 + 12.0));
    assert_eq!(eval_in(&mut workbook, "OFFSET(A1,-1,0)"), ValueEval::Error(ErrorEval::Ref));
    assert_eq!(eval_in(&mut workbook, "OFFSET(A1,0,0,0,1)"), ValueEval::Error(ErrorEval::Ref));

    assert_eq!(eval_in(&mut workbook, "INDEX(A1:C4,2,3)"), ValueEval::Number(6.0));
    assert_eq!(eval_in(&mut workbook, "INDEX(A1:A4,3)"), ValueEval::Number(7.0));
    assert_eq!(eval_in(&mut workbook, "INDEX(A2:C2,2)"), ValueEval::Number(5.0));
    assert_eq!(eval_in(&mut workbook, "SUM(INDEX(A1:C4,0,2))"), ValueEval::Number(2.0 + 5.0 + 8.0 + 11.0));
    assert_eq!(eval_in(&mut workbook, "SUM(INDEX(A1:C4,4,0))"), ValueEval::Number(33.0));
    assert_eq!(eval_in(&mut workbook, "INDEX(A1:C4,5,1)"), ValueEval::Error(ErrorEval::Ref));

    assert_eq!(eval_in(&mut workbook, "CHOOSE(2,\"a\",\"b\",\"c\")"), ValueEval::String("b".to_string()));
    assert_eq!(eval_in(&mut workbook, "SUM(CHOOSE(1,A1:A4,B1:B4))"), ValueEval::Number(22.0));
    assert_eq!(eval_in(&mut workbook, "CHOOSE(4,1,2,3)"), ValueEval::Error(ErrorEval::Value));
}

#[test]
fn eval_unknown_function_is_name_error() {
    // Known to the parser but not implemented by the evaluator.
    assert_eq!(eval("TODAY()"), ValueEval::Error(ErrorEval::Name));
}
