#![cfg(all(test, feature = "eval_engine"))]

use super::{assert_number, eval, sheet1};
use crate::ole::xls::ptg::Ptg;
use crate::sheet::eval::{ErrorEval, ValueEval, WorkbookEvaluator};

#[test]
fn eval_decimal_sums_are_exact() {
    assert_eq!(eval("0.1+0.2"), ValueEval::Number(0.3));
    assert_eq!(eval("0.3-0.1"), ValueEval::Number(0.2));
    assert_eq!(eval("1.1*1.1"), ValueEval::Number(1.21));
    assert_eq!(eval("SUM(0.1,0.2,0.3)"), ValueEval::Number(0.6));
}

#[test]
fn eval_division_by_zero() {
    assert_eq!(eval("5/0"), ValueEval::Error(ErrorEval::Div0));
    assert_eq!(eval("MOD(5,0)"), ValueEval::Error(ErrorEval::Div0));
    assert_eq!(eval("AVERAGE(A1:A3)"), ValueEval::Error(ErrorEval::Div0));
}

#[test]
fn eval_zero_signs() {
    let product = eval("(-2)*0");
    assert_eq!(product, ValueEval::Number(0.0));
    assert!(matches!(product, ValueEval::Number(n) if n.is_sign_positive()));

    let difference = eval("2-2");
    assert!(matches!(difference, ValueEval::Number(n) if n == 0.0 && n.is_sign_positive()));

    // Subtraction keeps a negative zero.
    let workbook = sheet1();
    let tokens = vec![Ptg::Num(-0.0), Ptg::Num(0.0), Ptg::Sub];
    let result = WorkbookEvaluator::new().evaluate_tokens(&workbook, &tokens, 0, 0, 0);
    assert!(matches!(result, ValueEval::Number(n) if n == 0.0 && n.is_sign_negative()));
}

#[test]
fn eval_power_of_negative_base() {
    assert_number(eval("POWER(-8,1/3)"), -2.0);
    assert_number(eval("(-8)^(1/3)"), -2.0);
    assert_eq!(eval("2^10"), ValueEval::Number(1024.0));
    assert_eq!(eval("(-8)^1.5"), ValueEval::Error(ErrorEval::Num));
    assert_eq!(eval("10^400"), ValueEval::Error(ErrorEval::Num));
}

#[test]
fn eval_coercion_and_errors() {
    assert_eq!(eval("\"3\"+4"), ValueEval::Number(7.0));
    assert_eq!(eval("TRUE+1"), ValueEval::Number(2.0));
    assert_eq!(eval("\"abc\"+1"), ValueEval::Error(ErrorEval::Value));
    assert_eq!(eval("50%"), ValueEval::Number(0.5));
    assert_eq!(eval("-\"2\""), ValueEval::Number(-2.0));
    assert_eq!(eval("+\"x\""), ValueEval::String("x".to_string()));
    assert_eq!(eval("1&\"a\"&TRUE"), ValueEval::String("1aTRUE".to_string()));
    // The left operand's error wins.
    assert_eq!(eval("(1/0)+#N/A"), ValueEval::Error(ErrorEval::Div0));
    assert_eq!(eval("#N/A+(1/0)"), ValueEval::Error(ErrorEval::NA));
}

#[test]
fn eval_comparisons() {
    assert_eq!(eval("1<\"a\""), ValueEval::Bool(true));
    assert_eq!(eval("\"z\"<FALSE"), ValueEval::Bool(true));
    assert_eq!(eval("\"abc\"=\"ABC\""), ValueEval::Bool(true));
    assert_eq!(eval("2>=2"), ValueEval::Bool(true));
    assert_eq!(eval("2<>2"), ValueEval::Bool(false));
    // A1 is blank: equal to zero and to the empty string.
    assert_eq!(eval("A1=0"), ValueEval::Bool(true));
    assert_eq!(eval("A1=\"\""), ValueEval::Bool(true));
}
