#![cfg(all(test, feature = "eval_engine"))]

use smallvec::SmallVec;

use super::sheet1;
use crate::ole::xls::InternalWorkbook;
use crate::ole::xls::ptg::{
    AttrFlags, AttrPtg, CellRef, FUNCTION_INDEX_CHOOSE, FUNCTION_INDEX_IF, OperandClass, Ptg,
};
use crate::sheet::eval::{ErrorEval, ValueEval, WorkbookEvaluator};

fn size(tokens: &[Ptg]) -> u16 {
    tokens.iter().map(Ptg::encoded_size).sum::<usize>() as u16
}

fn cell(row: u16, col: u16) -> Ptg {
    Ptg::Ref {
        class: OperandClass::Value,
        cell: CellRef::relative(row, col),
    }
}

fn func_var(index: u16, argc: u8) -> Ptg {
    Ptg::FuncVar {
        class: OperandClass::Value,
        index,
        argc,
        prompt: false,
        command: false,
    }
}

fn skip(data: u16) -> Ptg {
    Ptg::Attr(AttrPtg::new(AttrFlags::SKIP, data))
}

/// `IF(condition, if_true, [if_false])` laid out with jump tokens.
fn optimized_if(condition: Vec<Ptg>, if_true: Vec<Ptg>, if_false: Option<Vec<Ptg>>) -> Vec<Ptg> {
    let mut tokens = condition;
    tokens.push(Ptg::Attr(AttrPtg::new(AttrFlags::IF, size(&if_true) + 4)));
    tokens.extend(if_true);
    match if_false {
        Some(if_false) => {
            tokens.push(skip(size(&if_false) + 4 + 4 - 1));
            tokens.extend(if_false);
            tokens.push(skip(3));
            tokens.push(func_var(FUNCTION_INDEX_IF, 3));
        },
        None => {
            tokens.push(skip(3));
            tokens.push(func_var(FUNCTION_INDEX_IF, 2));
        },
    }
    tokens
}

/// `CHOOSE(selector, choices...)` laid out with a jump table.
fn optimized_choose(selector: Vec<Ptg>, choices: Vec<Vec<Ptg>>) -> Vec<Ptg> {
    let n = choices.len();
    let mut jump_table = SmallVec::new();
    let mut offset = 2 * (n as u16 + 1);
    for choice in &choices {
        jump_table.push(offset);
        offset += size(choice) + 4;
    }
    let mut attr = AttrPtg::new(AttrFlags::CHOOSE, n as u16);
    attr.jump_table = jump_table;
    attr.choose_offset = offset;

    let mut tokens = selector;
    tokens.push(Ptg::Attr(attr));
    for (k, choice) in choices.iter().enumerate() {
        tokens.extend(choice.iter().cloned());
        let rest: u16 = choices[k + 1..].iter().map(|c| size(c) + 4).sum();
        tokens.push(skip(rest + 4 - 1));
    }
    tokens.push(func_var(FUNCTION_INDEX_CHOOSE, n as u8 + 1));
    tokens
}

/// A1 holds the condition; B1 and C1 are formula cells so that the cache
/// shows which branch ran.
fn branches(condition: f64) -> InternalWorkbook {
    let mut workbook = sheet1();
    workbook.set_number(0, 0, 0, condition).expect("set");
    workbook.set_formula(0, 0, 1, "10").expect("set");
    workbook.set_formula(0, 0, 2, "20").expect("set");
    workbook
}

fn run(workbook: &mut InternalWorkbook, tokens: Vec<Ptg>) -> (WorkbookEvaluator, ValueEval) {
    workbook.set_formula_tokens(0, 5, 5, tokens).expect("set");
    let evaluator = WorkbookEvaluator::new();
    let value = evaluator.evaluate(workbook, 0, 5, 5);
    (evaluator, value)
}

#[test]
fn eval_optimized_if_takes_one_branch() {
    let tokens = || optimized_if(vec![cell(0, 0)], vec![cell(0, 1)], Some(vec![cell(0, 2)]));

    let mut workbook = branches(1.0);
    let (evaluator, value) = run(&mut workbook, tokens());
    assert_eq!(value, ValueEval::Number(10.0));
    assert!(evaluator.is_cached(0, 0, 1));
    assert!(!evaluator.is_cached(0, 0, 2));

    let mut workbook = branches(0.0);
    let (evaluator, value) = run(&mut workbook, tokens());
    assert_eq!(value, ValueEval::Number(20.0));
    assert!(!evaluator.is_cached(0, 0, 1));
    assert!(evaluator.is_cached(0, 0, 2));
}

#[test]
fn eval_optimized_if_without_false_argument() {
    let tokens = || optimized_if(vec![cell(0, 0)], vec![Ptg::Int(7)], None);

    let (_, value) = run(&mut branches(1.0), tokens());
    assert_eq!(value, ValueEval::Number(7.0));
    let (_, value) = run(&mut branches(0.0), tokens());
    assert_eq!(value, ValueEval::Bool(false));
}

#[test]
fn eval_optimized_if_condition_error() {
    let mut workbook = branches(0.0);
    workbook.set_string(0, 0, 0, "neither").expect("set");
    let tokens = optimized_if(vec![cell(0, 0)], vec![cell(0, 1)], Some(vec![cell(0, 2)]));
    let (evaluator, value) = run(&mut workbook, tokens);
    assert_eq!(value, ValueEval::Error(ErrorEval::Value));
    assert!(!evaluator.is_cached(0, 0, 1));
    assert!(!evaluator.is_cached(0, 0, 2));

    let tokens = optimized_if(vec![Ptg::Err(ErrorEval::Div0)], vec![Ptg::Int(1)], None);
    let (_, value) = run(&mut branches(0.0), tokens);
    assert_eq!(value, ValueEval::Error(ErrorEval::Div0));
}

#[test]
fn eval_optimized_if_nested() {
    // IF(A1, IF(FALSE, 1, 2), 3)
    let inner = optimized_if(vec![Ptg::Bool(false)], vec![Ptg::Int(1)], Some(vec![Ptg::Int(2)]));
    let tokens = optimized_if(vec![cell(0, 0)], inner, Some(vec![Ptg::Int(3)]));
    let (_, value) = run(&mut branches(1.0), tokens.clone());
    assert_eq!(value, ValueEval::Number(2.0));
    let (_, value) = run(&mut branches(0.0), tokens);
    assert_eq!(value, ValueEval::Number(3.0));
}

#[test]
fn eval_optimized_choose() {
    let tokens = |selector: Ptg| {
        optimized_choose(
            vec![selector],
            vec![vec![cell(0, 1)], vec![Ptg::Str("two".to_string())], vec![cell(0, 2)]],
        )
    };

    let mut workbook = branches(0.0);
    let (evaluator, value) = run(&mut workbook, tokens(Ptg::Int(3)));
    assert_eq!(value, ValueEval::Number(20.0));
    assert!(!evaluator.is_cached(0, 0, 1));
    assert!(evaluator.is_cached(0, 0, 2));

    let (_, value) = run(&mut workbook, tokens(Ptg::Num(2.9)));
    assert_eq!(value, ValueEval::String("two".to_string()));

    let (evaluator, value) = run(&mut workbook, tokens(Ptg::Int(4)));
    assert_eq!(value, ValueEval::Error(ErrorEval::Value));
    assert!(!evaluator.is_cached(0, 0, 1));

    let (_, value) = run(&mut workbook, tokens(Ptg::Err(ErrorEval::NA)));
    assert_eq!(value, ValueEval::Error(ErrorEval::NA));
}

#[test]
fn eval_jump_inside_token_is_rejected() {
    let tokens = vec![
        Ptg::Bool(false),
        Ptg::Attr(AttrPtg::new(AttrFlags::IF, 2)),
        Ptg::Int(1),
        skip(3),
        func_var(FUNCTION_INDEX_IF, 2),
    ];
    let (_, value) = run(&mut branches(0.0), tokens);
    assert_eq!(value, ValueEval::Error(ErrorEval::Value));
}

#[test]
fn eval_memory_tokens_are_transparent() {
    let tokens = vec![
        Ptg::MemFunc {
            class: OperandClass::Reference,
            size: 5,
        },
        cell(0, 1),
        Ptg::Paren,
    ];
    let (_, value) = run(&mut branches(0.0), tokens);
    assert_eq!(value, ValueEval::Number(10.0));
}
