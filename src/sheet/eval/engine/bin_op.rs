use std::cmp::Ordering;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::ole::xls::ptg::Ptg;
use crate::sheet::eval::{ErrorEval, ValueEval};

use super::{EvalContext, to_number, to_text};

/// Evaluate a binary operator token. Operands arrive as pushed, so
/// references are still unresolved here.
pub(crate) fn eval_binary_op(ctx: &EvalContext<'_>, op: &Ptg, left: ValueEval, right: ValueEval) -> ValueEval {
    match op {
        Ptg::Range | Ptg::Intersection | Ptg::Union => return eval_reference_op(op, left, right),
        _ => {},
    }

    let left = ctx.single_value(left);
    let right = ctx.single_value(right);
    match op {
        Ptg::Concat => match (to_text(&left), to_text(&right)) {
            (Ok(l), Ok(r)) => ValueEval::String(l + &r),
            (Err(e), _) | (_, Err(e)) => ValueEval::Error(e),
        },
        Ptg::Lt | Ptg::Le | Ptg::Eq | Ptg::Ge | Ptg::Gt | Ptg::Ne => eval_comparison(op, &left, &right),
        _ => {
            let (ln, rn) = match (to_number(&left), to_number(&right)) {
                (Ok(l), Ok(r)) => (l, r),
                (Err(e), _) | (_, Err(e)) => return ValueEval::Error(e),
            };
            if matches!(op, Ptg::Sub) {
                let n = subtract(ln, rn);
                return if n.is_finite() {
                    ValueEval::Number(n)
                } else {
                    ValueEval::Error(ErrorEval::Num)
                };
            }
            number_result(match op {
                Ptg::Add => Ok(add(ln, rn)),
                Ptg::Mul => Ok(multiply(ln, rn)),
                Ptg::Div => divide(ln, rn),
                Ptg::Power => Ok(power(ln, rn)),
                _ => Err(ErrorEval::Value),
            })
        },
    }
}

pub(crate) fn eval_unary_op(ctx: &EvalContext<'_>, op: &Ptg, operand: ValueEval) -> ValueEval {
    let value = ctx.single_value(operand);
    if matches!(op, Ptg::UnaryPlus) && matches!(value, ValueEval::String(_)) {
        return value;
    }
    let n = match to_number(&value) {
        Ok(n) => n,
        Err(e) => return ValueEval::Error(e),
    };
    number_result(match op {
        Ptg::UnaryPlus => Ok(n),
        Ptg::UnaryMinus => Ok(-n),
        Ptg::Percent => divide(n, 100.0),
        _ => Err(ErrorEval::Value),
    })
}

/// Wrap an arithmetic result: non-finite numbers are `#NUM!` and negative
/// zero is shown as zero.
fn number_result(result: Result<f64, ErrorEval>) -> ValueEval {
    match result {
        Ok(n) if !n.is_finite() => ValueEval::Error(ErrorEval::Num),
        Ok(n) if n == 0.0 => ValueEval::Number(0.0),
        Ok(n) => ValueEval::Number(n),
        Err(e) => ValueEval::Error(e),
    }
}

/// Decimal form of `n` rounded to 15 significant digits.
pub(crate) fn to_decimal(n: f64) -> Option<Decimal> {
    Decimal::from_scientific(&format!("{n:.14e}")).ok()
}

/// Apply `op` on the 15-digit decimal forms of both operands, falling back
/// to binary arithmetic when either is out of decimal range.
fn decimal_op(
    ln: f64,
    rn: f64,
    op: fn(Decimal, Decimal) -> Option<Decimal>,
    native: fn(f64, f64) -> f64,
) -> f64 {
    to_decimal(ln)
        .zip(to_decimal(rn))
        .and_then(|(l, r)| op(l, r))
        .and_then(|d| d.normalize().to_f64())
        .unwrap_or_else(|| native(ln, rn))
}

pub(crate) fn add(ln: f64, rn: f64) -> f64 {
    decimal_op(ln, rn, Decimal::checked_add, |a, b| a + b)
}

pub(crate) fn multiply(ln: f64, rn: f64) -> f64 {
    decimal_op(ln, rn, Decimal::checked_mul, |a, b| a * b)
}

/// Subtraction keeps the sign of a zero result, unlike the other operators.
pub(crate) fn subtract(ln: f64, rn: f64) -> f64 {
    match decimal_op(ln, rn, Decimal::checked_sub, |a, b| a - b) {
        n if n == 0.0 => ln - rn,
        n => n,
    }
}

pub(crate) fn divide(ln: f64, rn: f64) -> Result<f64, ErrorEval> {
    if rn == 0.0 {
        return Err(ErrorEval::Div0);
    }
    Ok(decimal_op(ln, rn, Decimal::checked_div, |a, b| a / b))
}

/// `base ^ exponent`. A negative base with a fractional exponent below one
/// in magnitude is taken as an odd root: `(-8)^(1/3)` is `-2`.
pub(crate) fn power(base: f64, exponent: f64) -> f64 {
    if base < 0.0 && exponent.fract() != 0.0 && exponent.abs() < 1.0 {
        return -((-base).powf(exponent));
    }
    base.powf(exponent)
}

fn eval_comparison(op: &Ptg, left: &ValueEval, right: &ValueEval) -> ValueEval {
    if let ValueEval::Error(e) = left {
        return ValueEval::Error(*e);
    }
    if let ValueEval::Error(e) = right {
        return ValueEval::Error(*e);
    }

    let ordering = compare_values(left, right);
    ValueEval::Bool(match op {
        Ptg::Lt => ordering == Ordering::Less,
        Ptg::Le => ordering != Ordering::Greater,
        Ptg::Eq => ordering == Ordering::Equal,
        Ptg::Ge => ordering != Ordering::Less,
        Ptg::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Equal,
    })
}

/// Spreadsheet ordering of two scalars: numbers sort before text, text
/// before booleans, and text compares without regard to case. A blank
/// takes the zero value of the other side's type.
pub(crate) fn compare_values(left: &ValueEval, right: &ValueEval) -> Ordering {
    fn rank(value: &ValueEval) -> u8 {
        match value {
            ValueEval::Number(_) => 0,
            ValueEval::String(_) => 1,
            ValueEval::Bool(_) => 2,
            _ => 3,
        }
    }

    match (left, right) {
        (ValueEval::Blank, ValueEval::Blank) => Ordering::Equal,
        (ValueEval::Blank, other) => compare_values(&blank_as(other), other),
        (other, ValueEval::Blank) => compare_values(other, &blank_as(other)),
        (ValueEval::Number(l), ValueEval::Number(r)) => l.partial_cmp(r).unwrap_or(Ordering::Equal),
        (ValueEval::String(l), ValueEval::String(r)) => l.to_uppercase().cmp(&r.to_uppercase()),
        (ValueEval::Bool(l), ValueEval::Bool(r)) => l.cmp(r),
        _ => rank(left).cmp(&rank(right)),
    }
}

fn blank_as(other: &ValueEval) -> ValueEval {
    match other {
        ValueEval::String(_) => ValueEval::String(String::new()),
        ValueEval::Bool(_) => ValueEval::Bool(false),
        _ => ValueEval::Number(0.0),
    }
}

/// `:`, space and `,` between references.
fn eval_reference_op(op: &Ptg, left: ValueEval, right: ValueEval) -> ValueEval {
    if let ValueEval::Error(e) = left {
        return ValueEval::Error(e);
    }
    if let ValueEval::Error(e) = right {
        return ValueEval::Error(e);
    }
    let (Some(l), Some(r)) = (left.as_area(), right.as_area()) else {
        return ValueEval::Error(ErrorEval::Value);
    };
    match op {
        Ptg::Range => l.bounding(&r).map_or(ValueEval::Error(ErrorEval::Value), ValueEval::Area),
        Ptg::Intersection => l.intersect(&r).map_or(ValueEval::Error(ErrorEval::Null), ValueEval::Area),
        // Unions only make sense to functions that take reference lists.
        _ => ValueEval::Error(ErrorEval::Value),
    }
}
