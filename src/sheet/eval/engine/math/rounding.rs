use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::sheet::eval::ValueEval;

use super::super::bin_op::to_decimal;
use super::super::{EvalContext, EvalResult, finite, number_arg};

/// ROUND(number, digits), halves away from zero. Negative `digits` round
/// to the left of the decimal point.
pub(crate) fn eval_round(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    let n = number_arg(ctx, args, 0)?;
    let digits = number_arg(ctx, args, 1)?.trunc();
    finite(round_half_away(n, digits.clamp(-308.0, 308.0) as i32))
}

pub(crate) fn eval_int(ctx: &EvalContext<'_>, args: &[ValueEval]) -> EvalResult {
    finite(number_arg(ctx, args, 0)?.floor())
}

pub(crate) fn round_half_away(n: f64, digits: i32) -> f64 {
    decimal_round(n, digits).unwrap_or_else(|| {
        let factor = 10f64.powi(digits);
        (n * factor).round() / factor
    })
}

fn decimal_round(n: f64, digits: i32) -> Option<f64> {
    let value = to_decimal(n)?;
    let rounded = if digits >= 0 {
        value.round_dp_with_strategy(digits.min(28) as u32, RoundingStrategy::MidpointAwayFromZero)
    } else {
        let factor = Decimal::from(10i64.checked_pow(digits.unsigned_abs())?);
        value
            .checked_div(factor)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(factor)?
    };
    rounded.normalize().to_f64()
}
