pub(crate) mod basic;
pub(crate) mod substring;

pub(crate) use basic::{eval_concatenate, eval_len, eval_lower, eval_rept, eval_trim, eval_upper, eval_value};
pub(crate) use substring::{eval_left, eval_mid, eval_right};
