pub(crate) mod arithmetic;
pub(crate) mod rounding;
pub(crate) mod trig;

pub(crate) use arithmetic::{eval_abs, eval_exp, eval_ln, eval_log10, eval_mod, eval_power, eval_sign, eval_sqrt};
pub(crate) use rounding::{eval_int, eval_round};
pub(crate) use trig::{eval_cos, eval_pi, eval_sin, eval_tan};
