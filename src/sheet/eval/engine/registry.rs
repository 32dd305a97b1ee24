use phf::phf_map;

use super::{EvalContext, EvalResult, aggregate, info, logical, lookup, math, text};
use crate::sheet::eval::ValueEval;

pub(crate) type EvalFn = fn(&EvalContext<'_>, &[ValueEval]) -> EvalResult;

/// Implemented built-in functions, keyed by their upper-case name.
pub(crate) static FUNCTION_MAP: phf::Map<&'static str, EvalFn> = phf_map! {
    // Aggregates
    "SUM" => aggregate::eval_sum as EvalFn,
    "PRODUCT" => aggregate::eval_product as EvalFn,
    "AVERAGE" => aggregate::eval_average as EvalFn,
    "COUNT" => aggregate::eval_count as EvalFn,
    "COUNTA" => aggregate::eval_counta as EvalFn,
    "MIN" => aggregate::eval_min as EvalFn,
    "MAX" => aggregate::eval_max as EvalFn,

    // Math
    "ABS" => math::eval_abs as EvalFn,
    "SIGN" => math::eval_sign as EvalFn,
    "INT" => math::eval_int as EvalFn,
    "ROUND" => math::eval_round as EvalFn,
    "POWER" => math::eval_power as EvalFn,
    "MOD" => math::eval_mod as EvalFn,
    "SQRT" => math::eval_sqrt as EvalFn,
    "EXP" => math::eval_exp as EvalFn,
    "LN" => math::eval_ln as EvalFn,
    "LOG10" => math::eval_log10 as EvalFn,
    "PI" => math::eval_pi as EvalFn,
    "SIN" => math::eval_sin as EvalFn,
    "COS" => math::eval_cos as EvalFn,
    "TAN" => math::eval_tan as EvalFn,

    // Logical
    "IF" => logical::eval_if as EvalFn,
    "AND" => logical::eval_and as EvalFn,
    "OR" => logical::eval_or as EvalFn,
    "NOT" => logical::eval_not as EvalFn,
    "TRUE" => logical::eval_true as EvalFn,
    "FALSE" => logical::eval_false as EvalFn,

    // Text
    "CONCATENATE" => text::eval_concatenate as EvalFn,
    "LEN" => text::eval_len as EvalFn,
    "UPPER" => text::eval_upper as EvalFn,
    "LOWER" => text::eval_lower as EvalFn,
    "TRIM" => text::eval_trim as EvalFn,
    "LEFT" => text::eval_left as EvalFn,
    "RIGHT" => text::eval_right as EvalFn,
    "MID" => text::eval_mid as EvalFn,
    "REPT" => text::eval_rept as EvalFn,
    "VALUE" => text::eval_value as EvalFn,

    // Information
    "ISBLANK" => info::eval_isblank as EvalFn,
    "ISERROR" => info::eval_iserror as EvalFn,
    "ISNA" => info::eval_isna as EvalFn,
    "ISNUMBER" => info::eval_isnumber as EvalFn,
    "ISTEXT" => info::eval_istext as EvalFn,
    "NA" => info::eval_na as EvalFn,

    // Lookup and reference
    "ROW" => lookup::eval_row as EvalFn,
    "COLUMN" => lookup::eval_column as EvalFn,
    "ROWS" => lookup::eval_rows as EvalFn,
    "COLUMNS" => lookup::eval_columns as EvalFn,
    "OFFSET" => lookup::eval_offset as EvalFn,
    "INDEX" => lookup::eval_index as EvalFn,
    "CHOOSE" => lookup::eval_choose as EvalFn,
};
