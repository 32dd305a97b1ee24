//! Built-in function table: BIFF function index, name and arity.

use phf::phf_map;

/// Index used by `tFuncVar` for add-in and user-defined functions; the
/// function name is the first operand.
pub const FUNCTION_INDEX_EXTERNAL: u16 = 255;

pub const FUNCTION_INDEX_IF: u16 = 1;
pub const FUNCTION_INDEX_SUM: u16 = 4;
pub const FUNCTION_INDEX_CHOOSE: u16 = 100;

/// Upper bound on arguments in BIFF8
pub const MAX_ARGS: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionMetadata {
    pub index: u16,
    pub name: &'static str,
    pub min_args: u8,
    pub max_args: u8,
}

impl FunctionMetadata {
    /// Fixed-arity functions are encoded with `tFunc`, others with `tFuncVar`.
    #[inline]
    pub fn has_fixed_args(&self) -> bool {
        self.min_args == self.max_args
    }
}

macro_rules! meta {
    ($index:expr, $name:expr, $min:expr, $max:expr) => {
        FunctionMetadata {
            index: $index,
            name: $name,
            min_args: $min,
            max_args: $max,
        }
    };
}

static BY_INDEX: phf::Map<u16, FunctionMetadata> = phf_map! {
    0u16 => meta!(0, "COUNT", 0, MAX_ARGS),
    1u16 => meta!(1, "IF", 2, 3),
    2u16 => meta!(2, "ISNA", 1, 1),
    3u16 => meta!(3, "ISERROR", 1, 1),
    4u16 => meta!(4, "SUM", 0, MAX_ARGS),
    5u16 => meta!(5, "AVERAGE", 1, MAX_ARGS),
    6u16 => meta!(6, "MIN", 1, MAX_ARGS),
    7u16 => meta!(7, "MAX", 1, MAX_ARGS),
    8u16 => meta!(8, "ROW", 0, 1),
    9u16 => meta!(9, "COLUMN", 0, 1),
    10u16 => meta!(10, "NA", 0, 0),
    15u16 => meta!(15, "SIN", 1, 1),
    16u16 => meta!(16, "COS", 1, 1),
    17u16 => meta!(17, "TAN", 1, 1),
    19u16 => meta!(19, "PI", 0, 0),
    20u16 => meta!(20, "SQRT", 1, 1),
    21u16 => meta!(21, "EXP", 1, 1),
    22u16 => meta!(22, "LN", 1, 1),
    23u16 => meta!(23, "LOG10", 1, 1),
    24u16 => meta!(24, "ABS", 1, 1),
    25u16 => meta!(25, "INT", 1, 1),
    26u16 => meta!(26, "SIGN", 1, 1),
    27u16 => meta!(27, "ROUND", 2, 2),
    28u16 => meta!(28, "LOOKUP", 2, 3),
    29u16 => meta!(29, "INDEX", 2, 4),
    30u16 => meta!(30, "REPT", 2, 2),
    31u16 => meta!(31, "MID", 3, 3),
    32u16 => meta!(32, "LEN", 1, 1),
    33u16 => meta!(33, "VALUE", 1, 1),
    34u16 => meta!(34, "TRUE", 0, 0),
    35u16 => meta!(35, "FALSE", 0, 0),
    36u16 => meta!(36, "AND", 1, MAX_ARGS),
    37u16 => meta!(37, "OR", 1, MAX_ARGS),
    38u16 => meta!(38, "NOT", 1, 1),
    39u16 => meta!(39, "MOD", 2, 2),
    48u16 => meta!(48, "TEXT", 2, 2),
    63u16 => meta!(63, "RAND", 0, 0),
    64u16 => meta!(64, "MATCH", 2, 3),
    65u16 => meta!(65, "DATE", 3, 3),
    74u16 => meta!(74, "NOW", 0, 0),
    76u16 => meta!(76, "ROWS", 1, 1),
    77u16 => meta!(77, "COLUMNS", 1, 1),
    78u16 => meta!(78, "OFFSET", 3, 5),
    100u16 => meta!(100, "CHOOSE", 2, MAX_ARGS),
    101u16 => meta!(101, "HLOOKUP", 3, 4),
    102u16 => meta!(102, "VLOOKUP", 3, 4),
    112u16 => meta!(112, "LOWER", 1, 1),
    113u16 => meta!(113, "UPPER", 1, 1),
    115u16 => meta!(115, "LEFT", 1, 2),
    116u16 => meta!(116, "RIGHT", 1, 2),
    118u16 => meta!(118, "TRIM", 1, 1),
    127u16 => meta!(127, "ISTEXT", 1, 1),
    128u16 => meta!(128, "ISNUMBER", 1, 1),
    129u16 => meta!(129, "ISBLANK", 1, 1),
    169u16 => meta!(169, "COUNTA", 0, MAX_ARGS),
    183u16 => meta!(183, "PRODUCT", 0, MAX_ARGS),
    221u16 => meta!(221, "TODAY", 0, 0),
    336u16 => meta!(336, "CONCATENATE", 0, MAX_ARGS),
    337u16 => meta!(337, "POWER", 2, 2),
};

static BY_NAME: phf::Map<&'static str, u16> = phf_map! {
    "COUNT" => 0,
    "IF" => 1,
    "ISNA" => 2,
    "ISERROR" => 3,
    "SUM" => 4,
    "AVERAGE" => 5,
    "MIN" => 6,
    "MAX" => 7,
    "ROW" => 8,
    "COLUMN" => 9,
    "NA" => 10,
    "SIN" => 15,
    "COS" => 16,
    "TAN" => 17,
    "PI" => 19,
    "SQRT" => 20,
    "EXP" => 21,
    "LN" => 22,
    "LOG10" => 23,
    "ABS" => 24,
    "INT" => 25,
    "SIGN" => 26,
    "ROUND" => 27,
    "LOOKUP" => 28,
    "INDEX" => 29,
    "REPT" => 30,
    "MID" => 31,
    "LEN" => 32,
    "VALUE" => 33,
    "TRUE" => 34,
    "FALSE" => 35,
    "AND" => 36,
    "OR" => 37,
    "NOT" => 38,
    "MOD" => 39,
    "TEXT" => 48,
    "RAND" => 63,
    "MATCH" => 64,
    "DATE" => 65,
    "NOW" => 74,
    "ROWS" => 76,
    "COLUMNS" => 77,
    "OFFSET" => 78,
    "CHOOSE" => 100,
    "HLOOKUP" => 101,
    "VLOOKUP" => 102,
    "LOWER" => 112,
    "UPPER" => 113,
    "LEFT" => 115,
    "RIGHT" => 116,
    "TRIM" => 118,
    "ISTEXT" => 127,
    "ISNUMBER" => 128,
    "ISBLANK" => 129,
    "COUNTA" => 169,
    "PRODUCT" => 183,
    "TODAY" => 221,
    "CONCATENATE" => 336,
    "POWER" => 337,
};

#[inline]
pub fn by_index(index: u16) -> Option<&'static FunctionMetadata> {
    BY_INDEX.get(&index)
}

/// Lookup by name, case-insensitive.
pub fn by_name(name: &str) -> Option<&'static FunctionMetadata> {
    let upper = name.to_ascii_uppercase();
    BY_NAME.get(upper.as_str()).and_then(|&index| by_index(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_agree() {
        for (name, index) in BY_NAME.entries() {
            let meta = by_index(*index).unwrap();
            assert_eq!(meta.name, *name);
            assert_eq!(meta.index, *index);
        }
        assert_eq!(BY_NAME.len(), BY_INDEX.len());
    }

    #[test]
    fn test_lookup() {
        assert_eq!(by_name("sum").unwrap().index, FUNCTION_INDEX_SUM);
        assert!(by_name("ROUND").unwrap().has_fixed_args());
        assert!(!by_name("IF").unwrap().has_fixed_args());
        assert!(by_name("NOSUCHFUNC").is_none());
    }
}
