//! Parsed formula tokens ("Ptg", parse thing) in BIFF8 encoding.
//!
//! A formula is stored as a reverse-polish token array `rgce` of `cce`
//! bytes. Array constants and memory-area lists do not fit in their token
//! and are appended after `rgce` in token order; [`Ptg::read_tokens`] and
//! [`Ptg::write_tokens`] handle both parts.
//!
//! Tokens whose id has bit 0x20 or 0x40 set carry an [`OperandClass`]
//! in those bits.

mod function;
mod parser;
mod reference;
mod render;
mod shared;
mod shifter;

pub use function::{
    FUNCTION_INDEX_CHOOSE, FUNCTION_INDEX_EXTERNAL, FUNCTION_INDEX_IF, FUNCTION_INDEX_SUM,
    FunctionMetadata, by_index as function_by_index, by_name as function_by_name,
};
pub use parser::{FormulaParser, ParsingWorkbook, parse_formula};
pub use reference::{
    AreaRef, CellRef, MAX_COL, MAX_ROW, RangeAddress, cell_name, column_to_letters,
    letters_to_column, parse_cell_ref,
};
pub use render::{ExternSheet, FormulaRenderingWorkbook, format_sheet_name, render_formula};
pub use shared::convert_shared_formula;
pub use shifter::RowShifter;

use bitflags::bitflags;
use bytes::BufMut;
use smallvec::SmallVec;
use thiserror::Error;

use crate::common::binary::{BinaryError, ByteCursor};
use crate::common::number_text::number_to_text;
use crate::ole::xls::ErrorCode;
use crate::ole::xls::strings;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error(transparent)]
    Binary(#[from] BinaryError),

    #[error("Unknown token id 0x{0:02X}")]
    UnknownToken(u8),

    #[error("Unknown built-in function index {0}")]
    UnknownFunction(u16),

    #[error("Unknown function '{0}'")]
    UnknownFunctionName(String),

    #[error("Function {name} takes {min} to {max} arguments, got {given}")]
    ArgumentCount {
        name: &'static str,
        min: u8,
        max: u8,
        given: usize,
    },

    #[error("Token array is malformed: {0}")]
    InvalidTokens(String),

    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Sheet '{0}' not found")]
    UnknownSheet(String),

    #[error("Extern sheet index {0} cannot be resolved")]
    UnknownExternSheet(u16),

    #[error("Name index {0} cannot be resolved")]
    UnknownName(u16),

    #[error("Shared formula token at {0} must be resolved before use")]
    UnresolvedSharedFormula(String),
}

pub type FormulaResult<T> = Result<T, FormulaError>;

/// Operand class encoded in bits 5 and 6 of a classified token id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperandClass {
    #[default]
    Reference,
    Value,
    Array,
}

impl OperandClass {
    #[inline]
    fn from_id(id: u8) -> Self {
        match id & 0x60 {
            0x20 => OperandClass::Reference,
            0x40 => OperandClass::Value,
            _ => OperandClass::Array,
        }
    }

    #[inline]
    fn bits(self) -> u8 {
        match self {
            OperandClass::Reference => 0x20,
            OperandClass::Value => 0x40,
            OperandClass::Array => 0x60,
        }
    }
}

bitflags! {
    /// Option bits of `tAttr`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttrFlags: u8 {
        const VOLATILE = 0x01;
        const IF = 0x02;
        const CHOOSE = 0x04;
        const SKIP = 0x08;
        const SUM = 0x10;
        const ASSIGN = 0x20;
        const SPACE = 0x40;
    }
}

/// `tAttr` payload. For `CHOOSE` the jump table holds one offset per
/// choice, followed by `choose_offset` pointing past the function token.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrPtg {
    pub flags: AttrFlags,
    pub data: u16,
    pub jump_table: SmallVec<[u16; 4]>,
    pub choose_offset: u16,
}

impl AttrPtg {
    pub fn new(flags: AttrFlags, data: u16) -> Self {
        Self {
            flags,
            data,
            jump_table: SmallVec::new(),
            choose_offset: 0,
        }
    }

    pub fn sum() -> Self {
        Self::new(AttrFlags::SUM, 0)
    }

    #[inline]
    pub fn is_sum(&self) -> bool {
        self.flags.contains(AttrFlags::SUM)
    }

    #[inline]
    pub fn is_if(&self) -> bool {
        self.flags.contains(AttrFlags::IF)
    }

    #[inline]
    pub fn is_skip(&self) -> bool {
        self.flags.contains(AttrFlags::SKIP)
    }

    #[inline]
    pub fn is_choose(&self) -> bool {
        self.flags.contains(AttrFlags::CHOOSE)
    }
}

/// One element of an array constant.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    Empty,
    Number(f64),
    String(String),
    Bool(bool),
    Error(ErrorCode),
}

/// `{1,2;3,4}` style constant, values in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayConstant {
    pub rows: u16,
    pub cols: u16,
    pub values: Vec<ArrayValue>,
}

impl ArrayConstant {
    pub fn value(&self, row: usize, col: usize) -> Option<&ArrayValue> {
        if col >= self.cols as usize {
            return None;
        }
        self.values.get(row * self.cols as usize + col)
    }

    fn read(cursor: &mut ByteCursor<'_>) -> FormulaResult<Self> {
        let cols = cursor.read_u8()? as u16 + 1;
        let rows = cursor.read_u16()?.wrapping_add(1);
        let count = rows as usize * cols as usize;
        let mut values = Vec::with_capacity(count.min(cursor.remaining()));
        for _ in 0..count {
            let kind = cursor.read_u8()?;
            let value = match kind {
                0x00 => {
                    cursor.skip(8)?;
                    ArrayValue::Empty
                },
                0x01 => ArrayValue::Number(cursor.read_f64()?),
                0x02 => ArrayValue::String(strings::read_unicode_string(cursor)?),
                0x04 => {
                    let b = cursor.read_u8()?;
                    cursor.skip(7)?;
                    ArrayValue::Bool(b != 0)
                },
                0x10 => {
                    let code = cursor.read_u8()?;
                    cursor.skip(7)?;
                    ArrayValue::Error(ErrorCode::from_code(code).unwrap_or(ErrorCode::NA))
                },
                other => {
                    return Err(FormulaError::InvalidTokens(format!(
                        "unknown array constant type 0x{other:02X}"
                    )));
                },
            };
            values.push(value);
        }
        Ok(Self { rows, cols, values })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.put_u8((self.cols - 1) as u8);
        out.put_u16_le(self.rows - 1);
        for value in &self.values {
            match value {
                ArrayValue::Empty => {
                    out.put_u8(0x00);
                    out.put_bytes(0, 8);
                },
                ArrayValue::Number(n) => {
                    out.put_u8(0x01);
                    out.put_f64_le(*n);
                },
                ArrayValue::String(s) => {
                    out.put_u8(0x02);
                    strings::write_unicode_string(out, s);
                },
                ArrayValue::Bool(b) => {
                    out.put_u8(0x04);
                    out.put_u8(*b as u8);
                    out.put_bytes(0, 7);
                },
                ArrayValue::Error(e) => {
                    out.put_u8(0x10);
                    out.put_u8(e.code());
                    out.put_bytes(0, 7);
                },
            }
        }
    }

    /// Text form, `{1,"a";TRUE,#N/A}`.
    pub fn format(&self) -> String {
        let mut out = String::from("{");
        for row in 0..self.rows as usize {
            if row > 0 {
                out.push(';');
            }
            for col in 0..self.cols as usize {
                if col > 0 {
                    out.push(',');
                }
                match self.value(row, col) {
                    Some(ArrayValue::Number(n)) => out.push_str(&number_to_text(*n)),
                    Some(ArrayValue::String(s)) => {
                        out.push('"');
                        out.push_str(&s.replace('"', "\"\""));
                        out.push('"');
                    },
                    Some(ArrayValue::Bool(b)) => out.push_str(if *b { "TRUE" } else { "FALSE" }),
                    Some(ArrayValue::Error(e)) => out.push_str(e.text()),
                    Some(ArrayValue::Empty) | None => {},
                }
            }
        }
        out.push('}');
        out
    }
}

/// A single formula token.
#[derive(Debug, Clone, PartialEq)]
pub enum Ptg {
    /// Pointer to the shared or array formula anchored at `(row, col)`
    Exp { row: u16, col: u16 },
    /// Pointer to a data table anchored at `(row, col)`
    Tbl { row: u16, col: u16 },
    Add,
    Sub,
    Mul,
    Div,
    Power,
    Concat,
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
    Intersection,
    Union,
    Range,
    UnaryPlus,
    UnaryMinus,
    Percent,
    Paren,
    MissingArg,
    Str(String),
    Attr(AttrPtg),
    Err(ErrorCode),
    Bool(bool),
    Int(u16),
    Num(f64),
    Array { class: OperandClass, value: ArrayConstant },
    Func { class: OperandClass, index: u16 },
    FuncVar {
        class: OperandClass,
        index: u16,
        argc: u8,
        prompt: bool,
        command: bool,
    },
    /// Defined name, 1-based index into the NAME records
    Name { class: OperandClass, index: u16 },
    Ref { class: OperandClass, cell: CellRef },
    Area { class: OperandClass, area: AreaRef },
    MemArea {
        class: OperandClass,
        size: u16,
        ranges: Vec<RangeAddress>,
    },
    MemErr { class: OperandClass, size: u16 },
    MemNoMem { class: OperandClass, size: u16 },
    MemFunc { class: OperandClass, size: u16 },
    RefErr { class: OperandClass },
    AreaErr { class: OperandClass },
    /// Shared-formula reference, relative components are offsets
    RefN { class: OperandClass, cell: CellRef },
    AreaN { class: OperandClass, area: AreaRef },
    /// External or add-in name, 1-based `name_index` inside the SUPBOOK
    NameX {
        class: OperandClass,
        extern_index: u16,
        name_index: u16,
    },
    Ref3d {
        class: OperandClass,
        extern_index: u16,
        cell: CellRef,
    },
    Area3d {
        class: OperandClass,
        extern_index: u16,
        area: AreaRef,
    },
    RefErr3d { class: OperandClass, extern_index: u16 },
    AreaErr3d { class: OperandClass, extern_index: u16 },
}

impl Ptg {
    /// Read one token. Array constants are left empty until the trailing
    /// data is read by [`Ptg::read_tokens`].
    pub fn read(cursor: &mut ByteCursor<'_>) -> FormulaResult<Ptg> {
        let id = cursor.read_u8()?;
        let ptg = match id {
            0x01 => Ptg::Exp {
                row: cursor.read_u16()?,
                col: cursor.read_u16()?,
            },
            0x02 => Ptg::Tbl {
                row: cursor.read_u16()?,
                col: cursor.read_u16()?,
            },
            0x03 => Ptg::Add,
            0x04 => Ptg::Sub,
            0x05 => Ptg::Mul,
            0x06 => Ptg::Div,
            0x07 => Ptg::Power,
            0x08 => Ptg::Concat,
            0x09 => Ptg::Lt,
            0x0A => Ptg::Le,
            0x0B => Ptg::Eq,
            0x0C => Ptg::Ge,
            0x0D => Ptg::Gt,
            0x0E => Ptg::Ne,
            0x0F => Ptg::Intersection,
            0x10 => Ptg::Union,
            0x11 => Ptg::Range,
            0x12 => Ptg::UnaryPlus,
            0x13 => Ptg::UnaryMinus,
            0x14 => Ptg::Percent,
            0x15 => Ptg::Paren,
            0x16 => Ptg::MissingArg,
            0x17 => Ptg::Str(strings::read_short_unicode_string(cursor)?),
            0x19 => {
                let flags = AttrFlags::from_bits_retain(cursor.read_u8()?);
                let data = cursor.read_u16()?;
                let mut attr = AttrPtg::new(flags, data);
                if flags.contains(AttrFlags::CHOOSE) {
                    for _ in 0..data {
                        attr.jump_table.push(cursor.read_u16()?);
                    }
                    attr.choose_offset = cursor.read_u16()?;
                }
                Ptg::Attr(attr)
            },
            0x1C => {
                let code = cursor.read_u8()?;
                Ptg::Err(ErrorCode::from_code(code).ok_or_else(|| {
                    FormulaError::InvalidTokens(format!("unknown error code 0x{code:02X}"))
                })?)
            },
            0x1D => Ptg::Bool(cursor.read_u8()? != 0),
            0x1E => Ptg::Int(cursor.read_u16()?),
            0x1F => Ptg::Num(cursor.read_f64()?),
            0x20..=0x7F => Self::read_classified(id, cursor)?,
            other => return Err(FormulaError::UnknownToken(other)),
        };
        Ok(ptg)
    }

    fn read_classified(id: u8, cursor: &mut ByteCursor<'_>) -> FormulaResult<Ptg> {
        let class = OperandClass::from_id(id);
        let ptg = match (id & 0x1F) | 0x20 {
            0x20 => {
                cursor.skip(7)?;
                Ptg::Array {
                    class,
                    value: ArrayConstant {
                        rows: 0,
                        cols: 0,
                        values: Vec::new(),
                    },
                }
            },
            0x21 => Ptg::Func {
                class,
                index: cursor.read_u16()?,
            },
            0x22 => {
                let argc = cursor.read_u8()?;
                let index = cursor.read_u16()?;
                Ptg::FuncVar {
                    class,
                    index: index & 0x7FFF,
                    argc: argc & 0x7F,
                    prompt: argc & 0x80 != 0,
                    command: index & 0x8000 != 0,
                }
            },
            0x23 => {
                let index = cursor.read_u16()?;
                cursor.skip(2)?;
                Ptg::Name { class, index }
            },
            0x24 => Ptg::Ref {
                class,
                cell: CellRef::read(cursor)?,
            },
            0x25 => Ptg::Area {
                class,
                area: AreaRef::read(cursor)?,
            },
            0x26 => {
                cursor.skip(4)?;
                Ptg::MemArea {
                    class,
                    size: cursor.read_u16()?,
                    ranges: Vec::new(),
                }
            },
            0x27 => {
                cursor.skip(4)?;
                Ptg::MemErr {
                    class,
                    size: cursor.read_u16()?,
                }
            },
            0x28 => {
                cursor.skip(4)?;
                Ptg::MemNoMem {
                    class,
                    size: cursor.read_u16()?,
                }
            },
            0x29 => Ptg::MemFunc {
                class,
                size: cursor.read_u16()?,
            },
            0x2A => {
                cursor.skip(4)?;
                Ptg::RefErr { class }
            },
            0x2B => {
                cursor.skip(8)?;
                Ptg::AreaErr { class }
            },
            0x2C => Ptg::RefN {
                class,
                cell: CellRef::read(cursor)?,
            },
            0x2D => Ptg::AreaN {
                class,
                area: AreaRef::read(cursor)?,
            },
            0x39 => {
                let extern_index = cursor.read_u16()?;
                let name_index = cursor.read_u16()?;
                cursor.skip(2)?;
                Ptg::NameX {
                    class,
                    extern_index,
                    name_index,
                }
            },
            0x3A => Ptg::Ref3d {
                class,
                extern_index: cursor.read_u16()?,
                cell: CellRef::read(cursor)?,
            },
            0x3B => Ptg::Area3d {
                class,
                extern_index: cursor.read_u16()?,
                area: AreaRef::read(cursor)?,
            },
            0x3C => {
                let extern_index = cursor.read_u16()?;
                cursor.skip(4)?;
                Ptg::RefErr3d {
                    class,
                    extern_index,
                }
            },
            0x3D => {
                let extern_index = cursor.read_u16()?;
                cursor.skip(8)?;
                Ptg::AreaErr3d {
                    class,
                    extern_index,
                }
            },
            _ => return Err(FormulaError::UnknownToken(id)),
        };
        Ok(ptg)
    }

    /// Read `cce` bytes of tokens followed by their trailing data.
    pub fn read_tokens(cursor: &mut ByteCursor<'_>, cce: usize) -> FormulaResult<Vec<Ptg>> {
        let start = cursor.position();
        let mut tokens = Vec::new();
        while cursor.position() - start < cce {
            tokens.push(Ptg::read(cursor)?);
        }
        let consumed = cursor.position() - start;
        if consumed != cce {
            return Err(FormulaError::InvalidTokens(format!(
                "last token ends at byte {consumed}, formula size is {cce}"
            )));
        }
        for token in tokens.iter_mut() {
            match token {
                Ptg::Array { value, .. } => *value = ArrayConstant::read(cursor)?,
                Ptg::MemArea { ranges, .. } => {
                    let count = cursor.read_u16()?;
                    for _ in 0..count {
                        ranges.push(RangeAddress::read_ref8(cursor)?);
                    }
                },
                _ => {},
            }
        }
        Ok(tokens)
    }

    /// Decode a complete `cce`-prefixed formula from `data`.
    pub fn decode(data: &[u8]) -> FormulaResult<Vec<Ptg>> {
        let mut cursor = ByteCursor::new(data);
        let cce = cursor.read_u16()? as usize;
        Self::read_tokens(&mut cursor, cce)
    }

    /// Bytes this token occupies inside `rgce`.
    pub fn encoded_size(&self) -> usize {
        match self {
            Ptg::Exp { .. } | Ptg::Tbl { .. } => 5,
            Ptg::Add
            | Ptg::Sub
            | Ptg::Mul
            | Ptg::Div
            | Ptg::Power
            | Ptg::Concat
            | Ptg::Lt
            | Ptg::Le
            | Ptg::Eq
            | Ptg::Ge
            | Ptg::Gt
            | Ptg::Ne
            | Ptg::Intersection
            | Ptg::Union
            | Ptg::Range
            | Ptg::UnaryPlus
            | Ptg::UnaryMinus
            | Ptg::Percent
            | Ptg::Paren
            | Ptg::MissingArg => 1,
            Ptg::Str(s) => 3 + strings::chars_size(s),
            Ptg::Attr(attr) => {
                if attr.is_choose() {
                    4 + 2 * (attr.jump_table.len() + 1)
                } else {
                    4
                }
            },
            Ptg::Err(_) | Ptg::Bool(_) => 2,
            Ptg::Int(_) => 3,
            Ptg::Num(_) => 9,
            Ptg::Array { .. } => 8,
            Ptg::Func { .. } => 3,
            Ptg::FuncVar { .. } => 4,
            Ptg::Name { .. } => 5,
            Ptg::Ref { .. } | Ptg::RefN { .. } | Ptg::RefErr { .. } => 5,
            Ptg::Area { .. } | Ptg::AreaN { .. } | Ptg::AreaErr { .. } => 9,
            Ptg::MemArea { .. } | Ptg::MemErr { .. } | Ptg::MemNoMem { .. } => 7,
            Ptg::MemFunc { .. } => 3,
            Ptg::NameX { .. } | Ptg::Ref3d { .. } | Ptg::RefErr3d { .. } => 7,
            Ptg::Area3d { .. } | Ptg::AreaErr3d { .. } => 11,
        }
    }

    /// Size of `rgce` for `tokens`, the `cce` field.
    pub fn tokens_size(tokens: &[Ptg]) -> usize {
        tokens.iter().map(Ptg::encoded_size).sum()
    }

    /// Append this token to `rgce`.
    pub fn write(&self, out: &mut Vec<u8>) {
        match self {
            Ptg::Exp { row, col } | Ptg::Tbl { row, col } => {
                out.put_u8(if matches!(self, Ptg::Exp { .. }) { 0x01 } else { 0x02 });
                out.put_u16_le(*row);
                out.put_u16_le(*col);
            },
            Ptg::Add => out.put_u8(0x03),
            Ptg::Sub => out.put_u8(0x04),
            Ptg::Mul => out.put_u8(0x05),
            Ptg::Div => out.put_u8(0x06),
            Ptg::Power => out.put_u8(0x07),
            Ptg::Concat => out.put_u8(0x08),
            Ptg::Lt => out.put_u8(0x09),
            Ptg::Le => out.put_u8(0x0A),
            Ptg::Eq => out.put_u8(0x0B),
            Ptg::Ge => out.put_u8(0x0C),
            Ptg::Gt => out.put_u8(0x0D),
            Ptg::Ne => out.put_u8(0x0E),
            Ptg::Intersection => out.put_u8(0x0F),
            Ptg::Union => out.put_u8(0x10),
            Ptg::Range => out.put_u8(0x11),
            Ptg::UnaryPlus => out.put_u8(0x12),
            Ptg::UnaryMinus => out.put_u8(0x13),
            Ptg::Percent => out.put_u8(0x14),
            Ptg::Paren => out.put_u8(0x15),
            Ptg::MissingArg => out.put_u8(0x16),
            Ptg::Str(s) => {
                out.put_u8(0x17);
                strings::write_short_unicode_string(out, s);
            },
            Ptg::Attr(attr) => {
                out.put_u8(0x19);
                out.put_u8(attr.flags.bits());
                out.put_u16_le(attr.data);
                if attr.is_choose() {
                    for offset in &attr.jump_table {
                        out.put_u16_le(*offset);
                    }
                    out.put_u16_le(attr.choose_offset);
                }
            },
            Ptg::Err(e) => {
                out.put_u8(0x1C);
                out.put_u8(e.code());
            },
            Ptg::Bool(b) => {
                out.put_u8(0x1D);
                out.put_u8(*b as u8);
            },
            Ptg::Int(n) => {
                out.put_u8(0x1E);
                out.put_u16_le(*n);
            },
            Ptg::Num(n) => {
                out.put_u8(0x1F);
                out.put_f64_le(*n);
            },
            Ptg::Array { class, .. } => {
                out.put_u8(0x20 | class.bits());
                out.put_bytes(0, 7);
            },
            Ptg::Func { class, index } => {
                out.put_u8(0x01 | class.bits());
                out.put_u16_le(*index);
            },
            Ptg::FuncVar {
                class,
                index,
                argc,
                prompt,
                command,
            } => {
                out.put_u8(0x02 | class.bits());
                out.put_u8(argc & 0x7F | if *prompt { 0x80 } else { 0 });
                out.put_u16_le(index & 0x7FFF | if *command { 0x8000 } else { 0 });
            },
            Ptg::Name { class, index } => {
                out.put_u8(0x03 | class.bits());
                out.put_u16_le(*index);
                out.put_u16_le(0);
            },
            Ptg::Ref { class, cell } => {
                out.put_u8(0x04 | class.bits());
                cell.write(out);
            },
            Ptg::Area { class, area } => {
                out.put_u8(0x05 | class.bits());
                area.write(out);
            },
            Ptg::MemArea { class, size, .. } => {
                out.put_u8(0x06 | class.bits());
                out.put_u32_le(0);
                out.put_u16_le(*size);
            },
            Ptg::MemErr { class, size } => {
                out.put_u8(0x07 | class.bits());
                out.put_u32_le(0);
                out.put_u16_le(*size);
            },
            Ptg::MemNoMem { class, size } => {
                out.put_u8(0x08 | class.bits());
                out.put_u32_le(0);
                out.put_u16_le(*size);
            },
            Ptg::MemFunc { class, size } => {
                out.put_u8(0x09 | class.bits());
                out.put_u16_le(*size);
            },
            Ptg::RefErr { class } => {
                out.put_u8(0x0A | class.bits());
                out.put_u32_le(0);
            },
            Ptg::AreaErr { class } => {
                out.put_u8(0x0B | class.bits());
                out.put_u64_le(0);
            },
            Ptg::RefN { class, cell } => {
                out.put_u8(0x0C | class.bits());
                cell.write(out);
            },
            Ptg::AreaN { class, area } => {
                out.put_u8(0x0D | class.bits());
                area.write(out);
            },
            Ptg::NameX {
                class,
                extern_index,
                name_index,
            } => {
                out.put_u8(0x19 | class.bits());
                out.put_u16_le(*extern_index);
                out.put_u16_le(*name_index);
                out.put_u16_le(0);
            },
            Ptg::Ref3d {
                class,
                extern_index,
                cell,
            } => {
                out.put_u8(0x1A | class.bits());
                out.put_u16_le(*extern_index);
                cell.write(out);
            },
            Ptg::Area3d {
                class,
                extern_index,
                area,
            } => {
                out.put_u8(0x1B | class.bits());
                out.put_u16_le(*extern_index);
                area.write(out);
            },
            Ptg::RefErr3d {
                class,
                extern_index,
            } => {
                out.put_u8(0x1C | class.bits());
                out.put_u16_le(*extern_index);
                out.put_u32_le(0);
            },
            Ptg::AreaErr3d {
                class,
                extern_index,
            } => {
                out.put_u8(0x1D | class.bits());
                out.put_u16_le(*extern_index);
                out.put_u64_le(0);
            },
        }
    }

    /// Write `rgce` followed by the trailing data; returns `cce`.
    pub fn write_tokens(tokens: &[Ptg], out: &mut Vec<u8>) -> usize {
        let start = out.len();
        for token in tokens {
            token.write(out);
        }
        let cce = out.len() - start;
        for token in tokens {
            match token {
                Ptg::Array { value, .. } => value.write(out),
                Ptg::MemArea { ranges, .. } => {
                    out.put_u16_le(ranges.len() as u16);
                    for range in ranges {
                        range.write_ref8(out);
                    }
                },
                _ => {},
            }
        }
        cce
    }

    /// `u16 cce | rgce | extra`, the layout of NAME-less formula fields.
    pub fn encode(tokens: &[Ptg]) -> Vec<u8> {
        let mut body = Vec::new();
        let cce = Ptg::write_tokens(tokens, &mut body);
        let mut out = Vec::with_capacity(body.len() + 2);
        out.put_u16_le(cce as u16);
        out.extend_from_slice(&body);
        out
    }

    /// Operand class, for tokens that carry one.
    pub fn class(&self) -> Option<OperandClass> {
        match self {
            Ptg::Array { class, .. }
            | Ptg::Func { class, .. }
            | Ptg::FuncVar { class, .. }
            | Ptg::Name { class, .. }
            | Ptg::Ref { class, .. }
            | Ptg::Area { class, .. }
            | Ptg::MemArea { class, .. }
            | Ptg::MemErr { class, .. }
            | Ptg::MemNoMem { class, .. }
            | Ptg::MemFunc { class, .. }
            | Ptg::RefErr { class }
            | Ptg::AreaErr { class }
            | Ptg::RefN { class, .. }
            | Ptg::AreaN { class, .. }
            | Ptg::NameX { class, .. }
            | Ptg::Ref3d { class, .. }
            | Ptg::Area3d { class, .. }
            | Ptg::RefErr3d { class, .. }
            | Ptg::AreaErr3d { class, .. } => Some(*class),
            _ => None,
        }
    }

    /// Whether the token array is a shared or array formula pointer.
    pub fn is_exp(tokens: &[Ptg]) -> Option<(u16, u16)> {
        match tokens.first() {
            Some(Ptg::Exp { row, col }) if tokens.len() == 1 => Some((*row, *col)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(tokens: &[Ptg]) -> Vec<Ptg> {
        let encoded = Ptg::encode(tokens);
        assert_eq!(
            u16::from_le_bytes([encoded[0], encoded[1]]) as usize,
            Ptg::tokens_size(tokens)
        );
        Ptg::decode(&encoded).unwrap()
    }

    #[test]
    fn test_operator_and_literal_tokens() {
        let tokens = vec![
            Ptg::Int(2),
            Ptg::Num(0.5),
            Ptg::Mul,
            Ptg::Str("x\u{3A3}".to_string()),
            Ptg::Concat,
            Ptg::Bool(true),
            Ptg::Err(ErrorCode::Div0),
            Ptg::Paren,
        ];
        assert_eq!(round_trip(&tokens), tokens);
    }

    #[test]
    fn test_reference_tokens_keep_class_and_flags() {
        let tokens = vec![
            Ptg::Ref {
                class: OperandClass::Value,
                cell: CellRef::new(4, 2, false, true),
            },
            Ptg::Area3d {
                class: OperandClass::Reference,
                extern_index: 1,
                area: AreaRef::new(CellRef::relative(0, 0), CellRef::new(9, 3, false, false)),
            },
            Ptg::FuncVar {
                class: OperandClass::Value,
                index: FUNCTION_INDEX_SUM,
                argc: 2,
                prompt: false,
                command: false,
            },
        ];
        let encoded = Ptg::encode(&tokens);
        // tRefV, then tArea3dR
        assert_eq!(encoded[2], 0x44);
        assert_eq!(encoded[7], 0x3B);
        assert_eq!(round_trip(&tokens), tokens);
    }

    #[test]
    fn test_array_constant_data_follows_rgce() {
        let array = ArrayConstant {
            rows: 2,
            cols: 2,
            values: vec![
                ArrayValue::Number(1.0),
                ArrayValue::String("a".to_string()),
                ArrayValue::Bool(true),
                ArrayValue::Error(ErrorCode::NA),
            ],
        };
        let tokens = vec![Ptg::Array {
            class: OperandClass::Array,
            value: array.clone(),
        }];
        let encoded = Ptg::encode(&tokens);
        assert_eq!(u16::from_le_bytes([encoded[0], encoded[1]]), 8);
        assert_eq!(round_trip(&tokens), tokens);
        assert_eq!(array.format(), "{1,\"a\";TRUE,#N/A}");
    }

    #[test]
    fn test_attr_choose_jump_table() {
        let mut attr = AttrPtg::new(AttrFlags::CHOOSE, 2);
        attr.jump_table.extend([6, 10]);
        attr.choose_offset = 14;
        let tokens = vec![Ptg::Attr(attr)];
        assert_eq!(Ptg::tokens_size(&tokens), 10);
        assert_eq!(round_trip(&tokens), tokens);
    }

    #[test]
    fn test_bad_tokens() {
        assert_eq!(Ptg::decode(&[1, 0, 0x18]), Err(FormulaError::UnknownToken(0x18)));
        // tInt claims 3 bytes but cce says 2.
        assert!(matches!(
            Ptg::decode(&[2, 0, 0x1E, 1, 0]),
            Err(FormulaError::InvalidTokens(_))
        ));
        assert!(matches!(
            Ptg::decode(&[3, 0, 0x1E, 1]),
            Err(FormulaError::Binary(_))
        ));
    }
}
