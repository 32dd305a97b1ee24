//! Convert a token array back into formula text.

use super::function::{self, FUNCTION_INDEX_EXTERNAL};
use super::{FormulaError, FormulaResult, Ptg};
use crate::common::number_text::number_to_text;

/// The sheets a 3D reference points at, as seen through EXTERNSHEET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternSheet {
    /// External workbook name, `None` for the workbook itself
    pub workbook: Option<String>,
    pub first_sheet: String,
    pub last_sheet: String,
}

impl ExternSheet {
    pub fn single(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            workbook: None,
            first_sheet: name.clone(),
            last_sheet: name,
        }
    }

    /// `Sheet1!`, `'My Sheet'!` or `Sheet1:Sheet3!` prefix.
    pub fn prefix(&self) -> String {
        let book = self
            .workbook
            .as_ref()
            .map(|w| format!("[{w}]"))
            .unwrap_or_default();
        let sheets = if self.first_sheet == self.last_sheet {
            self.first_sheet.clone()
        } else {
            format!("{}:{}", self.first_sheet, self.last_sheet)
        };
        if book.is_empty() && !needs_quotes(&self.first_sheet) && !needs_quotes(&self.last_sheet) {
            return format!("{sheets}!");
        }
        format!("'{}{}'!", book, sheets.replace('\'', "''"))
    }
}

/// Workbook context needed to render tokens that only carry indexes.
pub trait FormulaRenderingWorkbook {
    fn sheet_name_by_extern_index(&self, extern_index: u16) -> Option<ExternSheet>;

    /// Text of the defined name with 1-based `index`.
    fn name_text(&self, index: u16) -> Option<String>;

    fn external_name_text(&self, _extern_index: u16, _name_index: u16) -> Option<String> {
        None
    }
}

fn needs_quotes(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return true;
    };
    if first.is_ascii_digit() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return true;
    }
    // Names that read as a cell reference must be quoted too.
    super::parse_cell_ref(name).is_some()
}

/// Sheet name as it appears before `!`, quoted when required.
pub fn format_sheet_name(name: &str) -> String {
    if needs_quotes(name) {
        format!("'{}'", name.replace('\'', "''"))
    } else {
        name.to_string()
    }
}

fn pop(stack: &mut Vec<String>) -> FormulaResult<String> {
    stack
        .pop()
        .ok_or_else(|| FormulaError::InvalidTokens("operand stack underflow".to_string()))
}

fn pop_args(stack: &mut Vec<String>, count: usize) -> FormulaResult<Vec<String>> {
    if stack.len() < count {
        return Err(FormulaError::InvalidTokens(format!(
            "function expects {count} operands, stack holds {}",
            stack.len()
        )));
    }
    Ok(stack.split_off(stack.len() - count))
}

fn binary(stack: &mut Vec<String>, op: &str) -> FormulaResult<()> {
    let right = pop(stack)?;
    let left = pop(stack)?;
    stack.push(format!("{left}{op}{right}"));
    Ok(())
}

fn render_call(stack: &mut Vec<String>, index: u16, argc: usize) -> FormulaResult<()> {
    let mut args = pop_args(stack, argc)?;
    let name = if index == FUNCTION_INDEX_EXTERNAL {
        if args.is_empty() {
            return Err(FormulaError::InvalidTokens(
                "external function call without a name operand".to_string(),
            ));
        }
        args.remove(0)
    } else {
        function::by_index(index)
            .ok_or(FormulaError::UnknownFunction(index))?
            .name
            .to_string()
    };
    stack.push(format!("{}({})", name, args.join(",")));
    Ok(())
}

fn extern_prefix(workbook: &dyn FormulaRenderingWorkbook, extern_index: u16) -> FormulaResult<String> {
    workbook
        .sheet_name_by_extern_index(extern_index)
        .map(|sheet| sheet.prefix())
        .ok_or(FormulaError::UnknownExternSheet(extern_index))
}

/// Render RPN `tokens` as infix formula text without the leading `=`.
pub fn render_formula(tokens: &[Ptg], workbook: &dyn FormulaRenderingWorkbook) -> FormulaResult<String> {
    let mut stack: Vec<String> = Vec::new();
    for token in tokens {
        match token {
            Ptg::Exp { row, col } => {
                return Err(FormulaError::UnresolvedSharedFormula(super::cell_name(
                    *row as u32,
                    *col as u32,
                )));
            },
            Ptg::Tbl { .. } => {
                return Err(FormulaError::InvalidTokens(
                    "data table formulas cannot be rendered".to_string(),
                ));
            },
            Ptg::Add => binary(&mut stack, "+")?,
            Ptg::Sub => binary(&mut stack, "-")?,
            Ptg::Mul => binary(&mut stack, "*")?,
            Ptg::Div => binary(&mut stack, "/")?,
            Ptg::Power => binary(&mut stack, "^")?,
            Ptg::Concat => binary(&mut stack, "&")?,
            Ptg::Lt => binary(&mut stack, "<")?,
            Ptg::Le => binary(&mut stack, "<=")?,
            Ptg::Eq => binary(&mut stack, "=")?,
            Ptg::Ge => binary(&mut stack, ">=")?,
            Ptg::Gt => binary(&mut stack, ">")?,
            Ptg::Ne => binary(&mut stack, "<>")?,
            Ptg::Intersection => binary(&mut stack, " ")?,
            Ptg::Union => binary(&mut stack, ",")?,
            Ptg::Range => binary(&mut stack, ":")?,
            Ptg::UnaryPlus => {
                let operand = pop(&mut stack)?;
                stack.push(format!("+{operand}"));
            },
            Ptg::UnaryMinus => {
                let operand = pop(&mut stack)?;
                stack.push(format!("-{operand}"));
            },
            Ptg::Percent => {
                let operand = pop(&mut stack)?;
                stack.push(format!("{operand}%"));
            },
            Ptg::Paren => {
                let operand = pop(&mut stack)?;
                stack.push(format!("({operand})"));
            },
            Ptg::MissingArg => stack.push(String::new()),
            Ptg::Str(s) => stack.push(format!("\"{}\"", s.replace('"', "\"\""))),
            Ptg::Attr(attr) => {
                if attr.is_sum() {
                    let operand = pop(&mut stack)?;
                    stack.push(format!("SUM({operand})"));
                }
            },
            Ptg::Err(e) => stack.push(e.text().to_string()),
            Ptg::Bool(b) => stack.push(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Ptg::Int(n) => stack.push(n.to_string()),
            Ptg::Num(n) => stack.push(number_to_text(*n)),
            Ptg::Array { value, .. } => stack.push(value.format()),
            Ptg::Func { index, .. } => {
                let argc = if *index == FUNCTION_INDEX_EXTERNAL {
                    1
                } else {
                    function::by_index(*index)
                        .ok_or(FormulaError::UnknownFunction(*index))?
                        .min_args as usize
                };
                render_call(&mut stack, *index, argc)?;
            },
            Ptg::FuncVar { index, argc, .. } => render_call(&mut stack, *index, *argc as usize)?,
            Ptg::Name { index, .. } => {
                let text = workbook
                    .name_text(*index)
                    .ok_or(FormulaError::UnknownName(*index))?;
                stack.push(text);
            },
            Ptg::NameX {
                extern_index,
                name_index,
                ..
            } => {
                let text = workbook
                    .external_name_text(*extern_index, *name_index)
                    .ok_or(FormulaError::UnknownName(*name_index))?;
                stack.push(text);
            },
            Ptg::Ref { cell, .. } => stack.push(cell.format()),
            Ptg::Area { area, .. } => stack.push(area.format()),
            Ptg::RefErr { .. } | Ptg::AreaErr { .. } => stack.push("#REF!".to_string()),
            Ptg::RefN { cell, .. } => {
                return Err(FormulaError::UnresolvedSharedFormula(cell.format()));
            },
            Ptg::AreaN { area, .. } => {
                return Err(FormulaError::UnresolvedSharedFormula(area.format()));
            },
            Ptg::Ref3d {
                extern_index, cell, ..
            } => {
                let prefix = extern_prefix(workbook, *extern_index)?;
                stack.push(format!("{}{}", prefix, cell.format()));
            },
            Ptg::Area3d {
                extern_index, area, ..
            } => {
                let prefix = extern_prefix(workbook, *extern_index)?;
                stack.push(format!("{}{}", prefix, area.format()));
            },
            Ptg::RefErr3d { extern_index, .. } | Ptg::AreaErr3d { extern_index, .. } => {
                let prefix = extern_prefix(workbook, *extern_index)?;
                stack.push(format!("{prefix}#REF!"));
            },
            Ptg::MemArea { .. } | Ptg::MemErr { .. } | Ptg::MemNoMem { .. } | Ptg::MemFunc { .. } => {},
        }
    }
    match stack.len() {
        0 => Ok(String::new()),
        1 => pop(&mut stack),
        n => Err(FormulaError::InvalidTokens(format!(
            "{n} operands left after rendering"
        ))),
    }
}
