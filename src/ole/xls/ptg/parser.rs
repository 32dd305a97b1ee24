//! Formula text to RPN tokens.
//!
//! Recursive descent over the usual spreadsheet precedence levels, lowest
//! first:
//!
//! ```text
//! comparison  =  <>  <  <=  >  >=
//! concat      &
//! additive    +  -
//! term        *  /
//! power       ^
//! percent     postfix %
//! unary       prefix +  -
//! intersect   space between two references
//! primary     literal, reference, name, function call, ( ... )
//! ```
//!
//! Inside parentheses a comma builds a union; inside a function call it
//! separates arguments.

use super::function::{self, FunctionMetadata};
use super::{
    AreaRef, ArrayConstant, ArrayValue, CellRef, FormulaError, FormulaResult, MAX_ROW,
    OperandClass, Ptg, letters_to_column, parse_cell_ref,
};
use crate::ole::xls::ErrorCode;

/// Workbook context needed to turn names into indexes.
pub trait ParsingWorkbook {
    fn sheet_index(&self, name: &str) -> Option<usize>;

    /// EXTERNSHEET entry covering sheets `first..=last`.
    fn extern_sheet_index(&self, first_sheet: usize, last_sheet: usize) -> Option<u16>;

    /// 1-based index of the defined name visible from `sheet`.
    fn name_index(&self, name: &str, sheet: usize) -> Option<u16>;
}

/// Parse `formula` (with or without a leading `=`) entered on `sheet`.
pub fn parse_formula(formula: &str, workbook: &dyn ParsingWorkbook, sheet: usize) -> FormulaResult<Vec<Ptg>> {
    FormulaParser::new(formula, workbook, sheet).parse()
}

pub struct FormulaParser<'a> {
    chars: Vec<char>,
    pos: usize,
    workbook: &'a dyn ParsingWorkbook,
    sheet: usize,
    tokens: Vec<Ptg>,
}

impl<'a> FormulaParser<'a> {
    pub fn new(formula: &str, workbook: &'a dyn ParsingWorkbook, sheet: usize) -> Self {
        let text = formula.trim();
        let text = text.strip_prefix('=').unwrap_or(text);
        Self {
            chars: text.chars().collect(),
            pos: 0,
            workbook,
            sheet,
            tokens: Vec::new(),
        }
    }

    pub fn parse(mut self) -> FormulaResult<Vec<Ptg>> {
        self.skip_ws();
        if self.at_end() {
            return Err(self.error("formula is empty"));
        }
        self.comparison()?;
        self.skip_ws();
        if !self.at_end() {
            return Err(self.error(format!("unexpected '{}'", self.chars[self.pos])));
        }
        Ok(self.tokens)
    }

    fn error(&self, message: impl Into<String>) -> FormulaError {
        FormulaError::Parse {
            position: self.pos,
            message: message.into(),
        }
    }

    #[inline]
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn comparison(&mut self) -> FormulaResult<()> {
        self.concat()?;
        loop {
            self.skip_ws();
            let (token, width) = match (self.peek(), self.peek_at(1)) {
                (Some('<'), Some('=')) => (Ptg::Le, 2),
                (Some('<'), Some('>')) => (Ptg::Ne, 2),
                (Some('>'), Some('=')) => (Ptg::Ge, 2),
                (Some('<'), _) => (Ptg::Lt, 1),
                (Some('>'), _) => (Ptg::Gt, 1),
                (Some('='), _) => (Ptg::Eq, 1),
                _ => return Ok(()),
            };
            self.pos += width;
            self.concat()?;
            self.tokens.push(token);
        }
    }

    fn concat(&mut self) -> FormulaResult<()> {
        self.additive()?;
        loop {
            self.skip_ws();
            if self.peek() != Some('&') {
                return Ok(());
            }
            self.pos += 1;
            self.additive()?;
            self.tokens.push(Ptg::Concat);
        }
    }

    fn additive(&mut self) -> FormulaResult<()> {
        self.term()?;
        loop {
            self.skip_ws();
            let token = match self.peek() {
                Some('+') => Ptg::Add,
                Some('-') => Ptg::Sub,
                _ => return Ok(()),
            };
            self.pos += 1;
            self.term()?;
            self.tokens.push(token);
        }
    }

    fn term(&mut self) -> FormulaResult<()> {
        self.power()?;
        loop {
            self.skip_ws();
            let token = match self.peek() {
                Some('*') => Ptg::Mul,
                Some('/') => Ptg::Div,
                _ => return Ok(()),
            };
            self.pos += 1;
            self.power()?;
            self.tokens.push(token);
        }
    }

    fn power(&mut self) -> FormulaResult<()> {
        self.percent()?;
        loop {
            self.skip_ws();
            if self.peek() != Some('^') {
                return Ok(());
            }
            self.pos += 1;
            self.percent()?;
            self.tokens.push(Ptg::Power);
        }
    }

    fn percent(&mut self) -> FormulaResult<()> {
        self.unary()?;
        loop {
            self.skip_ws();
            if self.peek() != Some('%') {
                return Ok(());
            }
            self.pos += 1;
            self.tokens.push(Ptg::Percent);
        }
    }

    fn unary(&mut self) -> FormulaResult<()> {
        self.skip_ws();
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                self.unary()?;
                self.tokens.push(Ptg::UnaryMinus);
                Ok(())
            },
            Some('+') => {
                self.pos += 1;
                self.unary()?;
                self.tokens.push(Ptg::UnaryPlus);
                Ok(())
            },
            _ => self.intersection(),
        }
    }

    fn intersection(&mut self) -> FormulaResult<()> {
        self.primary()?;
        loop {
            let save = self.pos;
            if !self.skip_ws() {
                return Ok(());
            }
            let starts_reference = self
                .peek()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '$' || c == '\'' || c == '(');
            if !starts_reference {
                self.pos = save;
                return Ok(());
            }
            self.primary()?;
            self.tokens.push(Ptg::Intersection);
        }
    }

    fn primary(&mut self) -> FormulaResult<()> {
        self.skip_ws();
        let Some(c) = self.peek() else {
            return Err(self.error("unexpected end of formula"));
        };
        match c {
            '0'..='9' | '.' => self.number(),
            '"' => {
                let text = self.string_literal()?;
                self.tokens.push(Ptg::Str(text));
                Ok(())
            },
            '#' => {
                let code = self.error_literal()?;
                self.tokens.push(Ptg::Err(code));
                Ok(())
            },
            '(' => self.parenthesized(),
            '{' => {
                let value = self.array_constant()?;
                self.tokens.push(Ptg::Array {
                    class: OperandClass::Array,
                    value,
                });
                Ok(())
            },
            '\'' => {
                let sheet = self.quoted_sheet_name()?;
                self.sheet_reference(sheet)
            },
            c if c.is_alphabetic() || c == '_' || c == '$' || c == '\\' => self.identifier_operand(),
            other => Err(self.error(format!("unexpected '{other}'"))),
        }
    }

    fn number(&mut self) -> FormulaResult<()> {
        let start = self.pos;
        let rest: String = self.chars[start..].iter().collect();
        let (value, consumed) = fast_float2::parse_partial::<f64, _>(&rest)
            .map_err(|_| self.error("invalid number"))?;
        let literal = rest[..consumed].to_string();
        self.pos += consumed;

        let is_integer = literal.bytes().all(|b| b.is_ascii_digit());
        if is_integer && self.peek() == Some(':') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            return self.row_area(literal);
        }
        if is_integer && value <= u16::MAX as f64 {
            self.tokens.push(Ptg::Int(value as u16));
        } else {
            self.tokens.push(Ptg::Num(value));
        }
        Ok(())
    }

    fn row_area(&mut self, first: String) -> FormulaResult<()> {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let last: String = self.chars[start..self.pos].iter().collect();
        let parse_row = |text: &str| -> Option<u16> {
            let row: u32 = text.parse().ok()?;
            (1..=MAX_ROW as u32 + 1).contains(&row).then(|| (row - 1) as u16)
        };
        let (Some(first), Some(last)) = (parse_row(&first), parse_row(&last)) else {
            return Err(self.error("row out of range"));
        };
        let area = AreaRef::new(
            CellRef::new(first.min(last), 0, true, false),
            CellRef::new(first.max(last), super::MAX_COL, true, false),
        );
        self.tokens.push(Ptg::Area {
            class: OperandClass::Value,
            area,
        });
        Ok(())
    }

    fn string_literal(&mut self) -> FormulaResult<String> {
        self.pos += 1;
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('"') if self.peek_at(1) == Some('"') => {
                    text.push('"');
                    self.pos += 2;
                },
                Some('"') => {
                    self.pos += 1;
                    return Ok(text);
                },
                Some(c) => {
                    text.push(c);
                    self.pos += 1;
                },
            }
        }
    }

    fn error_literal(&mut self) -> FormulaResult<ErrorCode> {
        for code in ErrorCode::ALL {
            let text = code.text();
            let len = text.chars().count();
            if self.pos + len > self.chars.len() {
                continue;
            }
            let candidate: String = self.chars[self.pos..self.pos + len].iter().collect();
            if candidate.eq_ignore_ascii_case(text) {
                self.pos += len;
                return Ok(code);
            }
        }
        Err(self.error("unknown error literal"))
    }

    fn parenthesized(&mut self) -> FormulaResult<()> {
        self.pos += 1;
        self.comparison()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    self.comparison()?;
                    self.tokens.push(Ptg::Union);
                },
                Some(')') => {
                    self.pos += 1;
                    self.tokens.push(Ptg::Paren);
                    return Ok(());
                },
                _ => return Err(self.error("expected ')'")),
            }
        }
    }

    fn array_constant(&mut self) -> FormulaResult<ArrayConstant> {
        self.pos += 1;
        let mut rows: Vec<Vec<ArrayValue>> = vec![Vec::new()];
        loop {
            self.skip_ws();
            let value = self.array_value()?;
            if let Some(row) = rows.last_mut() {
                row.push(value);
            }
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(';') => {
                    self.pos += 1;
                    rows.push(Vec::new());
                },
                Some('}') => {
                    self.pos += 1;
                    break;
                },
                _ => return Err(self.error("expected ',', ';' or '}' in array constant")),
            }
        }
        let cols = rows[0].len();
        if rows.iter().any(|row| row.len() != cols) {
            return Err(self.error("array constant rows differ in length"));
        }
        if cols > 256 || rows.len() > u16::MAX as usize {
            return Err(self.error("array constant too large"));
        }
        Ok(ArrayConstant {
            rows: rows.len() as u16,
            cols: cols as u16,
            values: rows.into_iter().flatten().collect(),
        })
    }

    fn array_value(&mut self) -> FormulaResult<ArrayValue> {
        match self.peek() {
            Some('"') => Ok(ArrayValue::String(self.string_literal()?)),
            Some('#') => Ok(ArrayValue::Error(self.error_literal()?)),
            Some(c) if c == '-' || c == '.' || c.is_ascii_digit() => {
                let rest: String = self.chars[self.pos..].iter().collect();
                let (value, consumed) = fast_float2::parse_partial::<f64, _>(&rest)
                    .map_err(|_| self.error("invalid number in array constant"))?;
                self.pos += rest[..consumed].chars().count();
                Ok(ArrayValue::Number(value))
            },
            Some(c) if c.is_ascii_alphabetic() => {
                let word = self.identifier();
                match word.to_ascii_uppercase().as_str() {
                    "TRUE" => Ok(ArrayValue::Bool(true)),
                    "FALSE" => Ok(ArrayValue::Bool(false)),
                    _ => Err(self.error(format!("'{word}' is not allowed in an array constant"))),
                }
            },
            _ => Err(self.error("expected array constant value")),
        }
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '$' | '\\'))
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn quoted_sheet_name(&mut self) -> FormulaResult<String> {
        self.pos += 1;
        let mut name = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated sheet name")),
                Some('\'') if self.peek_at(1) == Some('\'') => {
                    name.push('\'');
                    self.pos += 2;
                },
                Some('\'') => {
                    self.pos += 1;
                    break;
                },
                Some(c) => {
                    name.push(c);
                    self.pos += 1;
                },
            }
        }
        if self.peek() != Some('!') {
            return Err(self.error("expected '!' after sheet name"));
        }
        self.pos += 1;
        Ok(name)
    }

    /// Position of a `!` terminating a `Sheet1:Sheet3` span at the cursor.
    fn sheet_span_end(&self) -> Option<usize> {
        let mut i = self.pos;
        while let Some(&c) = self.chars.get(i) {
            if c == '!' {
                return Some(i);
            }
            if !(c.is_alphanumeric() || matches!(c, '_' | '.' | ':')) {
                return None;
            }
            i += 1;
        }
        None
    }

    fn identifier_operand(&mut self) -> FormulaResult<()> {
        let start = self.pos;
        let word = self.identifier();
        if word.is_empty() {
            return Err(self.error("expected identifier"));
        }
        match self.peek() {
            Some('(') => return self.function_call(&word),
            Some('!') => {
                self.pos += 1;
                return self.sheet_reference(word);
            },
            Some(':') => {
                // `Sheet1:Sheet3!A1`
                let save = self.pos;
                self.pos += 1;
                if let Some(end) = self.sheet_span_end()
                    && !self.chars[self.pos..end].contains(&':')
                {
                    let last: String = self.chars[self.pos..end].iter().collect();
                    self.pos = end + 1;
                    return self.sheet_span_reference(&word, &last);
                }
                self.pos = save;
            },
            _ => {},
        }

        if let Some(area) = self.area_after(&word)? {
            self.tokens.push(Ptg::Area {
                class: OperandClass::Value,
                area,
            });
            return Ok(());
        }
        if let Some(cell) = parse_cell_ref(&word) {
            self.tokens.push(Ptg::Ref {
                class: OperandClass::Value,
                cell,
            });
            return Ok(());
        }
        match word.to_ascii_uppercase().as_str() {
            "TRUE" => {
                self.tokens.push(Ptg::Bool(true));
                return Ok(());
            },
            "FALSE" => {
                self.tokens.push(Ptg::Bool(false));
                return Ok(());
            },
            _ => {},
        }
        match self.workbook.name_index(&word, self.sheet) {
            Some(index) => {
                self.tokens.push(Ptg::Name {
                    class: OperandClass::Value,
                    index,
                });
                Ok(())
            },
            None => {
                self.pos = start;
                Err(self.error(format!("unknown name '{word}'")))
            },
        }
    }

    /// `first` followed by `:second` forming `A1:B2` or `A:B`.
    fn area_after(&mut self, first: &str) -> FormulaResult<Option<AreaRef>> {
        if self.peek() != Some(':') {
            return Ok(None);
        }
        let save = self.pos;
        self.pos += 1;
        let second = self.identifier();
        if let (Some(a), Some(b)) = (parse_cell_ref(first), parse_cell_ref(&second)) {
            return Ok(Some(AreaRef::new(a, b)));
        }
        if let (Some(a), Some(b)) = (column_ref(first), column_ref(&second)) {
            return Ok(Some(AreaRef::new(
                CellRef::new(0, a.0, false, a.1),
                CellRef::new(MAX_ROW, b.0, false, b.1),
            )));
        }
        self.pos = save;
        if parse_cell_ref(first).is_some() || column_ref(first).is_some() {
            return Err(self.error("invalid area reference"));
        }
        Ok(None)
    }

    fn sheet_reference(&mut self, sheet: String) -> FormulaResult<()> {
        if let Some(index) = self.workbook.sheet_index(&sheet) {
            return self.extern_reference(index, index, &sheet);
        }
        match sheet.split_once(':') {
            Some((first, last)) => self.sheet_span_reference(first, last),
            None => Err(FormulaError::UnknownSheet(sheet)),
        }
    }

    fn sheet_span_reference(&mut self, first: &str, last: &str) -> FormulaResult<()> {
        let first_index = self
            .workbook
            .sheet_index(first)
            .ok_or_else(|| FormulaError::UnknownSheet(first.to_string()))?;
        let last_index = self
            .workbook
            .sheet_index(last)
            .ok_or_else(|| FormulaError::UnknownSheet(last.to_string()))?;
        self.extern_reference(first_index, last_index, first)
    }

    fn extern_reference(&mut self, first: usize, last: usize, sheet: &str) -> FormulaResult<()> {
        let extern_index = self
            .workbook
            .extern_sheet_index(first.min(last), first.max(last))
            .ok_or_else(|| FormulaError::UnknownSheet(sheet.to_string()))?;
        let word = self.identifier();
        if let Some(area) = self.area_after(&word)? {
            self.tokens.push(Ptg::Area3d {
                class: OperandClass::Value,
                extern_index,
                area,
            });
            return Ok(());
        }
        let cell = parse_cell_ref(&word).ok_or_else(|| self.error("expected cell reference after '!'"))?;
        self.tokens.push(Ptg::Ref3d {
            class: OperandClass::Value,
            extern_index,
            cell,
        });
        Ok(())
    }

    fn function_call(&mut self, name: &str) -> FormulaResult<()> {
        let meta: &FunctionMetadata =
            function::by_name(name).ok_or_else(|| FormulaError::UnknownFunctionName(name.to_string()))?;
        self.pos += 1;
        let mut argc = 0usize;
        self.skip_ws();
        if self.peek() == Some(')') {
            self.pos += 1;
        } else {
            loop {
                self.skip_ws();
                if matches!(self.peek(), Some(',') | Some(')')) {
                    self.tokens.push(Ptg::MissingArg);
                } else {
                    let arg_start = self.tokens.len();
                    self.comparison()?;
                    self.mark_reference_argument(arg_start);
                }
                argc += 1;
                self.skip_ws();
                match self.peek() {
                    Some(',') => self.pos += 1,
                    Some(')') => {
                        self.pos += 1;
                        break;
                    },
                    _ => return Err(self.error("expected ',' or ')' in argument list")),
                }
            }
        }
        if argc < meta.min_args as usize || argc > meta.max_args as usize {
            return Err(FormulaError::ArgumentCount {
                name: meta.name,
                min: meta.min_args,
                max: meta.max_args,
                given: argc,
            });
        }
        if meta.has_fixed_args() {
            self.tokens.push(Ptg::Func {
                class: OperandClass::Value,
                index: meta.index,
            });
        } else {
            self.tokens.push(Ptg::FuncVar {
                class: OperandClass::Value,
                index: meta.index,
                argc: argc as u8,
                prompt: false,
                command: false,
            });
        }
        Ok(())
    }

    /// A bare reference passed as an argument is a reference operand.
    fn mark_reference_argument(&mut self, arg_start: usize) {
        if self.tokens.len() != arg_start + 1 {
            return;
        }
        match &mut self.tokens[arg_start] {
            Ptg::Ref { class, .. }
            | Ptg::Area { class, .. }
            | Ptg::Ref3d { class, .. }
            | Ptg::Area3d { class, .. }
            | Ptg::Name { class, .. } => *class = OperandClass::Reference,
            _ => {},
        }
    }
}

/// `A` or `$A` as `(column, relative)`.
fn column_ref(text: &str) -> Option<(u16, bool)> {
    let (letters, relative) = match text.strip_prefix('$') {
        Some(rest) => (rest, false),
        None => (text, true),
    };
    let col = letters_to_column(letters)?;
    (col <= super::MAX_COL as u32).then_some((col as u16, relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Book;

    impl ParsingWorkbook for Book {
        fn sheet_index(&self, name: &str) -> Option<usize> {
            ["Sheet1", "Sheet2", "My Sheet"]
                .iter()
                .position(|s| s.eq_ignore_ascii_case(name))
        }

        fn extern_sheet_index(&self, first_sheet: usize, last_sheet: usize) -> Option<u16> {
            match (first_sheet, last_sheet) {
                (0, 0) => Some(0),
                (1, 1) => Some(1),
                (2, 2) => Some(2),
                (0, 1) => Some(3),
                _ => None,
            }
        }

        fn name_index(&self, name: &str, _sheet: usize) -> Option<u16> {
            name.eq_ignore_ascii_case("Rate").then_some(1)
        }
    }

    fn parse(text: &str) -> Vec<Ptg> {
        parse_formula(text, &Book, 0).unwrap()
    }

    fn value_ref(row: u16, col: u16) -> Ptg {
        Ptg::Ref {
            class: OperandClass::Value,
            cell: CellRef::relative(row, col),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("=A1+B1*2"),
            vec![value_ref(0, 0), value_ref(0, 1), Ptg::Int(2), Ptg::Mul, Ptg::Add]
        );
        assert_eq!(
            parse("1&2=3"),
            vec![Ptg::Int(1), Ptg::Int(2), Ptg::Concat, Ptg::Int(3), Ptg::Eq]
        );
        assert_eq!(
            parse("-2^2"),
            vec![Ptg::Int(2), Ptg::UnaryMinus, Ptg::Int(2), Ptg::Power]
        );
        assert_eq!(parse("(1+2)%"), vec![
            Ptg::Int(1),
            Ptg::Int(2),
            Ptg::Add,
            Ptg::Paren,
            Ptg::Percent
        ]);
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("0.5"), vec![Ptg::Num(0.5)]);
        assert_eq!(parse("-0.5"), vec![Ptg::Num(0.5), Ptg::UnaryMinus]);
        assert_eq!(parse("70000"), vec![Ptg::Num(70000.0)]);
        assert_eq!(parse("1E3"), vec![Ptg::Num(1000.0)]);
        assert_eq!(parse("\"a\"\"b\""), vec![Ptg::Str("a\"b".to_string())]);
        assert_eq!(parse("#div/0!"), vec![Ptg::Err(ErrorCode::Div0)]);
        assert_eq!(parse("true"), vec![Ptg::Bool(true)]);
    }

    #[test]
    fn test_functions() {
        assert_eq!(
            parse("SUM(A1:B2,3)"),
            vec![
                Ptg::Area {
                    class: OperandClass::Reference,
                    area: AreaRef::new(CellRef::relative(0, 0), CellRef::relative(1, 1)),
                },
                Ptg::Int(3),
                Ptg::FuncVar {
                    class: OperandClass::Value,
                    index: 4,
                    argc: 2,
                    prompt: false,
                    command: false,
                },
            ]
        );
        assert_eq!(
            parse("ROUND(1.25,1)"),
            vec![
                Ptg::Num(1.25),
                Ptg::Int(1),
                Ptg::Func {
                    class: OperandClass::Value,
                    index: 27,
                },
            ]
        );
        assert_eq!(
            &parse("IF(A1,,2)")[1..3],
            &[Ptg::MissingArg, Ptg::Int(2)]
        );
        assert_eq!(
            parse_formula("ROUND(1)", &Book, 0),
            Err(FormulaError::ArgumentCount {
                name: "ROUND",
                min: 2,
                max: 2,
                given: 1,
            })
        );
        assert_eq!(
            parse_formula("NOPE(1)", &Book, 0),
            Err(FormulaError::UnknownFunctionName("NOPE".to_string()))
        );
    }

    #[test]
    fn test_sheet_references() {
        assert_eq!(
            parse("'My Sheet'!$A$1"),
            vec![Ptg::Ref3d {
                class: OperandClass::Value,
                extern_index: 2,
                cell: CellRef::new(0, 0, false, false),
            }]
        );
        assert_eq!(
            parse("Sheet1:Sheet2!B2:C3"),
            vec![Ptg::Area3d {
                class: OperandClass::Value,
                extern_index: 3,
                area: AreaRef::new(CellRef::relative(1, 1), CellRef::relative(2, 2)),
            }]
        );
        assert_eq!(
            parse_formula("Missing!A1", &Book, 0),
            Err(FormulaError::UnknownSheet("Missing".to_string()))
        );
    }

    #[test]
    fn test_names_columns_and_intersection() {
        assert_eq!(
            parse("Rate*2"),
            vec![
                Ptg::Name {
                    class: OperandClass::Value,
                    index: 1
                },
                Ptg::Int(2),
                Ptg::Mul
            ]
        );
        let tokens = parse("A:B B2:C3");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2], Ptg::Intersection);
        match &tokens[0] {
            Ptg::Area { area, .. } => assert!(area.is_whole_column()),
            other => panic!("unexpected {other:?}"),
        }
        match parse("2:2").as_slice() {
            [Ptg::Area { area, .. }] => {
                assert!(area.is_whole_row());
                assert_eq!(area.first.row, 1);
            },
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            parse_formula("Unknown+1", &Book, 0),
            Err(FormulaError::Parse { position: 0, .. })
        ));
    }

    #[test]
    fn test_union_and_array_constant() {
        assert_eq!(
            parse("(A1,B1)"),
            vec![value_ref(0, 0), value_ref(0, 1), Ptg::Union, Ptg::Paren]
        );
        assert_eq!(
            parse("{1,2;\"x\",TRUE}"),
            vec![Ptg::Array {
                class: OperandClass::Array,
                value: ArrayConstant {
                    rows: 2,
                    cols: 2,
                    values: vec![
                        ArrayValue::Number(1.0),
                        ArrayValue::Number(2.0),
                        ArrayValue::String("x".to_string()),
                        ArrayValue::Bool(true),
                    ],
                },
            }]
        );
        assert!(parse_formula("{1,2;3}", &Book, 0).is_err());
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(matches!(
            parse_formula("1 2", &Book, 0),
            Err(FormulaError::Parse { .. })
        ));
        assert!(parse_formula("", &Book, 0).is_err());
    }
}
