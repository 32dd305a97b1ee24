//! Spreadsheet error values as stored in BOOLERR, FORMULA and PtgErr.

use std::fmt;

/// One of the error constants a cell or formula can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    /// `#NULL!`, empty intersection
    Null = 0x00,
    /// `#DIV/0!`
    Div0 = 0x07,
    /// `#VALUE!`
    Value = 0x0F,
    /// `#REF!`
    Ref = 0x17,
    /// `#NAME?`
    Name = 0x1D,
    /// `#NUM!`
    Num = 0x24,
    /// `#N/A`
    NA = 0x2A,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 7] = [
        ErrorCode::Null,
        ErrorCode::Div0,
        ErrorCode::Value,
        ErrorCode::Ref,
        ErrorCode::Name,
        ErrorCode::Num,
        ErrorCode::NA,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|e| *e as u8 == code)
    }

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn text(self) -> &'static str {
        match self {
            ErrorCode::Null => "#NULL!",
            ErrorCode::Div0 => "#DIV/0!",
            ErrorCode::Value => "#VALUE!",
            ErrorCode::Ref => "#REF!",
            ErrorCode::Name => "#NAME?",
            ErrorCode::Num => "#NUM!",
            ErrorCode::NA => "#N/A",
        }
    }

    /// Case-insensitive lookup of the literal as typed in a formula.
    pub fn from_text(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.text().eq_ignore_ascii_case(text))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_text() {
        assert_eq!(ErrorCode::from_code(0x07), Some(ErrorCode::Div0));
        assert_eq!(ErrorCode::from_code(0x08), None);
        assert_eq!(ErrorCode::from_text("#n/a"), Some(ErrorCode::NA));
        assert_eq!(ErrorCode::Ref.to_string(), "#REF!");
    }
}
