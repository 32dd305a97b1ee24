//! Error types for BIFF8 workbook decoding and encoding

use thiserror::Error;

use crate::common::binary::BinaryError;
use crate::ole::filesystem::FilesystemError;
use crate::ole::xls::ptg::FormulaError;

/// Result type alias for XLS operations
pub type XlsResult<T> = Result<T, XlsError>;

/// Errors that can occur while reading or writing a workbook stream
#[derive(Error, Debug)]
pub enum XlsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Binary(#[from] BinaryError),

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// A record body that cannot be interpreted
    #[error("Invalid record 0x{record_type:04X}: {message}")]
    InvalidRecord { record_type: u16, message: String },

    #[error("Invalid length for record 0x{record_type:04X}: expected {expected}, found {found}")]
    InvalidLength {
        record_type: u16,
        expected: usize,
        found: usize,
    },

    #[error("Unsupported BIFF version: 0x{0:04X}")]
    UnsupportedBiffVersion(u16),

    #[error("Workbook is password protected")]
    PasswordProtected,

    #[error("Unexpected end of stream: {0}")]
    UnexpectedEndOfStream(String),

    #[error("Worksheet '{0}' not found")]
    WorksheetNotFound(String),

    #[error("Sheet index {0} is out of range")]
    SheetIndexOutOfRange(usize),

    #[error("A sheet named '{0}' already exists")]
    DuplicateSheetName(String),

    #[error("Cell address out of range: row {row}, column {col}")]
    InvalidCellAddress { row: u32, col: u32 },

    /// A formula flagged as shared whose anchor has no SHRFMLA in the same sheet
    #[error("Formula at {cell} is marked shared but no shared formula covers it")]
    MissingSharedFormula { cell: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl XlsError {
    pub(crate) fn invalid_record(record_type: u16, message: impl Into<String>) -> Self {
        XlsError::InvalidRecord {
            record_type,
            message: message.into(),
        }
    }
}
