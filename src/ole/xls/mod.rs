//! Excel 97-2003 (.xls) workbooks
//!
//! This module reads and writes the BIFF8 record stream stored as the
//! `Workbook` document of an OLE2 compound file. Cells are kept per sheet
//! in a [`ValueRecordsAggregate`]; formulas are held as parsed [`ptg::Ptg`]
//! tokens, with shared formulas expanded for each cell on load.
//!
//! # Example
//!
//! ```
//! use hssf_core::common::ReadOptions;
//! use hssf_core::ole::xls::InternalWorkbook;
//!
//! let mut workbook = InternalWorkbook::new();
//! let sheet = workbook.add_sheet("Totals")?;
//! workbook.set_number(sheet, 0, 0, 3.0)?;
//! workbook.set_formula(sheet, 0, 1, "A1*2")?;
//!
//! let stream = workbook.to_stream();
//! let reloaded = InternalWorkbook::from_stream(&stream, &ReadOptions::new())?;
//! assert_eq!(reloaded.formula_text(sheet, 0, 1)?.as_deref(), Some("A1*2"));
//! # Ok::<(), hssf_core::ole::xls::XlsError>(())
//! ```

/// Error types for workbook decoding and encoding
mod error;

/// Spreadsheet error values (`#DIV/0!` and friends)
mod error_code;

/// BIFF8 string layouts
pub mod strings;

/// Record framing and structural records
pub mod records;

/// Cell value records
pub mod cell;

/// Shared string table
pub mod sst;

/// SUPBOOK, EXTERNSHEET and NAME records
pub mod link_table;

/// Cell and shared-formula aggregates
pub mod aggregates;

/// Formula tokens, parser and renderer
pub mod ptg;

/// Sheet substreams
mod sheet;

/// Workbook globals and sheet list
mod workbook;

pub use aggregates::{SharedValueManager, ValueRecordsAggregate};
pub use cell::{CachedValue, CellValue, FormulaCell, FormulaFlags, XlsCell};
pub use error::{XlsError, XlsResult};
pub use error_code::ErrorCode;
pub use link_table::{LinkTable, NameRecord};
pub use records::SheetVisibility;
pub use sheet::InternalSheet;
pub use sst::SharedStringTable;
pub use workbook::{InternalWorkbook, WORKBOOK_STREAM};
