//! hssf-core - legacy binary spreadsheets and their formulas
//!
//! This library reads and writes the binary formats behind Excel 97-2003
//! `.xls` files and evaluates the formulas they contain.
//!
//! # Features
//!
//! - **OLE2 container**: Load and save compound files as a tree of storages
//!   and streams, with MiniFAT and DIFAT support
//! - **Property sets**: Decode and encode HPSF `TypedPropertyValue`s,
//!   sections and the summary information streams
//! - **BIFF8 records**: Rebuild per-sheet cell structure from the `Workbook`
//!   stream, including shared formulas and blank runs
//! - **Formula tokens**: Parse, render and shift Ptg token arrays
//! - **Evaluation**: Evaluate formulas with spreadsheet-compatible number
//!   semantics and an explicit result cache
//!
//! # Example - Reading a workbook
//!
//! ```no_run
//! use hssf_core::ole::CompoundFile;
//! use hssf_core::ole::xls::InternalWorkbook;
//! use hssf_core::common::ReadOptions;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("budget.xls")?;
//! let cf = CompoundFile::open(&bytes)?;
//! let workbook = InternalWorkbook::from_compound_file(&cf, &ReadOptions::new())?;
//!
//! for sheet in workbook.sheets() {
//!     println!("{}: {} rows", sheet.name(), sheet.values().row_count());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Evaluating a formula
//!
//! ```
//! use hssf_core::ole::xls::InternalWorkbook;
//! use hssf_core::sheet::eval::{ValueEval, WorkbookEvaluator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut workbook = InternalWorkbook::new();
//! let sheet = workbook.add_sheet("Sheet1")?;
//! workbook.set_number(sheet, 0, 0, 0.1)?;
//! workbook.set_number(sheet, 0, 1, 0.2)?;
//! workbook.set_formula(sheet, 0, 2, "A1+B1")?;
//!
//! let evaluator = WorkbookEvaluator::new();
//! assert_eq!(evaluator.evaluate(&workbook, sheet, 0, 2), ValueEval::Number(0.3));
//! # Ok(())
//! # }
//! ```

pub mod common;

#[cfg(feature = "ole")]
pub mod ole;

#[cfg(feature = "eval_engine")]
pub mod sheet;

pub use common::{DecodeOptions, Error, ReadOptions, Result};
