//! Spreadsheet-level services built on the BIFF8 workbook model.

pub mod eval;
