//! Types and utilities shared by the container, record and evaluation layers.

pub mod binary;
pub mod config;
pub mod error;
pub mod number_text;

pub use binary::{BinaryError, ByteCursor};
pub use config::{DecodeOptions, ReadOptions, SharedFormulaPolicy, Strictness};
pub use error::{Error, Result};
