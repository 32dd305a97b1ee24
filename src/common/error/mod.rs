//! Unified error type for the crate.
//!
//! Each layer has its own error enum next to its code; this module folds them
//! into one [`Error`] for callers that do not care which layer failed.

pub mod conversions;
pub mod types;

pub use types::{Error, Result};
