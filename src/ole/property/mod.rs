//! HPSF typed property values and property-set streams.
//!
//! A property-set stream carries one or more sections, each a table of
//! `(id, offset)` pairs pointing at self-describing [`TypedPropertyValue`]s.
//! Decoding is driven by the 16-bit type tag: the low 12 bits pick a scalar
//! decoder, `VT_VECTOR` and `VT_ARRAY` wrap it.
//!
//! # Example
//!
//! ```
//! use hssf_core::common::DecodeOptions;
//! use hssf_core::ole::property::{TypedPropertyValue, Variant};
//!
//! let value = TypedPropertyValue::new(Variant::I4(42));
//! let bytes = value.to_bytes().unwrap();
//! let (decoded, consumed) = TypedPropertyValue::decode(&bytes, 0, &DecodeOptions::new()).unwrap();
//! assert_eq!(decoded, value);
//! assert_eq!(consumed, 8);
//! ```

mod array;
mod property_set;
mod scalars;
mod section;
mod strings;
mod variant;
mod vector;

pub use array::{Array, ArrayDimension};
pub use property_set::{
    DOCUMENT_SUMMARY_INFORMATION_NAME, DOCUMENT_SUMMARY_INFORMATION_ID, PropertySet,
    SUMMARY_INFORMATION_ID, SUMMARY_INFORMATION_NAME, is_property_set_stream,
};
pub use scalars::{Blob, ClipboardData, Currency, Decimal, Filetime, VersionedStream};
pub use section::{PID_CODEPAGE, PID_DICTIONARY, Section};
pub use strings::{CodePageString, UnicodeString};
pub use variant::{TypedPropertyValue, Variant};
pub use vector::Vector;

use thiserror::Error;

use crate::common::DecodeOptions;
use crate::common::binary::{BinaryError, ByteCursor, Padding};

#[derive(Error, Debug)]
pub enum PropertyError {
    #[error(transparent)]
    Binary(#[from] BinaryError),

    #[error("Unknown property type 0x{0:04X}")]
    UnknownType(u16),

    #[error("Array dimension number {0} is not in [1; 31] range")]
    InvalidDimensionCount(u32),

    #[error("{what} declares {requested} elements, limit is {limit}")]
    CapacityExceeded {
        what: &'static str,
        requested: u64,
        limit: u64,
    },

    #[error("{what} started at offset #{offset} is not NULL-terminated")]
    MissingTerminator { what: &'static str, offset: usize },

    #[error("Reserved field at offset #{offset} MUST be 0, but its value is {value}")]
    NonZeroReserved { offset: usize, value: u32 },

    #[error("Array holds {actual} scalars, its dimensions require {expected}")]
    ScalarCountMismatch { expected: u64, actual: usize },

    #[error("Array of type 0x{expected:04X} holds a scalar of type 0x{actual:04X}")]
    ElementTypeMismatch { expected: u16, actual: u16 },

    #[error("Value {0} does not fit the declared property type")]
    ValueOutOfRange(String),

    #[error("Invalid property set: {0}")]
    InvalidPropertySet(String),
}

pub type PropertyResult<T> = Result<T, PropertyError>;

/// Warn about `err`, or return it when `reject` is set.
pub(crate) fn tolerate(reject: bool, err: PropertyError) -> PropertyResult<()> {
    if reject {
        return Err(err);
    }
    log::warn!("{err}");
    Ok(())
}

/// Re-align to four bytes after a value, leaving a non-zero byte in place.
pub(crate) fn skip_padding(cursor: &mut ByteCursor<'_>) {
    if let Padding::Interrupted { offset, skipped } = cursor.align_zero_padding(0, 4)
        && !cursor.is_empty()
    {
        log::warn!(
            "Padding at offset #{offset} is not zero after {skipped} byte(s); the next value starts there"
        );
    }
}

pub(crate) fn check_reserved(
    cursor: &mut ByteCursor<'_>,
    options: &DecodeOptions,
) -> PropertyResult<()> {
    let offset = cursor.position();
    let value = cursor.read_u16()?;
    if value != 0 {
        tolerate(
            options.rejects_anomalies(),
            PropertyError::NonZeroReserved {
                offset,
                value: value as u32,
            },
        )?;
    }
    Ok(())
}
