//! Conversions from the per-layer errors into the unified [`Error`].
//!
//! Layer errors that wrap an IO or binary failure are flattened so callers can
//! match on `Error::Io` regardless of the layer that hit it.

#[cfg(feature = "ole")]
use super::types::Error;

#[cfg(feature = "ole")]
impl From<crate::ole::property::PropertyError> for Error {
    fn from(err: crate::ole::property::PropertyError) -> Self {
        match err {
            crate::ole::property::PropertyError::Binary(e) => Error::Binary(e),
            other => Error::Property(other),
        }
    }
}

#[cfg(feature = "ole")]
impl From<crate::ole::filesystem::FilesystemError> for Error {
    fn from(err: crate::ole::filesystem::FilesystemError) -> Self {
        match err {
            crate::ole::filesystem::FilesystemError::Io(e) => Error::Io(e),
            crate::ole::filesystem::FilesystemError::Binary(e) => Error::Binary(e),
            other => Error::Filesystem(other),
        }
    }
}

#[cfg(feature = "ole")]
impl From<crate::ole::xls::XlsError> for Error {
    fn from(err: crate::ole::xls::XlsError) -> Self {
        match err {
            crate::ole::xls::XlsError::Io(e) => Error::Io(e),
            crate::ole::xls::XlsError::Binary(e) => Error::Binary(e),
            crate::ole::xls::XlsError::Filesystem(e) => Error::from(e),
            crate::ole::xls::XlsError::Formula(e) => Error::Formula(e),
            other => Error::Xls(other),
        }
    }
}

#[cfg(feature = "ole")]
impl From<crate::ole::xls::ptg::FormulaError> for Error {
    fn from(err: crate::ole::xls::ptg::FormulaError) -> Self {
        Error::Formula(err)
    }
}

#[cfg(all(test, feature = "ole"))]
mod tests {
    use super::*;
    use crate::common::binary::BinaryError;

    #[test]
    fn test_nested_binary_error_is_flattened() {
        let inner = BinaryError::InsufficientData {
            expected: 4,
            available: 1,
        };
        let err: Error = crate::ole::xls::XlsError::Binary(inner.clone()).into();
        assert!(matches!(err, Error::Binary(e) if e == inner));
    }
}
