use thiserror::Error;

use crate::common::binary::BinaryError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Binary(#[from] BinaryError),

    #[cfg(feature = "ole")]
    #[error(transparent)]
    Property(crate::ole::property::PropertyError),

    #[cfg(feature = "ole")]
    #[error(transparent)]
    Filesystem(crate::ole::filesystem::FilesystemError),

    #[cfg(feature = "ole")]
    #[error(transparent)]
    Xls(crate::ole::xls::XlsError),

    #[cfg(feature = "ole")]
    #[error(transparent)]
    Formula(crate::ole::xls::ptg::FormulaError),
}

pub type Result<T> = std::result::Result<T, Error>;
