//! In-memory model of an OLE2 compound file.
//!
//! A [`CompoundFile`] owns a tree of [`Entry`] values rooted at a
//! [`DirectoryNode`]. The tree is loaded from the sector image in one pass
//! and written back as a fresh version 3 image (512-byte sectors, MiniFAT
//! for streams below 4096 bytes).
//!
//! # Example
//!
//! ```
//! use hssf_core::ole::filesystem::CompoundFile;
//!
//! let mut cf = CompoundFile::new();
//! cf.root_mut().create_document("Workbook", vec![1, 2, 3]).unwrap();
//! let bytes = cf.to_bytes().unwrap();
//!
//! let reopened = CompoundFile::open(&bytes).unwrap();
//! assert_eq!(reopened.document(&["Workbook"]).unwrap(), &[1, 2, 3]);
//! ```

mod entry;
mod reader;
mod writer;

#[cfg(test)]
mod tests;

pub use entry::{DirectoryNode, DocumentNode, Entry};

use std::io::{Read, Write};

use thiserror::Error;

use crate::common::binary::BinaryError;
use crate::ole::consts::MAGIC;

#[derive(Error, Debug)]
pub enum FilesystemError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Binary(#[from] BinaryError),

    #[error("Not an OLE2 compound file")]
    NotOleFile,

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Corrupted file: {0}")]
    Corrupted(String),

    #[error("No entry named '{name}'{}", hint_suffix(.hint))]
    NotFound {
        name: String,
        hint: Option<&'static str>,
    },

    #[error("An entry named '{0}' already exists")]
    DuplicateName(String),

    #[error("Invalid entry name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("'{0}' is not a document")]
    NotADocument(String),

    #[error("'{0}' is not a directory")]
    NotADirectory(String),
}

fn hint_suffix(hint: &Option<&'static str>) -> String {
    match hint {
        Some(kind) => format!("; the file looks like {kind}"),
        None => String::new(),
    }
}

pub type FilesystemResult<T> = Result<T, FilesystemError>;

/// Cheap check of the OLE2 signature.
pub fn is_ole_file(data: &[u8]) -> bool {
    data.starts_with(MAGIC)
}

/// An OLE2 compound file held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct CompoundFile {
    root: DirectoryNode,
}

impl CompoundFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a complete compound-file image.
    pub fn open(data: &[u8]) -> FilesystemResult<Self> {
        let root = reader::read_image(data)?;
        Ok(Self { root })
    }

    pub fn from_reader<R: Read>(mut reader: R) -> FilesystemResult<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::open(&data)
    }

    #[inline]
    pub fn root(&self) -> &DirectoryNode {
        &self.root
    }

    #[inline]
    pub fn root_mut(&mut self) -> &mut DirectoryNode {
        &mut self.root
    }

    /// Contents of the document at `path`, intermediate components being
    /// directories.
    pub fn document(&self, path: &[&str]) -> FilesystemResult<&[u8]> {
        let (name, parents) = path
            .split_last()
            .ok_or_else(|| FilesystemError::InvalidName {
                name: String::new(),
                reason: "empty path",
            })?;
        let mut dir = &self.root;
        for component in parents {
            dir = dir.directory(component)?;
        }
        dir.document(name)
    }

    /// Serialize the tree as a version 3 compound file.
    pub fn to_bytes(&self) -> FilesystemResult<Vec<u8>> {
        writer::write_image(&self.root)
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> FilesystemResult<()> {
        let image = self.to_bytes()?;
        out.write_all(&image)?;
        out.flush()?;
        Ok(())
    }
}
