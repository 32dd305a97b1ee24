//! OLE2 compound documents and the formats stored inside them.
//!
//! - [`filesystem`]: the compound-file container as an in-memory tree
//! - [`property`]: HPSF property-set streams and their typed values
//! - [`xls`]: BIFF8 workbook records, aggregates and formula tokens
//! - [`DocumentMetadata`]: the summary information streams in one struct

/// Constants for the OLE2 container and property types
pub mod consts;

/// Code page to `encoding_rs` mapping
pub mod codepage;

/// 16-byte CLSID/FMTID values
pub mod class_id;

/// HPSF typed properties, sections and property sets
pub mod property;

/// Compound-file directory tree, reader and writer
pub mod filesystem;

/// Summary information extraction
mod metadata;

/// BIFF8 spreadsheet records
///
/// The `Workbook` stream of a legacy `.xls` file, decoded into per-sheet
/// cell aggregates with formula tokens attached.
pub mod xls;

pub use class_id::ClassId;
pub use filesystem::{CompoundFile, DirectoryNode, DocumentNode, Entry, FilesystemError, is_ole_file};
pub use metadata::DocumentMetadata;
