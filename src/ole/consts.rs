/// File signature at offset 0 of every compound file
pub const MAGIC: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Header, one FAT sector and one directory sector at 512 bytes each
pub const MINIMAL_OLEFILE_SIZE: usize = 1536;

pub const HEADER_SIZE: usize = 512;

/// Bytes per directory entry
pub const DIRENTRY_SIZE: usize = 128;

/// Sector size of major version 3 files
pub const SECTOR_SIZE_V3: usize = 512;

/// Sector size of major version 4 files
pub const SECTOR_SIZE_V4: usize = 4096;

pub const MINI_SECTOR_SIZE: usize = 64;

/// Streams below this size are stored in the mini stream
pub const MINI_STREAM_CUTOFF: u32 = 4096;

/// FAT sector locations held in the header itself
pub const HEADER_DIFAT_ENTRIES: usize = 109;

// Special FAT entries
pub const MAXREGSECT: u32 = 0xFFFF_FFFA;
pub const DIFSECT: u32 = 0xFFFF_FFFC;
pub const FATSECT: u32 = 0xFFFF_FFFD;
pub const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
pub const FREESECT: u32 = 0xFFFF_FFFF;

/// Sibling/child link of a directory entry that points nowhere
pub const NOSTREAM: u32 = 0xFFFF_FFFF;

// Directory entry object types
pub const STGTY_STORAGE: u8 = 1;
pub const STGTY_STREAM: u8 = 2;
pub const STGTY_ROOT: u8 = 5;

/// Entry names are at most 31 UTF-16 units plus a terminator
pub const MAX_NAME_LEN: usize = 31;

/// Chains longer than this are treated as corrupt
pub const MAX_SECTOR_CHAIN: usize = 1 << 22;

// HPSF variant types
pub const VT_EMPTY: u16 = 0;
pub const VT_NULL: u16 = 1;
pub const VT_I2: u16 = 2;
pub const VT_I4: u16 = 3;
pub const VT_R4: u16 = 4;
pub const VT_R8: u16 = 5;
pub const VT_CY: u16 = 6;
pub const VT_DATE: u16 = 7;
pub const VT_BSTR: u16 = 8;
pub const VT_ERROR: u16 = 10;
pub const VT_BOOL: u16 = 11;
pub const VT_VARIANT: u16 = 12;
pub const VT_DECIMAL: u16 = 14;
pub const VT_I1: u16 = 16;
pub const VT_UI1: u16 = 17;
pub const VT_UI2: u16 = 18;
pub const VT_UI4: u16 = 19;
pub const VT_I8: u16 = 20;
pub const VT_UI8: u16 = 21;
pub const VT_INT: u16 = 22;
pub const VT_UINT: u16 = 23;
pub const VT_LPSTR: u16 = 30;
pub const VT_LPWSTR: u16 = 31;
pub const VT_FILETIME: u16 = 64;
pub const VT_BLOB: u16 = 65;
pub const VT_STREAM: u16 = 66;
pub const VT_STORAGE: u16 = 67;
pub const VT_STREAMED_OBJECT: u16 = 68;
pub const VT_STORED_OBJECT: u16 = 69;
pub const VT_BLOB_OBJECT: u16 = 70;
pub const VT_CF: u16 = 71;
pub const VT_CLSID: u16 = 72;
pub const VT_VERSIONED_STREAM: u16 = 73;
pub const VT_VECTOR: u16 = 0x1000;
pub const VT_ARRAY: u16 = 0x2000;
/// Mask selecting the scalar part of a property type
pub const VT_TYPEMASK: u16 = 0x0FFF;

/// Largest number of scalars an array property may declare
pub const MAX_ARRAY_ELEMENTS: u64 = i32::MAX as u64;

/// Largest number of elements a vector property may declare
pub const MAX_VECTOR_ELEMENTS: u32 = 1 << 20;

/// Largest byte payload a single string, blob or record may claim
pub const MAX_RECORD_LENGTH: usize = 100_000_000;

/// Largest number of properties a single section may declare
pub const MAX_PROPERTIES_PER_SECTION: u32 = 1 << 16;
