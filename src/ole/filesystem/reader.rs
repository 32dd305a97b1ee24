//! Loading the directory tree out of a sector image.

use fixedbitset::FixedBitSet;
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

use super::entry::{DirectoryNode, DocumentNode, Entry};
use super::{FilesystemError, FilesystemResult};
use crate::common::binary::decode_utf16le;
use crate::ole::class_id::ClassId;
use crate::ole::consts::*;

/// On-disk header, 512 bytes.
#[allow(dead_code)]
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawHeader {
    magic: [u8; 8],
    clsid: [u8; 16],
    minor_version: U16<LE>,
    major_version: U16<LE>,
    byte_order: U16<LE>,
    sector_shift: U16<LE>,
    mini_sector_shift: U16<LE>,
    reserved: [u8; 6],
    num_dir_sectors: U32<LE>,
    num_fat_sectors: U32<LE>,
    first_dir_sector: U32<LE>,
    transaction_signature: U32<LE>,
    mini_stream_cutoff: U32<LE>,
    first_minifat_sector: U32<LE>,
    num_minifat_sectors: U32<LE>,
    first_difat_sector: U32<LE>,
    num_difat_sectors: U32<LE>,
    difat: [U32<LE>; HEADER_DIFAT_ENTRIES],
}

/// On-disk directory entry, 128 bytes.
#[allow(dead_code)]
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// UTF-16LE, NUL-padded
    name: [u8; 64],
    /// In bytes, terminator included
    name_len: U16<LE>,
    entry_type: u8,
    node_color: u8,
    sid_left: U32<LE>,
    sid_right: U32<LE>,
    sid_child: U32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    creation_time: U64<LE>,
    modified_time: U64<LE>,
    start_sector: U32<LE>,
    stream_size: U64<LE>,
}

impl RawDirectoryEntry {
    fn name(&self) -> String {
        let len = (self.name_len.get() as usize).min(self.name.len());
        decode_utf16le(&self.name[..len])
    }
}

struct Image<'a> {
    data: &'a [u8],
    sector_size: usize,
    mini_stream_cutoff: u64,
    fat: Vec<u32>,
    minifat: Vec<u32>,
    ministream: Vec<u8>,
    entries: Vec<RawDirectoryEntry>,
}

/// Parse a compound-file image into its root directory.
pub(crate) fn read_image(data: &[u8]) -> FilesystemResult<DirectoryNode> {
    if data.len() < HEADER_SIZE || !data.starts_with(MAGIC) {
        return Err(FilesystemError::NotOleFile);
    }
    let header = RawHeader::read_from_bytes(&data[..HEADER_SIZE])
        .map_err(|_| FilesystemError::InvalidHeader("truncated header".to_string()))?;

    if header.byte_order.get() != 0xFFFE {
        return Err(FilesystemError::InvalidHeader(format!(
            "byte order 0x{:04X} is not little-endian",
            header.byte_order.get()
        )));
    }
    let sector_size = match (header.major_version.get(), header.sector_shift.get()) {
        (3, 9) => SECTOR_SIZE_V3,
        (4, 12) => SECTOR_SIZE_V4,
        (major, shift) => {
            return Err(FilesystemError::InvalidHeader(format!(
                "sector shift {shift} does not match major version {major}"
            )));
        },
    };
    if 1usize << header.mini_sector_shift.get().min(16) != MINI_SECTOR_SIZE {
        return Err(FilesystemError::InvalidHeader(format!(
            "mini sector shift {} is not 6",
            header.mini_sector_shift.get()
        )));
    }
    if data.len() < MINIMAL_OLEFILE_SIZE.min(sector_size * 3) {
        return Err(FilesystemError::NotOleFile);
    }

    let mut image = Image {
        data,
        sector_size,
        mini_stream_cutoff: header.mini_stream_cutoff.get() as u64,
        fat: Vec::new(),
        minifat: Vec::new(),
        ministream: Vec::new(),
        entries: Vec::new(),
    };
    image.load_fat(&header)?;
    image.load_directory(header.first_dir_sector.get())?;
    image.load_minifat(header.first_minifat_sector.get(), header.num_minifat_sectors.get())?;
    image.load_ministream()?;

    log::debug!(
        "Compound file: {} byte sectors, {} FAT entries, {} directory entries",
        sector_size,
        image.fat.len(),
        image.entries.len()
    );

    let root = image
        .entries
        .first()
        .filter(|root| root.entry_type == STGTY_ROOT)
        .ok_or_else(|| FilesystemError::Corrupted("missing root entry".to_string()))?;
    let mut visited = FixedBitSet::with_capacity(image.entries.len());
    visited.insert(0);
    let mut node = image.build_directory(root.sid_child.get(), &mut visited)?;
    node.set_class_id(ClassId::from_bytes(root.clsid));
    Ok(node)
}

impl<'a> Image<'a> {
    fn total_sectors(&self) -> usize {
        self.data.len().div_ceil(self.sector_size).saturating_sub(1)
    }

    fn sector(&self, id: u32) -> FilesystemResult<&'a [u8]> {
        let start = (id as usize)
            .checked_add(1)
            .and_then(|n| n.checked_mul(self.sector_size))
            .filter(|&start| id <= MAXREGSECT && start < self.data.len())
            .ok_or_else(|| {
                FilesystemError::Corrupted(format!("sector {id} is beyond the end of the file"))
            })?;
        let end = (start + self.sector_size).min(self.data.len());
        Ok(&self.data[start..end])
    }

    fn load_fat(&mut self, header: &RawHeader) -> FilesystemResult<()> {
        let wanted = header.num_fat_sectors.get() as usize;
        if wanted > self.total_sectors() {
            return Err(FilesystemError::Corrupted(format!(
                "{wanted} FAT sectors declared, file holds {}",
                self.total_sectors()
            )));
        }
        let mut fat_sectors: Vec<u32> = header
            .difat
            .iter()
            .map(|id| id.get())
            .filter(|&id| id != FREESECT)
            .take(wanted)
            .collect();

        // Remaining FAT sector IDs live in the DIFAT chain.
        let ids_per_sector = self.sector_size / 4 - 1;
        let mut difat_sector = header.first_difat_sector.get();
        let mut visited = FixedBitSet::with_capacity(self.total_sectors());
        while fat_sectors.len() < wanted && difat_sector != ENDOFCHAIN && difat_sector != FREESECT
        {
            if (difat_sector as usize) < visited.len() && visited.put(difat_sector as usize) {
                return Err(FilesystemError::Corrupted(format!(
                    "loop in DIFAT chain at sector {difat_sector}"
                )));
            }
            let sector = self.sector(difat_sector)?;
            let ids = sector
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]));
            for id in ids.clone().take(ids_per_sector) {
                if fat_sectors.len() == wanted {
                    break;
                }
                if id != FREESECT {
                    fat_sectors.push(id);
                }
            }
            difat_sector = ids.clone().nth(ids_per_sector).unwrap_or(ENDOFCHAIN);
        }
        if fat_sectors.len() < wanted {
            log::warn!(
                "Header declares {wanted} FAT sectors, only {} could be located",
                fat_sectors.len()
            );
        }

        self.fat.reserve(fat_sectors.len() * self.sector_size / 4);
        for id in fat_sectors {
            let sector = self.sector(id)?;
            self.fat.extend(
                sector
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])),
            );
        }
        Ok(())
    }

    /// Sector IDs of the chain starting at `start`.
    fn chain(&self, start: u32, table: &[u32], what: &str) -> FilesystemResult<Vec<u32>> {
        let mut visited = FixedBitSet::with_capacity(table.len());
        let mut chain = Vec::new();
        let mut current = start;
        while current != ENDOFCHAIN {
            let index = current as usize;
            if index >= table.len() {
                return Err(FilesystemError::Corrupted(format!(
                    "{what} chain points at sector {current}, outside the allocation table"
                )));
            }
            if visited.put(index) {
                return Err(FilesystemError::Corrupted(format!(
                    "loop in {what} chain at sector {current}"
                )));
            }
            if chain.len() >= MAX_SECTOR_CHAIN {
                return Err(FilesystemError::Corrupted(format!(
                    "{what} chain is longer than {MAX_SECTOR_CHAIN} sectors"
                )));
            }
            chain.push(current);
            current = table[index];
        }
        Ok(chain)
    }

    fn read_big_stream(&self, start: u32, size: Option<usize>) -> FilesystemResult<Vec<u8>> {
        let chain = self.chain(start, &self.fat, "FAT")?;
        let mut out = Vec::with_capacity(chain.len() * self.sector_size);
        for id in chain {
            out.extend_from_slice(self.sector(id)?);
        }
        if let Some(size) = size {
            if out.len() < size {
                return Err(FilesystemError::Corrupted(format!(
                    "stream declares {size} bytes, its sectors hold {}",
                    out.len()
                )));
            }
            out.truncate(size);
        }
        Ok(out)
    }

    fn read_mini_stream(&self, start: u32, size: usize) -> FilesystemResult<Vec<u8>> {
        let chain = self.chain(start, &self.minifat, "MiniFAT")?;
        let mut out = Vec::with_capacity(chain.len() * MINI_SECTOR_SIZE);
        for id in chain {
            let offset = id as usize * MINI_SECTOR_SIZE;
            let sector = self
                .ministream
                .get(offset..offset + MINI_SECTOR_SIZE)
                .ok_or_else(|| {
                    FilesystemError::Corrupted(format!(
                        "mini sector {id} is beyond the mini stream"
                    ))
                })?;
            out.extend_from_slice(sector);
        }
        if out.len() < size {
            return Err(FilesystemError::Corrupted(format!(
                "small stream declares {size} bytes, its mini sectors hold {}",
                out.len()
            )));
        }
        out.truncate(size);
        Ok(out)
    }

    fn load_directory(&mut self, first_dir_sector: u32) -> FilesystemResult<()> {
        let raw = self.read_big_stream(first_dir_sector, None)?;
        self.entries = raw
            .chunks_exact(DIRENTRY_SIZE)
            .filter_map(|chunk| RawDirectoryEntry::read_from_bytes(chunk).ok())
            .collect();
        Ok(())
    }

    fn load_minifat(&mut self, first: u32, count: u32) -> FilesystemResult<()> {
        if count == 0 || first == ENDOFCHAIN {
            return Ok(());
        }
        let raw = self.read_big_stream(first, None)?;
        self.minifat = raw
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(())
    }

    fn load_ministream(&mut self) -> FilesystemResult<()> {
        let Some(root) = self.entries.first() else {
            return Ok(());
        };
        let start = root.start_sector.get();
        let size = self.stream_size(root);
        if size == 0 || start == ENDOFCHAIN {
            return Ok(());
        }
        let mut ministream = self.read_big_stream(start, None)?;
        if ministream.len() < size {
            log::warn!(
                "Mini stream declares {size} bytes, its sectors hold {}",
                ministream.len()
            );
        }
        ministream.truncate(size);
        self.ministream = ministream;
        Ok(())
    }

    fn stream_size(&self, raw: &RawDirectoryEntry) -> usize {
        // Version 3 files only define the low 32 bits.
        let size = if self.sector_size == SECTOR_SIZE_V3 {
            raw.stream_size.get() & 0xFFFF_FFFF
        } else {
            raw.stream_size.get()
        };
        size as usize
    }

    fn read_document(&self, raw: &RawDirectoryEntry) -> FilesystemResult<Vec<u8>> {
        let size = self.stream_size(raw);
        if size == 0 {
            return Ok(Vec::new());
        }
        if (size as u64) < self.mini_stream_cutoff {
            self.read_mini_stream(raw.start_sector.get(), size)
        } else {
            self.read_big_stream(raw.start_sector.get(), Some(size))
        }
    }

    /// Walk the sibling tree under `child` in order and build its directory.
    fn build_directory(
        &self,
        child: u32,
        visited: &mut FixedBitSet,
    ) -> FilesystemResult<DirectoryNode> {
        let mut node = DirectoryNode::new();
        let mut stack = Vec::new();
        let mut current = child;
        loop {
            while current != NOSTREAM {
                let sid = current as usize;
                if sid >= self.entries.len() {
                    return Err(FilesystemError::Corrupted(format!(
                        "directory entry {current} does not exist"
                    )));
                }
                if visited.put(sid) {
                    return Err(FilesystemError::Corrupted(format!(
                        "directory entry {current} is reachable twice"
                    )));
                }
                stack.push(sid);
                current = self.entries[sid].sid_left.get();
            }
            let Some(sid) = stack.pop() else {
                break;
            };
            let raw = &self.entries[sid];
            let name = raw.name();
            let entry = match raw.entry_type {
                STGTY_STREAM => Entry::Document(DocumentNode::new(self.read_document(raw)?)),
                STGTY_STORAGE => {
                    let mut dir = self.build_directory(raw.sid_child.get(), visited)?;
                    dir.set_class_id(ClassId::from_bytes(raw.clsid));
                    Entry::Directory(dir)
                },
                other => {
                    log::warn!("Skipping directory entry {sid} '{name}' of type {other}");
                    current = raw.sid_right.get();
                    continue;
                },
            };
            if !node.insert_loaded(name.clone(), entry) {
                log::warn!("Duplicate directory entry '{name}' ignored");
            }
            current = raw.sid_right.get();
        }
        Ok(node)
    }
}
