//! Serializing a directory tree into a version 3 compound file.
//!
//! Layout, in sector order: streams at or above the mini stream cutoff, the
//! mini stream, the directory stream, the MiniFAT, the DIFAT and finally
//! the FAT. Every chain is contiguous.

mod difat;
mod directory;
mod fat;
mod header;
mod minifat;

use difat::DifatBuilder;
use directory::{DirectoryBuilder, DirectoryEntryBuilder};
use fat::FatBuilder;
use header::HeaderBuilder;
use minifat::MiniFatBuilder;

use super::entry::{DirectoryNode, Entry};
use super::FilesystemResult;
use crate::ole::consts::*;

const SECTOR_SIZE: usize = SECTOR_SIZE_V3;

/// A stream placed in the image: its SID and its bytes.
struct PendingStream<'a> {
    sid: u32,
    data: &'a [u8],
}

pub(crate) fn write_image(root: &DirectoryNode) -> FilesystemResult<Vec<u8>> {
    let mut directory = DirectoryBuilder::new(root.class_id());
    let mut streams = Vec::new();
    flatten(root, 0, &mut directory, &mut streams);

    let mut fat = FatBuilder::new(SECTOR_SIZE);
    let mut minifat = MiniFatBuilder::new();

    // Large streams take the first sectors.
    let mut placements = Vec::new();
    for stream in &streams {
        if stream.data.len() >= MINI_STREAM_CUTOFF as usize {
            let start = fat.allocate_chain(stream.data.len());
            directory.entry_mut(stream.sid).start_sector = start;
            placements.push((start, stream.data));
        }
    }
    for stream in &streams {
        if stream.data.len() < MINI_STREAM_CUTOFF as usize {
            directory.entry_mut(stream.sid).start_sector = minifat.allocate_mini_chain(stream.data);
        }
    }

    let ministream_start = fat.allocate_chain(minifat.ministream().len());
    {
        let root_entry = directory.entry_mut(0);
        root_entry.start_sector = ministream_start;
        root_entry.size = minifat.ministream().len() as u64;
    }
    if ministream_start != ENDOFCHAIN {
        placements.push((ministream_start, minifat.ministream()));
    }

    let dir_stream = directory.generate_directory_stream();
    let dir_start = fat.allocate_chain(dir_stream.len());

    let minifat_sectors = minifat.generate_minifat_sectors(SECTOR_SIZE);
    let minifat_start = fat.allocate_chain(minifat_sectors.len() * SECTOR_SIZE);

    // The FAT has to describe its own sectors and the DIFAT's.
    let entries_per_sector = (SECTOR_SIZE / 4) as u32;
    let used = fat.total_sectors();
    let (mut n_fat, mut n_difat) = (0u32, 0u32);
    loop {
        let next_fat = (used + n_fat + n_difat).div_ceil(entries_per_sector);
        let next_difat = DifatBuilder::sectors_needed(next_fat, SECTOR_SIZE);
        if (next_fat, next_difat) == (n_fat, n_difat) {
            break;
        }
        (n_fat, n_difat) = (next_fat, next_difat);
    }
    let difat_start = fat.allocate_special(n_difat, DIFSECT);
    let fat_start = fat.allocate_special(n_fat, FATSECT);
    fat.validate()?;

    let fat_sector_ids: Vec<u32> = (fat_start..fat_start + n_fat).collect();
    let difat_sectors = DifatBuilder::new(SECTOR_SIZE, &fat_sector_ids).generate_difat_sectors(difat_start);
    let fat_sectors = fat.generate_fat_sectors();

    let mut header = HeaderBuilder::new();
    header.set_first_dir_sector(dir_start);
    header.set_minifat(minifat_start, minifat_sectors.len() as u32);
    if n_difat > 0 {
        header.set_difat(difat_start, n_difat);
    }
    header.set_fat_sectors(fat_sector_ids);

    let total = fat.total_sectors() as usize;
    let mut image = vec![0u8; (total + 1) * SECTOR_SIZE];
    image[..HEADER_SIZE].copy_from_slice(&header.generate());

    let mut place = |start: u32, bytes: &[u8]| {
        let offset = (start as usize + 1) * SECTOR_SIZE;
        image[offset..offset + bytes.len()].copy_from_slice(bytes);
    };
    for (start, data) in placements {
        place(start, data);
    }
    place(dir_start, &dir_stream);
    for (i, sector) in minifat_sectors.iter().enumerate() {
        place(minifat_start + i as u32, sector);
    }
    for (i, sector) in difat_sectors.iter().enumerate() {
        place(difat_start + i as u32, sector);
    }
    for (i, sector) in fat_sectors.iter().enumerate() {
        place(fat_start + i as u32, sector);
    }

    log::debug!(
        "Wrote compound file: {} entries, {} sectors, {} FAT sectors",
        directory.entry_count(),
        total,
        n_fat
    );
    Ok(image)
}

/// Pre-order walk assigning SIDs in enumeration order.
fn flatten<'a>(
    node: &'a DirectoryNode,
    parent: u32,
    directory: &mut DirectoryBuilder,
    streams: &mut Vec<PendingStream<'a>>,
) {
    for (name, entry) in node.entries() {
        match entry {
            Entry::Document(doc) => {
                let sid = directory.add(parent, DirectoryEntryBuilder::stream(name, doc.size()));
                streams.push(PendingStream {
                    sid,
                    data: doc.data(),
                });
            },
            Entry::Directory(dir) => {
                let sid =
                    directory.add(parent, DirectoryEntryBuilder::storage(name, dir.class_id()));
                flatten(dir, sid, directory, streams);
            },
        }
    }
}
