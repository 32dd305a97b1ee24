//! FAT construction.
//!
//! Sectors are handed out sequentially; every chain is contiguous, so each
//! entry points at the next sector and the last one holds `ENDOFCHAIN`.
//! Sectors holding the FAT itself are marked `FATSECT`, DIFAT sectors
//! `DIFSECT`.

use fixedbitset::FixedBitSet;

use crate::ole::consts::*;
use crate::ole::filesystem::{FilesystemError, FilesystemResult};

#[derive(Debug)]
pub(super) struct FatBuilder {
    /// Maps a sector ID to the next sector of its chain
    fat: Vec<u32>,
    next_sector: u32,
    sector_size: usize,
}

impl FatBuilder {
    pub fn new(sector_size: usize) -> Self {
        Self {
            fat: Vec::new(),
            next_sector: 0,
            sector_size,
        }
    }

    /// Allocate a contiguous chain large enough for `size` bytes.
    ///
    /// Returns the first sector, or `ENDOFCHAIN` when `size` is zero.
    pub fn allocate_chain(&mut self, size: usize) -> u32 {
        if size == 0 {
            return ENDOFCHAIN;
        }
        let count = size.div_ceil(self.sector_size);
        let start = self.next_sector;
        self.fat.resize(start as usize + count, FREESECT);
        for i in 0..count {
            let sector = start as usize + i;
            self.fat[sector] = if i + 1 < count {
                sector as u32 + 1
            } else {
                ENDOFCHAIN
            };
        }
        self.next_sector += count as u32;
        start
    }

    /// Reserve `count` sectors marked with `marker` (`FATSECT`, `DIFSECT`).
    pub fn allocate_special(&mut self, count: u32, marker: u32) -> u32 {
        if count == 0 {
            return ENDOFCHAIN;
        }
        let start = self.next_sector;
        let end = start + count;
        self.fat.resize(end as usize, FREESECT);
        self.fat[start as usize..end as usize].fill(marker);
        self.next_sector = end;
        start
    }

    #[inline]
    pub fn total_sectors(&self) -> u32 {
        self.next_sector
    }

    #[cfg(test)]
    pub fn fat(&self) -> &[u32] {
        &self.fat
    }

    /// The FAT serialized into whole sectors, unused slots set to `FREESECT`.
    pub fn generate_fat_sectors(&self) -> Vec<Vec<u8>> {
        to_sectors(&self.fat, self.sector_size)
    }

    /// Every chain must end in `ENDOFCHAIN` without revisiting a sector.
    pub fn validate(&self) -> FilesystemResult<()> {
        let mut owned = FixedBitSet::with_capacity(self.fat.len());
        for (sector, &next) in self.fat.iter().enumerate() {
            if matches!(next, ENDOFCHAIN | FREESECT | FATSECT | DIFSECT) {
                continue;
            }
            let next = next as usize;
            if next >= self.fat.len() {
                return Err(FilesystemError::Corrupted(format!(
                    "FAT entry {sector} points at sector {next}, beyond the table"
                )));
            }
            if owned.put(next) {
                return Err(FilesystemError::Corrupted(format!(
                    "sector {next} is claimed by two chains"
                )));
            }
        }
        Ok(())
    }
}

/// Pack a table of `u32` entries into sectors padded with `FREESECT`.
pub(super) fn to_sectors(table: &[u32], sector_size: usize) -> Vec<Vec<u8>> {
    table
        .chunks(sector_size / 4)
        .map(|entries| {
            let mut sector = vec![0xFFu8; sector_size];
            for (slot, value) in sector.chunks_exact_mut(4).zip(entries) {
                slot.copy_from_slice(&value.to_le_bytes());
            }
            sector
        })
        .collect()
}
