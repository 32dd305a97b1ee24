//! DIFAT sectors for files whose FAT outgrows the 109 header slots.
//!
//! Each DIFAT sector holds `sector_size / 4 - 1` FAT sector IDs followed by
//! the ID of the next DIFAT sector.

use crate::ole::consts::*;

#[derive(Debug)]
pub(super) struct DifatBuilder {
    /// FAT sector IDs that do not fit in the header
    overflow: Vec<u32>,
    sector_size: usize,
}

impl DifatBuilder {
    pub fn new(sector_size: usize, fat_sectors: &[u32]) -> Self {
        let overflow = fat_sectors
            .get(HEADER_DIFAT_ENTRIES..)
            .map(<[u32]>::to_vec)
            .unwrap_or_default();
        Self {
            overflow,
            sector_size,
        }
    }

    /// DIFAT sectors needed for `fat_sector_count` FAT sectors.
    pub fn sectors_needed(fat_sector_count: u32, sector_size: usize) -> u32 {
        let per_sector = (sector_size / 4 - 1) as u32;
        fat_sector_count
            .saturating_sub(HEADER_DIFAT_ENTRIES as u32)
            .div_ceil(per_sector)
    }

    pub fn generate_difat_sectors(&self, first_difat_sector: u32) -> Vec<Vec<u8>> {
        let per_sector = self.sector_size / 4 - 1;
        let count = self.overflow.len().div_ceil(per_sector);
        self.overflow
            .chunks(per_sector)
            .enumerate()
            .map(|(index, ids)| {
                let mut sector = vec![0xFFu8; self.sector_size];
                for (slot, id) in sector.chunks_exact_mut(4).zip(ids) {
                    slot.copy_from_slice(&id.to_le_bytes());
                }
                let next = if index + 1 < count {
                    first_difat_sector + index as u32 + 1
                } else {
                    ENDOFCHAIN
                };
                sector[self.sector_size - 4..].copy_from_slice(&next.to_le_bytes());
                sector
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next_pointer(sector: &[u8]) -> u32 {
        let tail = &sector[sector.len() - 4..];
        u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]])
    }

    #[test]
    fn test_no_difat_for_small_fat() {
        assert_eq!(DifatBuilder::sectors_needed(109, 512), 0);
        let fat: Vec<u32> = (0..100).collect();
        assert!(DifatBuilder::new(512, &fat).generate_difat_sectors(0).is_empty());
    }

    #[test]
    fn test_difat_chain() {
        // 250 FAT sectors: 109 in the header, 141 = 127 + 14 in two DIFAT sectors
        assert_eq!(DifatBuilder::sectors_needed(250, 512), 2);
        let fat: Vec<u32> = (0..250).collect();
        let sectors = DifatBuilder::new(512, &fat).generate_difat_sectors(300);
        assert_eq!(sectors.len(), 2);
        assert_eq!(next_pointer(&sectors[0]), 301);
        assert_eq!(next_pointer(&sectors[1]), ENDOFCHAIN);
        assert_eq!(&sectors[0][0..4], &109u32.to_le_bytes());
    }
}
