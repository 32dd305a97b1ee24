//! MiniFAT and mini stream construction.
//!
//! Streams below the cutoff are packed into the mini stream in 64-byte mini
//! sectors. The mini stream itself is stored as the root entry's stream.

use crate::ole::consts::*;

#[derive(Debug, Default)]
pub(super) struct MiniFatBuilder {
    minifat: Vec<u32>,
    ministream: Vec<u8>,
}

impl MiniFatBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `data` to the mini stream and chain its mini sectors.
    ///
    /// Returns the first mini sector, or `ENDOFCHAIN` for empty data.
    pub fn allocate_mini_chain(&mut self, data: &[u8]) -> u32 {
        if data.is_empty() {
            return ENDOFCHAIN;
        }
        let count = data.len().div_ceil(MINI_SECTOR_SIZE);
        let start = self.minifat.len();
        self.minifat.extend((start + 1..start + count).map(|next| next as u32));
        self.minifat.push(ENDOFCHAIN);

        let offset = self.ministream.len();
        self.ministream.resize(offset + count * MINI_SECTOR_SIZE, 0);
        self.ministream[offset..offset + data.len()].copy_from_slice(data);
        start as u32
    }

    #[inline]
    pub fn ministream(&self) -> &[u8] {
        &self.ministream
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.minifat.is_empty()
    }

    #[cfg(test)]
    pub fn minifat(&self) -> &[u32] {
        &self.minifat
    }

    pub fn generate_minifat_sectors(&self, sector_size: usize) -> Vec<Vec<u8>> {
        super::fat::to_sectors(&self.minifat, sector_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_mini_chains() {
        let mut minifat = MiniFatBuilder::new();
        assert_eq!(minifat.allocate_mini_chain(&[0xAA; 50]), 0);
        assert_eq!(minifat.allocate_mini_chain(&[0xBB; 100]), 1);
        assert_eq!(minifat.minifat(), &[ENDOFCHAIN, 2, ENDOFCHAIN]);
        assert_eq!(minifat.ministream().len(), 3 * MINI_SECTOR_SIZE);
        assert_eq!(minifat.ministream()[64], 0xBB);
    }

    #[test]
    fn test_empty_mini_chain() {
        let mut minifat = MiniFatBuilder::new();
        assert_eq!(minifat.allocate_mini_chain(&[]), ENDOFCHAIN);
        assert!(minifat.is_empty());
        assert!(minifat.generate_minifat_sectors(512).is_empty());
    }
}
