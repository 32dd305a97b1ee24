//! The 512-byte header block.

use bytes::BufMut;

use crate::ole::consts::*;

#[derive(Debug)]
pub(super) struct HeaderBuilder {
    first_dir_sector: u32,
    first_minifat_sector: u32,
    num_minifat_sectors: u32,
    first_difat_sector: u32,
    num_difat_sectors: u32,
    fat_sectors: Vec<u32>,
}

impl HeaderBuilder {
    pub fn new() -> Self {
        Self {
            first_dir_sector: ENDOFCHAIN,
            first_minifat_sector: ENDOFCHAIN,
            num_minifat_sectors: 0,
            first_difat_sector: ENDOFCHAIN,
            num_difat_sectors: 0,
            fat_sectors: Vec::new(),
        }
    }

    pub fn set_first_dir_sector(&mut self, sector: u32) {
        self.first_dir_sector = sector;
    }

    pub fn set_minifat(&mut self, first_sector: u32, count: u32) {
        self.first_minifat_sector = first_sector;
        self.num_minifat_sectors = count;
    }

    pub fn set_difat(&mut self, first_sector: u32, count: u32) {
        self.first_difat_sector = first_sector;
        self.num_difat_sectors = count;
    }

    pub fn set_fat_sectors(&mut self, sectors: Vec<u32>) {
        self.fat_sectors = sectors;
    }

    /// Version 3 header: 512-byte sectors, 64-byte mini sectors.
    pub fn generate(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.put_slice(MAGIC);
        header.put_bytes(0, 16); // clsid
        header.put_u16_le(0x003E); // minor version
        header.put_u16_le(3); // major version
        header.put_u16_le(0xFFFE);
        header.put_u16_le(9); // sector shift
        header.put_u16_le(6); // mini sector shift
        header.put_bytes(0, 6);
        header.put_u32_le(0); // directory sectors, always 0 in version 3
        header.put_u32_le(self.fat_sectors.len() as u32);
        header.put_u32_le(self.first_dir_sector);
        header.put_u32_le(0); // transaction signature
        header.put_u32_le(MINI_STREAM_CUTOFF);
        header.put_u32_le(self.first_minifat_sector);
        header.put_u32_le(self.num_minifat_sectors);
        header.put_u32_le(self.first_difat_sector);
        header.put_u32_le(self.num_difat_sectors);
        for slot in 0..HEADER_DIFAT_ENTRIES {
            header.put_u32_le(self.fat_sectors.get(slot).copied().unwrap_or(FREESECT));
        }
        debug_assert_eq!(header.len(), HEADER_SIZE);
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let mut builder = HeaderBuilder::new();
        builder.set_first_dir_sector(10);
        builder.set_fat_sectors(vec![1, 2, 3]);
        let header = builder.generate();

        assert_eq!(header.len(), 512);
        assert_eq!(&header[0..8], MAGIC);
        assert_eq!(&header[26..28], &3u16.to_le_bytes());
        assert_eq!(&header[28..30], &0xFFFEu16.to_le_bytes());
        assert_eq!(&header[30..32], &9u16.to_le_bytes());
        assert_eq!(&header[44..48], &3u32.to_le_bytes());
        assert_eq!(&header[48..52], &10u32.to_le_bytes());
        assert_eq!(&header[76..80], &1u32.to_le_bytes());
        assert_eq!(&header[88..92], &FREESECT.to_le_bytes());
    }
}
