//! Blank FAT12 image builder

use super::fat_table::{write_entry, FAT12_EOC};
use super::{BOOT_SIGNATURE, DIR_ENTRY_SIZE, SECTOR_SIZE};

/// Boot sector parameters for a freshly formatted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloppyLayout {
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub sectors_per_fat: u16,
    pub root_entries: u16,
    pub total_sectors: u16,
    pub media: u8,
    pub bootable: bool,
}

impl FloppyLayout {
    /// 3.5" 1.44 MB high density floppy
    pub const FLOPPY_1440K: FloppyLayout = FloppyLayout {
        sectors_per_cluster: 1,
        reserved_sectors: 1,
        num_fats: 2,
        sectors_per_fat: 9,
        root_entries: 224,
        total_sectors: 2880,
        media: 0xF0,
        bootable: false,
    };

    /// Sectors taken by reserved area, FATs and root directory.
    pub fn system_sectors(&self) -> usize {
        let root_bytes = self.root_entries as usize * DIR_ENTRY_SIZE;
        self.reserved_sectors as usize
            + self.num_fats as usize * self.sectors_per_fat as usize
            + root_bytes.div_ceil(SECTOR_SIZE)
    }

    /// Builds a zero-filled image with the boot sector fields and empty FATs written.
    pub fn build(&self) -> Vec<u8> {
        let mut image = vec![0u8; self.total_sectors as usize * SECTOR_SIZE];

        image[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        image[3..11].copy_from_slice(b"FAT12RAW");
        image[0x0B..0x0D].copy_from_slice(&(SECTOR_SIZE as u16).to_le_bytes());
        image[0x0D] = self.sectors_per_cluster;
        image[0x0E..0x10].copy_from_slice(&self.reserved_sectors.to_le_bytes());
        image[0x10] = self.num_fats;
        image[0x11..0x13].copy_from_slice(&self.root_entries.to_le_bytes());
        image[0x13..0x15].copy_from_slice(&self.total_sectors.to_le_bytes());
        image[0x15] = self.media;
        image[0x16..0x18].copy_from_slice(&self.sectors_per_fat.to_le_bytes());
        if self.bootable {
            image[510..512].copy_from_slice(&BOOT_SIGNATURE.to_le_bytes());
        }

        let fat_bytes = self.sectors_per_fat as usize * SECTOR_SIZE;
        for copy in 0..self.num_fats as usize {
            let start = self.reserved_sectors as usize * SECTOR_SIZE + copy * fat_bytes;
            let fat = &mut image[start..start + fat_bytes];
            write_entry(fat, 0, 0xF00 | self.media as u16);
            write_entry(fat, 1, FAT12_EOC);
        }

        log::debug!(
            "built blank image: {} sectors, {} system sectors",
            self.total_sectors,
            self.system_sectors()
        );
        image
    }
}

impl Default for FloppyLayout {
    fn default() -> Self {
        Self::FLOPPY_1440K
    }
}
